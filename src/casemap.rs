//! Command case folding.
//!
//! Command names are case-insensitive on the wire. Handlers are keyed by the
//! folded (ASCII uppercase) form so `ping`, `Ping` and `PING` all reach the
//! same handler. Numerics fold to themselves.

/// Fold a command name for lookup.
pub fn fold_command(command: &str) -> String {
    command.to_ascii_uppercase()
}

/// Compare two command names ignoring ASCII case.
pub fn command_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

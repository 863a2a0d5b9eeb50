//! Simple IRC client example
//!
//! Connects, joins a channel once the server welcomes us, echoes `!echo`
//! requests and quits after a minute or on ctrl-c.
//!
//! ```text
//! IRC_SERVER=irc.libera.chat:6667 IRC_NICK=irclink_demo cargo run --example simple_client
//! ```

use std::env;
use std::time::Duration;

use irclink::{Client, User};
use tracing_subscriber::EnvFilter;

const CHANNEL: &str = "#irclink";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = env::var("IRC_SERVER").unwrap_or_else(|_| "irc.libera.chat:6667".to_string());
    let nick = env::var("IRC_NICK").unwrap_or_else(|_| "irclink_demo".to_string());
    let tls = env::var("IRC_TLS").is_ok_and(|v| v == "1");

    let user = User::new(&nick).with_realname("irclink example bot");
    let client = Client::new(&server, user, tls)?;

    client.on_raw_received(|line| println!("← {}", line));
    client.on_raw_sent(|line| println!("→ {}", line));
    client.on_connected(|| println!("✓ connected"));
    client.on_connection_error(|err| eprintln!("connection error: {}", err));

    // RPL_WELCOME: registration finished
    client.register_handler("001", |client, _msg| {
        if let Err(e) = client.send_fmt(format_args!("JOIN {}", CHANNEL)) {
            eprintln!("join failed: {}", e);
        }
    });

    client.register_handler("PRIVMSG", |client, msg| {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        let Some(rest) = text.strip_prefix("!echo ") else {
            return;
        };
        // Private messages are answered to the sender
        let reply_to = if target.starts_with('#') {
            target
        } else {
            msg.source_nickname().unwrap_or(target)
        };
        let _ = client.send_fmt(format_args!("PRIVMSG {} :{}", reply_to, rest));
    });

    client.connect().await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => println!("interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(60)) => println!("time is up"),
    }

    client.disconnect(Some("irclink example finished")).await;
    Ok(())
}

//! Fuzz target for IRC message parsing
//!
//! This fuzzer tests the robustness of the IRC message parser by feeding it
//! randomly generated input data and ensuring it doesn't panic or crash.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    // Only fuzz valid UTF-8 strings to focus on protocol-level issues
    if let Ok(input) = str::from_utf8(data) {
        // Lines longer than the read buffer never reach the parser
        if input.len() > irclink::READ_BUFFER_CAPACITY {
            return;
        }

        // Parsing and re-serializing should never panic
        if let Ok(msg) = irclink::Message::parse(input) {
            let _ = msg.to_string();
        }

        // Outbound sanitization should never panic
        let _ = irclink::line::sanitize(input);
    }
});

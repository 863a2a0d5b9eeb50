//! Integration tests for message parsing and serialization
//!
//! These tests verify that messages can be parsed from strings and then
//! serialized back to equivalent strings, ensuring round-trip compatibility.

use irclink::{Message, Source, Tag};

fn assert_round_trip(original: &str) -> Message {
    let message: Message = original
        .parse()
        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", original, e));
    let serialized = message.to_string();

    let reparsed: Message = serialized
        .parse()
        .unwrap_or_else(|e| panic!("Failed to reparse '{}': {}", serialized, e));
    assert_eq!(message, reparsed, "Round-trip failed for '{}'", original);
    reparsed
}

#[test]
fn test_message_round_trip_simple() {
    let message = assert_round_trip("PING :irc.example.com");
    assert_eq!(message.to_string(), "PING irc.example.com");
}

#[test]
fn test_message_round_trip_with_source() {
    let message = assert_round_trip(":nick!user@host PRIVMSG #channel :Hello, world!");
    assert_eq!(
        message.to_string(),
        ":nick!user@host PRIVMSG #channel :Hello, world!"
    );
}

#[test]
fn test_message_round_trip_with_tags() {
    assert_round_trip(
        "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Tagged message",
    );
}

#[test]
fn test_message_round_trip_numeric_response() {
    let message = assert_round_trip(":server 001 nickname :Welcome to the IRC Network");
    assert_eq!(message.command(), "001");
    assert_eq!(message.source(), Some(&Source::Host("server".to_string())));
}

#[test]
fn test_message_round_trip_complex_tags() {
    let message = assert_round_trip(
        "@batch=abc123;msgid=def456;time=2023-01-01T12:00:00Z;+custom=value :nick BATCH +abc123 chathistory #channel",
    );
    assert_eq!(message.tags().len(), 4);
    assert_eq!(message.tag_value("+custom"), Some("value"));
}

#[test]
fn test_message_construction_and_parsing() {
    let message = Message::new("PRIVMSG", ["#test", "Integration test message"])
        .with_tag("time", Some("2023-01-01T00:00:00Z"))
        .with_tag("msgid", Some("test123"))
        .with_source(Source::parse("testbot!test@example.com"));

    let serialized = message.to_string();
    let parsed: Message = serialized
        .parse()
        .expect("Failed to parse constructed message");

    assert_eq!(message, parsed);
    assert_eq!(parsed.raw(), serialized);
    assert_eq!(
        parsed.tags(),
        [
            Tag::new("time", Some("2023-01-01T00:00:00Z".to_string())),
            Tag::new("msgid", Some("test123".to_string())),
        ]
    );
}

#[test]
fn test_empty_trailing_parameter() {
    let message = assert_round_trip("PRIVMSG #channel :");
    assert_eq!(message.params(), ["#channel", ""]);
    assert_eq!(message.to_string(), "PRIVMSG #channel :");
}

#[test]
fn test_trailing_with_leading_colon() {
    let message = assert_round_trip("PRIVMSG #channel ::-)");
    assert_eq!(message.param(1), Some(":-)"));
}

#[test]
fn test_special_characters_in_message() {
    assert_round_trip(":nick!user@host PRIVMSG #channel :Message with üñíçødé and émøjí 🎉");
}

#[test]
fn test_mode_command_round_trip() {
    let message = assert_round_trip(":server MODE #channel +o nick");
    assert_eq!(message.params(), ["#channel", "+o", "nick"]);
}

#[test]
fn test_join_command_variations() {
    for original in [
        "JOIN #channel",
        "JOIN #channel key",
        ":nick!user@host JOIN #channel",
        "JOIN #channel1,#channel2 key1,key2",
    ] {
        assert_round_trip(original);
    }
}

#[test]
fn test_lowercase_command_is_preserved() {
    let message = assert_round_trip("privmsg #channel :hi");
    assert_eq!(message.command(), "privmsg");
    assert!(message.is_command("PRIVMSG"));
}

#[test]
fn test_nick_without_user_round_trip() {
    let message = assert_round_trip(":nick@host NOTICE me :hi");
    assert_eq!(message.source_nickname(), Some("nick"));
    assert_eq!(message.source().and_then(Source::user), None);
    assert_eq!(message.source().map(Source::host), Some("host"));
}

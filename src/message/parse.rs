//! Message parsing implementation.
//!
//! This module implements `FromStr` for `Message` using the nom-based parser.

use std::str::FromStr;

use crate::error::{ClientError, MessageParseError};
use crate::source::Source;

use super::nom_parser::ParsedMessage;
use super::types::{Message, Tag};

/// Parse a raw tag block into a vector of `Tag` structs.
///
/// The input should be the tag block without the leading `@`. Segments are
/// split on their first `=`; empty segments and segments with an empty name
/// are skipped.
fn parse_tags_string(tags_str: &str) -> Vec<Tag> {
    tags_str
        .split(';')
        .filter(|s| !s.is_empty())
        .filter_map(|tag| {
            let (name, value) = match tag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_owned())),
                None => (tag, None),
            };
            (!name.is_empty()).then(|| Tag::new(name, value))
        })
        .collect()
}

impl Message {
    /// Parse a single IRC line.
    ///
    /// ```
    /// use irclink::Message;
    ///
    /// let msg = Message::parse("@id=123;flag :nick!user@host PRIVMSG #chan :hello world").unwrap();
    /// assert_eq!(msg.tag_value("id"), Some("123"));
    /// assert_eq!(msg.source().and_then(|s| s.user()), Some("user"));
    /// assert_eq!(msg.params(), ["#chan", "hello world"]);
    /// ```
    pub fn parse(s: &str) -> Result<Message, MessageParseError> {
        let parsed = ParsedMessage::parse(s)?;

        let tags = parsed.tags.map(parse_tags_string).unwrap_or_default();
        let source = parsed.source.map(Source::parse);
        let params = parsed.params.iter().map(|p| (*p).to_owned()).collect();

        Ok(Message::from_parts(
            s.trim_end_matches(&['\r', '\n'][..]).to_owned(),
            tags,
            source,
            parsed.command.to_owned(),
            params,
        ))
    }
}

impl FromStr for Message {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        Message::parse(s).map_err(|cause| ClientError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

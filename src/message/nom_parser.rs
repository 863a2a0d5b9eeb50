//! Nom-based IRC message parser.
//!
//! This module splits a line into borrowed slices using the nom parser
//! combinator library. Building owned values happens in `parse`.

use nom::{
    bytes::complete::{take_till, take_until},
    character::complete::char,
    combinator::{cut, opt},
    error::{context, VerboseError, VerboseErrorKind},
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

const TAGS_CONTEXT: &str = "parsing message tags";
const SOURCE_CONTEXT: &str = "parsing message source";

/// Parse the tag block: `@` up to and including the first space.
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        TAGS_CONTEXT,
        preceded(char('@'), cut(terminated(take_until(" "), char(' ')))),
    )(input)
}

/// Parse the source token: `:` up to and including the next space.
fn parse_source(input: &str) -> ParseResult<&str, &str> {
    context(
        SOURCE_CONTEXT,
        preceded(char(':'), cut(terminated(take_until(" "), char(' ')))),
    )(input)
}

/// Parse the command name: everything up to the first space.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    take_till(|c| c == ' ')(input)
}

/// Split the parameter list. A token starting with `:` takes the rest of
/// the line; empty tokens from repeated spaces are skipped.
fn parse_params(mut rest: &str) -> Vec<&str> {
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// Parse a complete IRC line into its components.
///
/// IRC message format:
/// ```text
/// [@tags ][:source ]<command>[ params...][ :trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, source) = opt(parse_source)(input)?;
    let (input, command) = parse_command(input)?;
    let params = parse_params(input);

    Ok((
        "",
        ParsedMessage {
            tags,
            source,
            command,
            params,
        },
    ))
}

/// A parsed IRC message with borrowed string slices.
///
/// This is the intermediate representation produced by the nom parser.
/// It holds references into the original input string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw tag block (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw source token (without the leading `:`), if present.
    pub source: Option<&'a str>,
    /// The command name, case preserved.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}

impl<'a> ParsedMessage<'a> {
    /// Parse an IRC line into a `ParsedMessage`.
    ///
    /// Trailing CR/LF characters are ignored.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let line = input.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let msg = match parse_message(line) {
            Ok((_rest, msg)) => msg,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(classify_error(&e));
            }
            Err(nom::Err::Incomplete(_)) => return Err(MessageParseError::EmptyCommand),
        };

        if msg.source == Some("") {
            return Err(MessageParseError::EmptySource);
        }
        if msg.command.is_empty() {
            return Err(MessageParseError::EmptyCommand);
        }

        Ok(msg)
    }
}

/// Map the innermost context of a nom error to a typed parse error.
fn classify_error(e: &VerboseError<&str>) -> MessageParseError {
    let context = e.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(ctx) => Some(*ctx),
        _ => None,
    });

    match context {
        Some(TAGS_CONTEXT) => MessageParseError::UnterminatedTags,
        Some(SOURCE_CONTEXT) => MessageParseError::UnterminatedSource,
        _ => MessageParseError::EmptyCommand,
    }
}

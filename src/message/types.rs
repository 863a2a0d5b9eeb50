use super::serialize::needs_trailing;
use crate::casemap;
use crate::source::Source;

/// A parsed IRC message.
///
/// Holds the line it was parsed from together with its structured parts:
/// optional tags, optional source, the command and its parameters.
/// Equality compares the structured parts only, so two lines that differ in
/// insignificant whitespace compare equal.
///
/// # Example
///
/// ```
/// use irclink::Message;
///
/// // Parse a message
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.command(), "PRIVMSG");
/// assert_eq!(msg.params(), ["#channel", "Hello!"]);
///
/// // Construct a message
/// let msg = Message::new("PRIVMSG", ["#channel", "Hello!"]);
/// assert_eq!(msg.to_string(), "PRIVMSG #channel Hello!");
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    raw: String,
    tags: Vec<Tag>,
    source: Option<Source>,
    command: String,
    params: Vec<String>,
}

impl Message {
    /// Create a message from a command and its parameters.
    ///
    /// Every parameter but the last must be a valid middle parameter:
    /// non-empty, without spaces and not starting with `:`. Otherwise the
    /// serialized line would parse back differently. Debug builds assert
    /// this.
    ///
    /// The raw text of a constructed message is its serialized form.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut msg = Message {
            raw: String::new(),
            tags: Vec::new(),
            source: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        };
        if let Some((_, middles)) = msg.params.split_last() {
            debug_assert!(
                !middles.iter().any(|p| needs_trailing(p)),
                "invalid middle parameter in {:?}",
                msg.params
            );
        }
        msg.refresh_raw();
        msg
    }

    pub(crate) fn from_parts(
        raw: String,
        tags: Vec<Tag>,
        source: Option<Source>,
        command: String,
        params: Vec<String>,
    ) -> Self {
        Message {
            raw,
            tags,
            source,
            command,
            params,
        }
    }

    /// Add a tag to this message.
    #[must_use]
    pub fn with_tag<K, V>(mut self, name: K, value: Option<V>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.push(Tag::new(name, value.map(Into::into)));
        self.refresh_raw();
        self
    }

    /// Set the source of this message.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self.refresh_raw();
        self
    }

    fn refresh_raw(&mut self) {
        self.raw = self.to_string();
    }

    /// The line this message was parsed from, without its terminator.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Tags in the order they appeared.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Message source, if present.
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// The command as received, case preserved.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command folded for handler lookup.
    pub fn folded_command(&self) -> String {
        casemap::fold_command(&self.command)
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, command: &str) -> bool {
        casemap::command_eq(&self.command, command)
    }

    /// Command parameters, the trailing parameter last.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Get a parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Find a tag by name. When a name repeats, the first occurrence wins.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// Get the value of a tag by name.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tag(name).and_then(Tag::value)
    }

    /// Get the nickname from the message source, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.source.as_ref().and_then(Source::nick)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags
            && self.source == other.source
            && self.command == other.command
            && self.params == other.params
    }
}

impl Eq for Message {}

/// A message tag.
///
/// Tags are name/value pairs attached to a message. The value is optional
/// (some tags are presence-only flags).
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag(
    /// Tag name (e.g. `time`, `msgid`).
    pub String,
    /// Optional tag value.
    pub Option<String>,
);

impl Tag {
    /// Create a new tag with a name and optional value.
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Tag(name.into(), value)
    }

    /// Tag name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Tag value, `None` for a presence-only tag.
    pub fn value(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

use std::fmt::{self, Display, Formatter};

use super::types::{Message, Tag};

/// Whether the last parameter must be written as a trailing parameter.
pub(super) fn needs_trailing(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)?;
        if let Some(ref value) = self.1 {
            write!(f, "={}", value)?;
        }
        Ok(())
    }
}

/// Writes the line without its CRLF terminator.
impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tags = self.tags();
        if !tags.is_empty() {
            write!(f, "@")?;

            for (i, tag) in tags.iter().enumerate() {
                if i > 0 {
                    write!(f, ";")?;
                }
                write!(f, "{}", tag)?;
            }

            write!(f, " ")?;
        }

        if let Some(source) = self.source() {
            write!(f, ":{} ", source)?;
        }

        write!(f, "{}", self.command())?;

        let params = self.params();
        for (i, param) in params.iter().enumerate() {
            if i + 1 == params.len() && needs_trailing(param) {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }

        Ok(())
    }
}

//! Registration credentials.

/// Password sentinel meaning "send no PASS".
pub const NO_PASSWORD: &str = "*";

/// The identity a client registers with.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// Nickname requested with `NICK`.
    pub nickname: String,
    /// Username sent with `USER`.
    pub username: String,
    /// Realname sent as the trailing `USER` parameter.
    pub realname: String,
    /// Connection password, [`NO_PASSWORD`] when none.
    #[cfg_attr(feature = "serde", serde(default = "default_password"))]
    pub password: String,
}

#[cfg(feature = "serde")]
fn default_password() -> String {
    NO_PASSWORD.to_owned()
}

impl User {
    /// Use `name` as nickname, username and realname, with no password.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        User {
            nickname: name.clone(),
            username: name.clone(),
            realname: name,
            password: NO_PASSWORD.to_owned(),
        }
    }

    /// Set the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the realname.
    #[must_use]
    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    /// Set the connection password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Whether a `PASS` line is sent on registration.
    pub fn has_password(&self) -> bool {
        self.password != NO_PASSWORD
    }

    /// The registration lines in the order they are sent.
    pub fn registration_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if self.has_password() {
            lines.push(format!("PASS {}", self.password));
        }
        lines.push(format!("NICK {}", self.nickname));
        lines.push(format!("USER {} 0 * :{}", self.username, self.realname));
        lines
    }
}

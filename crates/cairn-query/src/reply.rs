//! Command replies.

use std::fmt::{self, Display};

/// What a command returns to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A counter value.
    Integer(i64),
    /// Simple-string OK.
    Ok,
    /// Key not present (GET only; ENSURE reports absence as an error).
    Null,
    /// A user-visible error line.
    Error(String),
}

impl Reply {
    /// The invalid-integer error every parsing command shares.
    pub fn invalid_integer() -> Self {
        Reply::Error("value is not an integer or out of range".to_string())
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Integer(value) => write!(f, "{value}"),
            Reply::Ok => f.write_str("OK"),
            Reply::Null => f.write_str("(nil)"),
            Reply::Error(message) => write!(f, "ERR {message}"),
        }
    }
}

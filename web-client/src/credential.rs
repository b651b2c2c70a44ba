// web-client/src/credential.rs
use std::fmt;

use crate::error::SessionError;

/// Stringified "no value" markers that must never pass for a token.
const ABSENCE_MARKERS: [&str; 2] = ["null", "undefined"];

/// A bearer token that passed validation. Opaque to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let token = raw.trim();
        if token.is_empty() || ABSENCE_MARKERS.iter().any(|m| token.eq_ignore_ascii_case(m)) {
            return Err(SessionError::InvalidCredential);
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

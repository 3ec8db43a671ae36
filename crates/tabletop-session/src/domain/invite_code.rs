//! Invite codes: the public address of a session.

use std::fmt;

use serde::{Deserialize, Serialize};
use tabletop_core::error::DomainError;
use tabletop_core::rng::DeterministicRng;

/// Symbols an invite code is drawn from.
pub const INVITE_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of symbols in an invite code.
pub const INVITE_CODE_LENGTH: usize = 6;

/// A short, human-shareable session address such as `K7Q2ZD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InviteCode(String);

impl InviteCode {
    /// Draws a fresh code, each symbol chosen independently.
    ///
    /// Codes are not checked against existing sessions here; the checkpoint
    /// store's uniqueness constraint rejects a colliding create.
    #[must_use]
    pub fn allocate(rng: &mut dyn DeterministicRng) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let last = (INVITE_CODE_ALPHABET.len() - 1) as u32;
        let code = (0..INVITE_CODE_LENGTH)
            .map(|_| {
                let index = rng.next_u32_range(0, last) as usize;
                char::from(INVITE_CODE_ALPHABET[index % INVITE_CODE_ALPHABET.len()])
            })
            .collect();
        Self(code)
    }

    /// Parses a code received from a caller.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Malformed` if the code has the wrong length or
    /// contains a symbol outside the alphabet. Lowercase is not accepted.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid = raw.len() == INVITE_CODE_LENGTH
            && raw.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b));
        if !valid {
            return Err(DomainError::Malformed(format!("invalid invite code: {raw:?}")));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for InviteCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InviteCode> for String {
    fn from(code: InviteCode) -> Self {
        code.0
    }
}

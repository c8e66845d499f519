//! Fixed-length hexadecimal identifiers.
//!
//! Event ids and author pubkeys are both 64-character lowercase hex strings
//! on the wire. Equality is exact string equality; the newtypes below reject
//! anything that does not match the fixed shape at parse time, which is also
//! the minimal structural validation applied to records received from remote
//! relays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Length of a hex-encoded identifier (32 bytes).
pub const HEX_ID_LEN: usize = 64;

/// Whether `s` is a 64-character lowercase hex string.
pub fn is_hex_id(s: &str) -> bool {
    s.len() == HEX_ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// An author's public key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey(String);

impl Pubkey {
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        if is_hex_id(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(TypesError::InvalidHexId(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Pubkey {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, TypesError> {
        if is_hex_id(&s) {
            Ok(Self(s))
        } else {
            Err(TypesError::InvalidHexId(s))
        }
    }
}

impl From<Pubkey> for String {
    fn from(pk: Pubkey) -> String {
        pk.0
    }
}

impl FromStr for Pubkey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, TypesError> {
        Self::parse(s)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({}…)", &self.0[..8])
    }
}

/// A content-addressed event identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        if is_hex_id(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(TypesError::InvalidHexId(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, TypesError> {
        if is_hex_id(&s) {
            Ok(Self(s))
        } else {
            Err(TypesError::InvalidHexId(s))
        }
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> String {
        id.0
    }
}

impl FromStr for EventId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, TypesError> {
        Self::parse(s)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({}…)", &self.0[..8])
    }
}

//! Events and their tag lists.

use serde::{Deserialize, Serialize};

use crate::id::{is_hex_id, EventId, Pubkey};

/// Kind number of a contact-list event.
pub const KIND_CONTACT_LIST: u32 = 3;

/// Tag name marking a "follows this pubkey" edge in a contact list.
pub const TAG_CONTACT: &str = "p";

/// Tag name of a proof-of-work nonce commitment.
pub const TAG_NONCE: &str = "nonce";

/// A signed event as it appears on the wire.
///
/// Deserialization enforces the structural shape of `id` and `pubkey`
/// (64-char lowercase hex); signature verification is out of scope for the
/// guard layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub pubkey: Pubkey,
    pub created_at: u64,
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Pubkeys this event's author follows, extracted from its contact tags.
    ///
    /// An entry qualifies only if it has at least two elements, its first
    /// element is the contact tag name, and its second element has the
    /// fixed hex identifier shape. Anything else is skipped without error.
    pub fn contacts(&self) -> impl Iterator<Item = Pubkey> + '_ {
        self.tags.iter().filter_map(|tag| {
            let (name, value) = (tag.first()?, tag.get(1)?);
            if name == TAG_CONTACT && is_hex_id(value) {
                Pubkey::parse(value).ok()
            } else {
                None
            }
        })
    }

    /// The raw target field of a complete three-element nonce tag, if any.
    pub fn nonce_target(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(TAG_NONCE) && tag.len() == 3)
            .map(|tag| tag[2].as_str())
    }
}

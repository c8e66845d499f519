//! Fundamental types for the Palisade guard suite.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: event identifiers, author pubkeys, events with their tag lists,
//! subscription filters, and proof-of-work difficulty counting.

pub mod error;
pub mod event;
pub mod filter;
pub mod id;
pub mod pow;

pub use error::TypesError;
pub use event::{Event, KIND_CONTACT_LIST, TAG_CONTACT, TAG_NONCE};
pub use filter::Filter;
pub use id::{is_hex_id, EventId, Pubkey, HEX_ID_LEN};
pub use pow::pow_difficulty;

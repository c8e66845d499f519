//! Subscription filters and structural event matching.

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::id::Pubkey;

/// A subscription filter as sent in a `REQ` frame and as used for the
/// structural skip-filter checks in the guard layer.
///
/// All fields are optional; an empty filter matches every event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Filter {
    /// Filter selecting the contact-list events of the given authors.
    pub fn contact_lists(authors: &[Pubkey]) -> Self {
        Self {
            kinds: Some(vec![crate::event::KIND_CONTACT_LIST]),
            authors: Some(authors.iter().map(|pk| pk.as_str().to_owned()).collect()),
            ..Self::default()
        }
    }

    /// Whether `event` matches every constraint present in this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == event.id.as_str()) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|pk| pk == event.pubkey.as_str()) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        true
    }
}

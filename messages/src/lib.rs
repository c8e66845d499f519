//! Wire message types for client-relay communication.
//!
//! Every message is a JSON array whose first element is a string tag:
//! `["EVENT", …]`, `["REQ", subscription_id, filter…]`, `["OK", event_id,
//! accepted, message]`, `["EOSE", subscription_id]`, and so on.
//! [`IncomingMessage`] is what a relay receives from a client (and therefore
//! also what our outbound protocol client sends to remote relays);
//! [`OutgoingMessage`] is what a relay sends back.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

use palisade_types::{Event, EventId, Filter};

/// Errors raised while parsing or building wire frames.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tags of client-to-relay messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Event,
    Req,
    Close,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Event => "EVENT",
            MessageType::Req => "REQ",
            MessageType::Close => "CLOSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message received by a relay from a client.
#[derive(Clone, Debug, PartialEq)]
pub enum IncomingMessage {
    /// `["EVENT", event]`
    Event(Event),
    /// `["REQ", subscription_id, filter…]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },
    /// `["CLOSE", subscription_id]`
    Close { subscription_id: String },
}

impl IncomingMessage {
    /// A `REQ` with a single filter, as issued by the protocol client.
    pub fn req(subscription_id: impl Into<String>, filter: Filter) -> Self {
        Self::Req {
            subscription_id: subscription_id.into(),
            filters: vec![filter],
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            IncomingMessage::Event(_) => MessageType::Event,
            IncomingMessage::Req { .. } => MessageType::Req,
            IncomingMessage::Close { .. } => MessageType::Close,
        }
    }

    /// Parse a text frame.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        let items = value
            .as_array()
            .ok_or_else(|| MessageError::Malformed("not an array".into()))?;
        let tag = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| MessageError::Malformed("missing type tag".into()))?;

        match tag {
            "EVENT" => {
                let event = items
                    .get(1)
                    .cloned()
                    .ok_or_else(|| MessageError::Malformed("EVENT without payload".into()))?;
                Ok(Self::Event(serde_json::from_value(event)?))
            }
            "REQ" => {
                let subscription_id = items
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| MessageError::Malformed("REQ without subscription id".into()))?
                    .to_owned();
                let filters = items[2..]
                    .iter()
                    .map(|v| serde_json::from_value(v.clone()))
                    .collect::<Result<Vec<Filter>, _>>()?;
                Ok(Self::Req {
                    subscription_id,
                    filters,
                })
            }
            "CLOSE" => {
                let subscription_id = items
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| MessageError::Malformed("CLOSE without subscription id".into()))?
                    .to_owned();
                Ok(Self::Close { subscription_id })
            }
            other => Err(MessageError::UnknownType(other.to_owned())),
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> String {
        let value = match self {
            IncomingMessage::Event(event) => json!(["EVENT", event]),
            IncomingMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut items = vec![json!("REQ"), json!(subscription_id)];
                items.extend(filters.iter().map(|f| json!(f)));
                Value::Array(items)
            }
            IncomingMessage::Close { subscription_id } => json!(["CLOSE", subscription_id]),
        };
        value.to_string()
    }
}

/// A message sent by a relay to a client. This is also what our protocol
/// client parses off the wire when talking to remote relays.
#[derive(Clone, Debug, PartialEq)]
pub enum OutgoingMessage {
    /// `["OK", event_id, accepted, message]`
    Ok {
        event_id: EventId,
        accepted: bool,
        message: String,
    },
    /// `["CLOSED", subscription_id, message]`
    Closed {
        subscription_id: String,
        message: String,
    },
    /// `["EVENT", subscription_id, event]`
    Event {
        subscription_id: String,
        event: Event,
    },
    /// `["EOSE", subscription_id]`
    Eose { subscription_id: String },
    /// `["NOTICE", message]`
    Notice(String),
}

impl OutgoingMessage {
    pub fn ok(event_id: EventId, accepted: bool, message: impl Into<String>) -> Self {
        Self::Ok {
            event_id,
            accepted,
            message: message.into(),
        }
    }

    pub fn closed(subscription_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Closed {
            subscription_id: subscription_id.into(),
            message: message.into(),
        }
    }

    /// Parse a text frame. Events failing structural validation surface as
    /// `Err`; callers on the client path drop them silently.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text)?;
        let items = value
            .as_array()
            .ok_or_else(|| MessageError::Malformed("not an array".into()))?;
        let tag = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| MessageError::Malformed("missing type tag".into()))?;

        let sub_id = |index: usize| -> Result<String, MessageError> {
            items
                .get(index)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| MessageError::Malformed(format!("{tag} without subscription id")))
        };

        match tag {
            "OK" => {
                let event_id = items
                    .get(1)
                    .cloned()
                    .ok_or_else(|| MessageError::Malformed("OK without event id".into()))?;
                let accepted = items
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| MessageError::Malformed("OK without accepted flag".into()))?;
                let message = items
                    .get(3)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                Ok(Self::Ok {
                    event_id: serde_json::from_value(event_id)?,
                    accepted,
                    message,
                })
            }
            "CLOSED" => Ok(Self::Closed {
                subscription_id: sub_id(1)?,
                message: items
                    .get(2)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }),
            "EVENT" => {
                let subscription_id = sub_id(1)?;
                let event = items
                    .get(2)
                    .cloned()
                    .ok_or_else(|| MessageError::Malformed("EVENT without payload".into()))?;
                Ok(Self::Event {
                    subscription_id,
                    event: serde_json::from_value(event)?,
                })
            }
            "EOSE" => Ok(Self::Eose {
                subscription_id: sub_id(1)?,
            }),
            "NOTICE" => Ok(Self::Notice(
                items
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            )),
            other => Err(MessageError::UnknownType(other.to_owned())),
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> String {
        let value = match self {
            OutgoingMessage::Ok {
                event_id,
                accepted,
                message,
            } => json!(["OK", event_id, accepted, message]),
            OutgoingMessage::Closed {
                subscription_id,
                message,
            } => json!(["CLOSED", subscription_id, message]),
            OutgoingMessage::Event {
                subscription_id,
                event,
            } => json!(["EVENT", subscription_id, event]),
            OutgoingMessage::Eose { subscription_id } => json!(["EOSE", subscription_id]),
            OutgoingMessage::Notice(message) => json!(["NOTICE", message]),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::Pubkey;

    fn sample_event() -> Event {
        Event {
            id: EventId::parse(&"1".repeat(64)).unwrap(),
            pubkey: Pubkey::parse(&"2".repeat(64)).unwrap(),
            created_at: 1_700_000_000,
            kind: 3,
            tags: vec![vec!["p".into(), "a".repeat(64)]],
            content: String::new(),
            sig: String::new(),
        }
    }

    #[test]
    fn req_frame_shape() {
        let frame = IncomingMessage::req("sub1", Filter::contact_lists(&[])).to_json();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value[0], "REQ");
        assert_eq!(value[1], "sub1");
        assert_eq!(value[2]["kinds"], json!([3]));
    }

    #[test]
    fn incoming_roundtrip() {
        for message in [
            IncomingMessage::Event(sample_event()),
            IncomingMessage::req("s", Filter::default()),
            IncomingMessage::Close {
                subscription_id: "s".into(),
            },
        ] {
            let parsed = IncomingMessage::from_json(&message.to_json()).unwrap();
            assert_eq!(parsed, message);
        }
    }

    #[test]
    fn ok_frame_shape() {
        let frame =
            OutgoingMessage::ok(EventId::parse(&"1".repeat(64)).unwrap(), false, "blocked")
                .to_json();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!(["OK", "1".repeat(64), false, "blocked"]));
    }

    #[test]
    fn parses_event_and_eose_frames() {
        let event_frame = json!(["EVENT", "sub1", sample_event()]).to_string();
        match OutgoingMessage::from_json(&event_frame).unwrap() {
            OutgoingMessage::Event {
                subscription_id,
                event,
            } => {
                assert_eq!(subscription_id, "sub1");
                assert_eq!(event, sample_event());
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let eose_frame = json!(["EOSE", "sub1"]).to_string();
        assert_eq!(
            OutgoingMessage::from_json(&eose_frame).unwrap(),
            OutgoingMessage::Eose {
                subscription_id: "sub1".into()
            }
        );
    }

    #[test]
    fn rejects_structurally_invalid_event() {
        let frame = json!(["EVENT", "sub1", {"id": "bad", "pubkey": "bad", "created_at": 1, "kind": 3}])
            .to_string();
        assert!(OutgoingMessage::from_json(&frame).is_err());
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(matches!(
            OutgoingMessage::from_json(r#"["AUTH", "challenge"]"#),
            Err(MessageError::UnknownType(tag)) if tag == "AUTH"
        ));
    }
}

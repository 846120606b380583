//! Wire format of the remote-control protocol.
//!
//! Every websocket text frame carries exactly one JSON object. Outbound
//! frames are [`Request`]s tagged with a `message-id`; inbound frames are
//! either replies (carrying that id back) or pushes (carrying an
//! `update-type` discriminator instead). [`Frame::parse`] performs that
//! classification.
//!
//! - `auth` - Challenge-response digest
//! - `requests` - Pure builders for every request the engine issues
//! - `update` - Closed union of push payloads

pub mod auth;
pub mod requests;
pub mod update;

use serde_json::{Map, Value};

use crate::error::RemoteError;
use crate::protocol_constants::{
    FIELD_ERROR, FIELD_MESSAGE_ID, FIELD_REQUEST_TYPE, FIELD_STATUS, FIELD_UPDATE_TYPE,
    STATUS_ERROR, STATUS_OK,
};

pub use update::{Update, UpdateKind};

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// An outbound request: a `request-type` plus command fields.
///
/// The correlation id is not part of the request; it is assigned by the
/// correlator at send time and embedded by [`Request::to_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    request_type: String,
    fields: Map<String, Value>,
}

impl Request {
    /// Creates a request with no command fields.
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            fields: Map::new(),
        }
    }

    /// Adds a command field.
    #[must_use]
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// The `request-type` of this request.
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    /// Looks up a command field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Serializes the request with `id` embedded as a string `message-id`.
    pub fn to_frame(&self, id: u64) -> String {
        let mut object = self.fields.clone();
        object.insert(
            FIELD_REQUEST_TYPE.to_string(),
            Value::String(self.request_type.clone()),
        );
        object.insert(FIELD_MESSAGE_ID.to_string(), Value::String(id.to_string()));
        Value::Object(object).to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Status carried by replies and (optionally) pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Error,
}

impl ReplyStatus {
    /// Reads the status field; a missing or unknown status counts as `Ok`.
    fn from_object(object: &Map<String, Value>) -> Self {
        match object.get(FIELD_STATUS).and_then(Value::as_str) {
            Some(STATUS_ERROR) => Self::Error,
            _ => Self::Ok,
        }
    }
}

/// A reply frame as delivered to a request's callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Correlation id of the request this answers.
    pub message_id: u64,
    /// `request-type` of the originating request (filled in by the correlator).
    pub request_type: String,
    pub status: ReplyStatus,
    /// Server-supplied error text when `status` is `Error`.
    pub error: Option<String>,
    /// The complete raw reply object.
    pub payload: Value,
}

impl Reply {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }

    /// Looks up a reply field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Converts an error-status reply into [`RemoteError::Request`].
    pub fn into_result(self) -> Result<Self, RemoteError> {
        match self.status {
            ReplyStatus::Ok => Ok(self),
            ReplyStatus::Error => Err(RemoteError::Request {
                request_type: self.request_type,
                message: self.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }
}

/// A reply frame before correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    /// The raw `message-id`; non-numeric ids never match a pending request.
    pub message_id: String,
    pub status: ReplyStatus,
    pub error: Option<String>,
    pub payload: Value,
}

impl ReplyFrame {
    /// Numeric correlation key, if the id is one the engine could have issued.
    pub fn correlation_id(&self) -> Option<u64> {
        self.message_id.parse().ok()
    }

    /// Binds the frame to the request it answers.
    pub fn into_reply(self, message_id: u64, request_type: String) -> Reply {
        Reply {
            message_id,
            request_type,
            status: self.status,
            error: self.error,
            payload: self.payload,
        }
    }
}

/// A push frame with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFrame {
    pub update: Update,
    /// False when the push carried a non-`ok` status; such pushes are still
    /// announced but never reconciled.
    pub ok: bool,
    pub payload: Value,
}

/// One classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Reply(ReplyFrame),
    Push(PushFrame),
}

impl Frame {
    /// Parses and classifies one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Protocol`] for non-JSON text, non-object JSON,
    /// objects carrying neither discriminator, and recognized pushes whose
    /// payload does not match their kind.
    pub fn parse(text: &str) -> Result<Self, RemoteError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(object) = &value else {
            return Err(RemoteError::Protocol("frame is not a JSON object".into()));
        };

        if let Some(update_type) = object.get(FIELD_UPDATE_TYPE) {
            let update_type = update_type
                .as_str()
                .ok_or_else(|| RemoteError::Protocol("update-type is not a string".into()))?;
            let ok = object
                .get(FIELD_STATUS)
                .and_then(Value::as_str)
                .map_or(true, |s| s == STATUS_OK);
            let update = Update::decode(update_type, &value)?;
            return Ok(Self::Push(PushFrame {
                update,
                ok,
                payload: value,
            }));
        }

        let message_id = match object.get(FIELD_MESSAGE_ID) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => {
                return Err(RemoteError::Protocol(
                    "message-id is not a string or number".into(),
                ))
            }
            None => {
                return Err(RemoteError::Protocol(
                    "frame has neither update-type nor message-id".into(),
                ))
            }
        };
        let status = ReplyStatus::from_object(object);
        let error = object
            .get(FIELD_ERROR)
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self::Reply(ReplyFrame {
            message_id,
            status,
            error,
            payload: value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_frame_embeds_id_as_string() {
        let frame = Request::new("SetCurrentScene")
            .field("scene-name", "Live")
            .to_frame(7);
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["request-type"], "SetCurrentScene");
        assert_eq!(value["message-id"], "7");
        assert_eq!(value["scene-name"], "Live");
    }

    #[test]
    fn reply_frames_are_classified_by_message_id() {
        let frame = Frame::parse(r#"{"message-id":"3","status":"error","error":"nope"}"#).unwrap();
        let Frame::Reply(reply) = frame else {
            panic!("expected reply");
        };
        assert_eq!(reply.correlation_id(), Some(3));
        assert_eq!(reply.status, ReplyStatus::Error);
        assert_eq!(reply.error.as_deref(), Some("nope"));
    }

    #[test]
    fn push_frames_are_classified_by_update_type() {
        let frame = Frame::parse(r#"{"update-type":"StreamStarting","preview-only":false}"#).unwrap();
        let Frame::Push(push) = frame else {
            panic!("expected push");
        };
        assert!(push.ok);
        assert_eq!(push.update.kind(), Some(UpdateKind::StreamStarting));
    }

    #[test]
    fn unknown_push_decodes_to_unhandled() {
        let frame = Frame::parse(r#"{"update-type":"TransitionBegin"}"#).unwrap();
        let Frame::Push(push) = frame else {
            panic!("expected push");
        };
        assert_eq!(push.update, Update::Unhandled("TransitionBegin".into()));
    }

    #[test]
    fn malformed_frames_are_protocol_errors() {
        assert!(matches!(Frame::parse("not json"), Err(RemoteError::Protocol(_))));
        assert!(matches!(Frame::parse("[1,2]"), Err(RemoteError::Protocol(_))));
        assert!(matches!(
            Frame::parse(r#"{"status":"ok"}"#),
            Err(RemoteError::Protocol(_))
        ));
    }

    #[test]
    fn error_reply_converts_to_request_error() {
        let reply = Reply {
            message_id: 1,
            request_type: "SetSourceRender".into(),
            status: ReplyStatus::Error,
            error: Some("source not found".into()),
            payload: json!({}),
        };
        assert_eq!(
            reply.into_result(),
            Err(RemoteError::Request {
                request_type: "SetSourceRender".into(),
                message: "source not found".into(),
            })
        );
    }
}

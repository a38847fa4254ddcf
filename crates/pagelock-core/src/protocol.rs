//! Message protocol between the coordinator, tab agents and the control panel
//!
//! Messages are plain JSON objects tagged by `type`. Incoming fields are read
//! leniently: a `windowId` only counts when it is an integer, and `locked` is
//! coerced by truthiness.

use crate::types::{LockState, TabInfo, WindowId};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Request sent to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "LOCK_GET_STATE")]
    GetState {
        #[serde(
            rename = "windowId",
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient_window_id"
        )]
        window_id: Option<WindowId>,
    },

    #[serde(rename = "LOCK_SET")]
    Set {
        #[serde(default, deserialize_with = "truthy")]
        locked: bool,
        #[serde(
            rename = "windowId",
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient_window_id"
        )]
        window_id: Option<WindowId>,
    },
}

impl Request {
    /// Decode a raw message. Returns `None` for messages this protocol does
    /// not handle (unknown or missing `type`, non-object payloads).
    pub fn parse(message: &Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }
}

/// Answer to [`Request::GetState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    /// Whether the requester's window is locked
    pub locked: bool,
    /// The raw global record
    pub state: LockState,
}

/// Answer to [`Request::Set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// Response sent back by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State(StateReport),
    Ack(Ack),
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack(Ack { ok: true })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Notification pushed from the coordinator to a tab agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    #[serde(rename = "LOCK_ENABLE")]
    Enable,
    #[serde(rename = "LOCK_DISABLE")]
    Disable,
}

impl AgentMessage {
    pub fn for_lock(locked: bool) -> Self {
        if locked {
            AgentMessage::Enable
        } else {
            AgentMessage::Disable
        }
    }
}

/// Who sent a request. Requests from a page carry the sending tab; requests
/// from the control panel or external callers carry none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sender {
    pub tab: Option<TabInfo>,
}

impl Sender {
    pub fn tab(tab: TabInfo) -> Self {
        Self { tab: Some(tab) }
    }

    pub fn extension() -> Self {
        Self { tab: None }
    }
}

/// Failures of the messaging transport itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,

    #[error("The message channel closed before a response was received")]
    Closed,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Client side of the request/response protocol
#[async_trait(?Send)]
pub trait CoordinatorLink {
    async fn request(&self, request: Request) -> Result<Response, LinkError>;

    /// Ask whether the caller's window is locked
    async fn get_state(&self, window_id: Option<WindowId>) -> Result<StateReport, LinkError> {
        match self.request(Request::GetState { window_id }).await? {
            Response::State(report) => Ok(report),
            other => Err(LinkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Ask the coordinator to lock or unlock
    async fn set_state(&self, locked: bool, window_id: Option<WindowId>) -> Result<(), LinkError> {
        match self.request(Request::Set { locked, window_id }).await? {
            Response::Ack(_) => Ok(()),
            other => Err(LinkError::UnexpectedResponse(format!("{:?}", other))),
        }
    }
}

fn lenient_window_id<'de, D>(deserializer: D) -> Result<Option<WindowId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(WindowId::from_json(&value))
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

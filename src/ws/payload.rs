use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Result;

/// An inbound message as handed to the receive callback.
///
/// Text frames are decoded as JSON when possible. Anything that fails to
/// decode is passed through untouched, so receivers must handle both shapes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The frame was valid JSON
    Json(Value),
    /// The frame was not JSON; original text
    Raw(String),
}

impl Payload {
    /// Normalizes a text frame, logging (not failing) when it is not JSON.
    #[must_use]
    pub fn decode(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, error = %e, "Failed to decode WebSocket message as JSON");
                #[cfg(not(feature = "tracing"))]
                let _: &serde_json::Error = &e;
                Self::Raw(text)
            }
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Raw(text) => Some(text),
        }
    }

    /// Deserializes a JSON payload into a typed message.
    ///
    /// Raw payloads are parsed again so the returned error describes why the
    /// text is not valid JSON.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self {
            Self::Json(value) => T::deserialize(value)?,
            Self::Raw(text) => serde_json::from_str(text)?,
        };
        Ok(value)
    }
}

//! Classification of backend responses.
//!
//! Most endpoints answer `{ success, message?, ...payload }`. A few admin
//! endpoints return bare JSON, which is accepted on any 2xx status.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::error::ApiError;

const UNAUTHORIZED: u16 = 401;

/// Status and body of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub endpoint: String,
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    fn ensure_success_status(&self) -> Result<(), ApiError> {
        if self.status == UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !(200..300).contains(&self.status) {
            return Err(ApiError::HttpStatus {
                endpoint: self.endpoint.clone(),
                status: self.status,
                message: serde_json::from_str::<Value>(&self.body)
                    .ok()
                    .as_ref()
                    .and_then(message_of),
            });
        }
        Ok(())
    }

    fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_str(&self.body).map_err(|error| self.malformed(error.to_string()))
    }

    fn malformed(&self, detail: String) -> ApiError {
        ApiError::MalformedPayload {
            endpoint: self.endpoint.clone(),
            detail,
        }
    }

    fn typed<T: DeserializeOwned>(&self, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|error| self.malformed(error.to_string()))
    }
}

fn message_of(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .filter(|message| !message.trim().is_empty())
}

/// Decodes `{ success: true, ...payload }` into `T`.
pub fn decode_envelope<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
    response.ensure_success_status()?;
    let value = response.json()?;

    match value.get("success").and_then(Value::as_bool) {
        Some(true) => response.typed(value),
        Some(false) => Err(ApiError::Rejected {
            endpoint: response.endpoint.clone(),
            message: message_of(&value),
        }),
        None => Err(response.malformed("missing `success` flag".to_owned())),
    }
}

/// Checks an envelope that carries no payload; returns its message.
pub fn decode_ack(response: &RawResponse) -> Result<Option<String>, ApiError> {
    let value: Value = decode_envelope(response)?;
    Ok(message_of(&value))
}

/// Decodes a 2xx body without an envelope.
pub fn decode_bare<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ApiError> {
    response.ensure_success_status()?;
    let value = response.json()?;
    response.typed(value)
}

/// 2xx is success; a JSON `message`, when present, is returned. Bodies that
/// are not JSON are accepted as well.
pub fn decode_status(response: &RawResponse) -> Result<Option<String>, ApiError> {
    response.ensure_success_status()?;
    Ok(serde_json::from_str::<Value>(&response.body)
        .ok()
        .as_ref()
        .and_then(message_of))
}

/* This file is part of fundfi (https://codeberg.org/fundfi/fundfi)
 *
 * Copyright (C) 2024-2026 The fundfi developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! JSON-RPC 2.0 object definitions
use std::collections::HashMap;

use rand::{rngs::OsRng, Rng};
use tinyjson::JsonValue;

use crate::{error::RpcError, Result};

/// JSON-RPC error codes.
/// The error codes `[-32768, -32000]` are reserved for predefined errors.
#[derive(Copy, Clone, Debug)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist / is not available.
    MethodNotFound,
    /// Invalid method parameter(s).
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Reserved for implementation-defined server-errors.
    ServerError(i32),
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        match *self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(c) => c,
        }
    }

    pub fn message(&self) -> String {
        let msg = match *self {
            Self::ParseError => "parse error",
            Self::InvalidRequest => "invalid request",
            Self::MethodNotFound => "method not found",
            Self::InvalidParams => "invalid params",
            Self::InternalError => "internal error",
            Self::ServerError(_) => "server error",
        };

        msg.to_string()
    }
}

/// The wire code for "method not found", used by callers probing for
/// optional server capabilities.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Wrapping enum around the available JSON-RPC object types
#[derive(Clone, Debug)]
pub enum JsonResult {
    Response(JsonResponse),
    Error(JsonError),
    Notification(JsonNotification),
}

impl JsonResult {
    pub fn try_from_value(value: &JsonValue) -> Result<Self> {
        if let Ok(response) = JsonResponse::try_from(value) {
            return Ok(Self::Response(response))
        }

        if let Ok(error) = JsonError::try_from(value) {
            return Ok(Self::Error(error))
        }

        if let Ok(notification) = JsonNotification::try_from(value) {
            return Ok(Self::Notification(notification))
        }

        Err(RpcError::InvalidJson("Invalid JSON-RPC object".to_string()).into())
    }
}

/// Fetch the object map out of a `JsonValue`, and verify its "jsonrpc"
/// version field. All four JSON-RPC object types share this envelope.
fn envelope_map(
    value: &JsonValue,
    obj: &'static str,
) -> std::result::Result<HashMap<String, JsonValue>, RpcError> {
    let Some(map) = value.get::<HashMap<String, JsonValue>>() else {
        return Err(RpcError::InvalidJson(format!("{obj} is not an Object")))
    };

    match map.get("jsonrpc") {
        Some(JsonValue::String(version)) if version == "2.0" => Ok(map.clone()),
        _ => Err(RpcError::InvalidJson(format!("{obj} lacks a valid \"jsonrpc\" field"))),
    }
}

/// Fetch a numeric "id" field out of an envelope map.
fn envelope_id(
    map: &HashMap<String, JsonValue>,
    obj: &'static str,
) -> std::result::Result<u16, RpcError> {
    match map.get("id") {
        Some(JsonValue::Number(id)) => Ok(*id as u16),
        _ => Err(RpcError::InvalidJson(format!("{obj} lacks a valid \"id\" field"))),
    }
}

/// Fetch the "params" field out of an envelope map. Params must be
/// either an Array or an Object.
fn envelope_params(
    map: &HashMap<String, JsonValue>,
    obj: &'static str,
) -> std::result::Result<JsonValue, RpcError> {
    match map.get("params") {
        Some(params) if params.is_array() || params.is_object() => Ok(params.clone()),
        _ => Err(RpcError::InvalidJson(format!("{obj} lacks a valid \"params\" field"))),
    }
}

/// A JSON-RPC request object
#[derive(Clone, Debug)]
pub struct JsonRequest {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Request ID
    pub id: u16,
    /// Request method
    pub method: String,
    /// Request parameters
    pub params: JsonValue,
}

impl JsonRequest {
    /// Create a new [`JsonRequest`] object with the given method and parameters.
    /// The request ID is chosen randomly.
    pub fn new(method: &str, params: JsonValue) -> Self {
        assert!(params.is_object() || params.is_array());
        Self { jsonrpc: "2.0", id: OsRng.gen(), method: method.to_string(), params }
    }

    /// Convert the object into a JSON string
    pub fn stringify(&self) -> Result<String> {
        let v: JsonValue = self.into();
        Ok(v.stringify()?)
    }
}

impl From<&JsonRequest> for JsonValue {
    fn from(req: &JsonRequest) -> JsonValue {
        JsonValue::Object(HashMap::from([
            ("jsonrpc".to_string(), JsonValue::String(req.jsonrpc.to_string())),
            ("id".to_string(), JsonValue::Number(req.id.into())),
            ("method".to_string(), JsonValue::String(req.method.clone())),
            ("params".to_string(), req.params.clone()),
        ]))
    }
}

impl TryFrom<&JsonValue> for JsonRequest {
    type Error = RpcError;

    fn try_from(value: &JsonValue) -> std::result::Result<Self, Self::Error> {
        let map = envelope_map(value, "Request")?;
        let id = envelope_id(&map, "Request")?;
        let params = envelope_params(&map, "Request")?;

        let Some(JsonValue::String(method)) = map.get("method") else {
            return Err(RpcError::InvalidJson("Request lacks a valid \"method\" field".to_string()))
        };

        Ok(Self { jsonrpc: "2.0", id, method: method.clone(), params })
    }
}

/// A JSON-RPC notification object
#[derive(Clone, Debug)]
pub struct JsonNotification {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Notification method
    pub method: String,
    /// Notification parameters
    pub params: JsonValue,
}

impl JsonNotification {
    /// Create a new [`JsonNotification`] object with the given method and parameters.
    pub fn new(method: &str, params: JsonValue) -> Self {
        assert!(params.is_object() || params.is_array());
        Self { jsonrpc: "2.0", method: method.to_string(), params }
    }

    /// Convert the object into a JSON string
    pub fn stringify(&self) -> Result<String> {
        let v: JsonValue = self.into();
        Ok(v.stringify()?)
    }
}

impl From<&JsonNotification> for JsonValue {
    fn from(notif: &JsonNotification) -> JsonValue {
        JsonValue::Object(HashMap::from([
            ("jsonrpc".to_string(), JsonValue::String(notif.jsonrpc.to_string())),
            ("method".to_string(), JsonValue::String(notif.method.clone())),
            ("params".to_string(), notif.params.clone()),
        ]))
    }
}

impl TryFrom<&JsonValue> for JsonNotification {
    type Error = RpcError;

    fn try_from(value: &JsonValue) -> std::result::Result<Self, Self::Error> {
        let map = envelope_map(value, "Notification")?;
        let params = envelope_params(&map, "Notification")?;

        // A notification carries no ID, that is what distinguishes it
        // from a request.
        if map.contains_key("id") {
            return Err(RpcError::InvalidJson("Notification contains an \"id\" field".to_string()))
        }

        let Some(JsonValue::String(method)) = map.get("method") else {
            return Err(RpcError::InvalidJson(
                "Notification lacks a valid \"method\" field".to_string(),
            ))
        };

        Ok(Self { jsonrpc: "2.0", method: method.clone(), params })
    }
}

/// A JSON-RPC response object
#[derive(Clone, Debug)]
pub struct JsonResponse {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Request ID
    pub id: u16,
    /// Response result
    pub result: JsonValue,
}

impl JsonResponse {
    /// Create a new [`JsonResponse`] object with the given ID and result value.
    /// Creating a `JsonResponse` implies that the method call was successful.
    pub fn new(result: JsonValue, id: u16) -> Self {
        Self { jsonrpc: "2.0", id, result }
    }

    /// Convert the object into a JSON string
    pub fn stringify(&self) -> Result<String> {
        let v: JsonValue = self.into();
        Ok(v.stringify()?)
    }
}

impl From<&JsonResponse> for JsonValue {
    fn from(rep: &JsonResponse) -> JsonValue {
        JsonValue::Object(HashMap::from([
            ("jsonrpc".to_string(), JsonValue::String(rep.jsonrpc.to_string())),
            ("id".to_string(), JsonValue::Number(rep.id.into())),
            ("result".to_string(), rep.result.clone()),
        ]))
    }
}

impl TryFrom<&JsonValue> for JsonResponse {
    type Error = RpcError;

    fn try_from(value: &JsonValue) -> std::result::Result<Self, Self::Error> {
        let map = envelope_map(value, "Response")?;
        let id = envelope_id(&map, "Response")?;

        let Some(result) = map.get("result") else {
            return Err(RpcError::InvalidJson("Response lacks a \"result\" field".to_string()))
        };

        Ok(Self { jsonrpc: "2.0", id, result: result.clone() })
    }
}

/// A JSON-RPC error object
#[derive(Clone, Debug)]
pub struct JsonError {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Request ID
    pub id: u16,
    /// JSON-RPC error (code and message)
    pub error: JsonErrorVal,
}

/// A JSON-RPC error value (code and message)
#[derive(Clone, Debug)]
pub struct JsonErrorVal {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
}

impl JsonError {
    /// Create a new [`JsonError`] object with the given error code, optional
    /// message, and a response ID.
    /// Creating a `JsonError` implies that the method call was unsuccessful.
    pub fn new(c: ErrorCode, message: Option<String>, id: u16) -> Self {
        let error = JsonErrorVal { code: c.code(), message: message.unwrap_or(c.message()) };
        Self { jsonrpc: "2.0", id, error }
    }

    /// Convert the object into a JSON string
    pub fn stringify(&self) -> Result<String> {
        let v: JsonValue = self.into();
        Ok(v.stringify()?)
    }
}

impl From<&JsonError> for JsonValue {
    fn from(err: &JsonError) -> JsonValue {
        let errmap = JsonValue::Object(HashMap::from([
            ("code".to_string(), JsonValue::Number(err.error.code.into())),
            ("message".to_string(), JsonValue::String(err.error.message.clone())),
        ]));

        JsonValue::Object(HashMap::from([
            ("jsonrpc".to_string(), JsonValue::String(err.jsonrpc.to_string())),
            ("id".to_string(), JsonValue::Number(err.id.into())),
            ("error".to_string(), errmap),
        ]))
    }
}

impl TryFrom<&JsonValue> for JsonError {
    type Error = RpcError;

    fn try_from(value: &JsonValue) -> std::result::Result<Self, Self::Error> {
        let map = envelope_map(value, "Error")?;
        let id = envelope_id(&map, "Error")?;

        let Some(JsonValue::Object(errmap)) = map.get("error") else {
            return Err(RpcError::InvalidJson("Error lacks a valid \"error\" field".to_string()))
        };

        let Some(JsonValue::Number(code)) = errmap.get("code") else {
            return Err(RpcError::InvalidJson(
                "Error lacks a valid \"error.code\" field".to_string(),
            ))
        };

        let Some(JsonValue::String(message)) = errmap.get("message") else {
            return Err(RpcError::InvalidJson(
                "Error lacks a valid \"error.message\" field".to_string(),
            ))
        };

        Ok(Self {
            jsonrpc: "2.0",
            id,
            error: JsonErrorVal { code: *code as i32, message: message.clone() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = JsonRequest::new(
            "projects.count",
            JsonValue::Array(vec![JsonValue::String("foo".to_string())]),
        );

        let val: JsonValue = (&req).into();
        let parsed = JsonRequest::try_from(&val).unwrap();
        assert_eq!(parsed.id, req.id);
        assert_eq!(parsed.method, "projects.count");
    }

    #[test]
    fn test_result_discrimination() {
        let rep: JsonValue =
            r#"{"jsonrpc": "2.0", "id": 42, "result": [1, 2, 3]}"#.parse().unwrap();
        assert!(matches!(JsonResult::try_from_value(&rep).unwrap(), JsonResult::Response(_)));

        let err: JsonValue =
            r#"{"jsonrpc": "2.0", "id": 42, "error": {"code": -32601, "message": "method not found"}}"#
                .parse()
                .unwrap();
        let JsonResult::Error(e) = JsonResult::try_from_value(&err).unwrap() else {
            panic!("expected error object")
        };
        assert_eq!(e.error.code, METHOD_NOT_FOUND);

        let notif: JsonValue =
            r#"{"jsonrpc": "2.0", "method": "ping", "params": []}"#.parse().unwrap();
        assert!(
            matches!(JsonResult::try_from_value(&notif).unwrap(), JsonResult::Notification(_))
        );

        let garbage: JsonValue = r#"{"jsonrpc": "1.0", "id": 1, "result": 1}"#.parse().unwrap();
        assert!(JsonResult::try_from_value(&garbage).is_err());
    }

    #[test]
    fn test_error_codes() {
        let e = JsonError::new(ErrorCode::MethodNotFound, None, 7);
        assert_eq!(e.error.code, -32601);
        assert_eq!(e.error.message, "method not found");

        let e = JsonError::new(ErrorCode::ServerError(-32110), Some("already registered".into()), 7);
        assert_eq!(e.error.code, -32110);
        assert_eq!(e.error.message, "already registered");
    }
}

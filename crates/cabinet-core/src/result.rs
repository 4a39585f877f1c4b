//! Result codes and the JSON response envelope

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content type of every envelope the gateway writes
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Result codes carried in the `code` field of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    BadRequest,
    ParamsError,
    UsernamePasswordError,
    Login,
    LoginExpired,
    Unauthorized,
    UserDisabled,
    NotFound,
    RangeNotSatisfiable,
    NotInstalled,
    Server,
    Unknown,
}

impl ResultCode {
    /// Every code, in wire order
    pub const ALL: [ResultCode; 13] = [
        Self::Ok,
        Self::BadRequest,
        Self::ParamsError,
        Self::UsernamePasswordError,
        Self::Login,
        Self::LoginExpired,
        Self::Unauthorized,
        Self::UserDisabled,
        Self::NotFound,
        Self::RangeNotSatisfiable,
        Self::NotInstalled,
        Self::Server,
        Self::Unknown,
    ];

    /// Integer written to the `code` field
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 0,
            Self::BadRequest => 1,
            Self::ParamsError => 2,
            Self::UsernamePasswordError => 3,
            Self::Login => 4,
            Self::LoginExpired => 5,
            Self::Unauthorized => 6,
            Self::UserDisabled => 7,
            Self::NotFound => 8,
            Self::RangeNotSatisfiable => 9,
            Self::NotInstalled => 10,
            Self::Server => 11,
            Self::Unknown => 12,
        }
    }

    /// Look a code up by its integer value
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Symbolic name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "BAD_REQUEST",
            Self::ParamsError => "PARAMS_ERROR",
            Self::UsernamePasswordError => "USERNAME_PASSWORD_ERROR",
            Self::Login => "LOGIN",
            Self::LoginExpired => "LOGIN_EXPIRED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UserDisabled => "USER_DISABLED",
            Self::NotFound => "NOT_FOUND",
            Self::RangeNotSatisfiable => "RANGE_NOT_SATISFIABLE",
            Self::NotInstalled => "NOT_INSTALLED",
            Self::Server => "SERVER",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::BadRequest
            | Self::ParamsError
            | Self::UsernamePasswordError
            | Self::NotInstalled => StatusCode::BAD_REQUEST,
            Self::Login | Self::LoginExpired | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UserDisabled => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Server | Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Canonical message used when a failure carries only the code
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::BadRequest => "bad request",
            Self::ParamsError => "invalid parameters",
            Self::UsernamePasswordError => "wrong username or password",
            Self::Login => "login required",
            Self::LoginExpired => "login expired",
            Self::Unauthorized => "not authorized",
            Self::UserDisabled => "user disabled",
            Self::NotFound => "not found",
            Self::RangeNotSatisfiable => "range not satisfiable",
            Self::NotInstalled => "application not installed",
            Self::Server => "internal server error",
            Self::Unknown => "unknown error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown result code {code}")))
    }
}

/// JSON envelope written for every API response, success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub code: ResultCode,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl WebResult {
    /// Successful result carrying a payload
    pub fn ok(data: serde_json::Value) -> Self {
        Self::from_code(ResultCode::Ok).with_data(data)
    }

    /// Result with the code's canonical message
    pub fn from_code(code: ResultCode) -> Self {
        Self {
            code,
            msg: code.description().to_string(),
            data: None,
        }
    }

    /// Result with a custom message
    pub fn custom(code: ResultCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl IntoResponse for WebResult {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(_) => format!(
                r#"{{"code":{},"msg":"{}"}}"#,
                ResultCode::Unknown.code(),
                ResultCode::Unknown.description()
            )
            .into_bytes(),
        };

        (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
    }
}

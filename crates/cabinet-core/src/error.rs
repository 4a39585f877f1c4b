//! Failure payloads raised by handlers and resolved by the failure boundary

use crate::result::{ResultCode, WebResult};
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::panic::Location;

/// Result type alias using `ApiError`
pub type Result<T> = std::result::Result<T, ApiError>;

/// What went wrong, one variant per classification rule
#[derive(Debug)]
pub enum Failure {
    /// Plain text; reported as `BAD_REQUEST` with the text as message
    Message(String),
    /// Fully built envelope; reported verbatim
    Result(WebResult),
    /// Known condition; reported with the code's canonical message
    Code(ResultCode),
    /// Any other error; reported as `UNKNOWN` with its description
    Other(anyhow::Error),
    /// Nothing usable; reported as bare `UNKNOWN`
    Unrecognized,
}

impl Failure {
    /// Resolve the failure into the envelope sent to the client
    pub fn into_web_result(self) -> WebResult {
        match self {
            Self::Message(msg) => WebResult::custom(ResultCode::BadRequest, msg),
            Self::Result(result) => result,
            Self::Code(code) => WebResult::from_code(code),
            Self::Other(err) => WebResult::custom(ResultCode::Unknown, err.to_string()),
            Self::Unrecognized => WebResult::from_code(ResultCode::Unknown),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            Self::Result(result) => write!(f, "{}: {}", result.code, result.msg),
            Self::Code(code) => write!(f, "{}: {}", code, code.description()),
            Self::Other(err) => write!(f, "{err:#}"),
            Self::Unrecognized => f.write_str("unrecognized failure"),
        }
    }
}

/// A failure together with the call site that raised it.
///
/// Every constructor is `#[track_caller]`, and so is the blanket `From` impl,
/// which means `?` records the location of the `?` itself. The location is a
/// logging aid only.
#[derive(Debug)]
pub struct ApiError {
    failure: Failure,
    location: &'static Location<'static>,
}

impl ApiError {
    #[track_caller]
    pub fn new(failure: Failure) -> Self {
        Self {
            failure,
            location: Location::caller(),
        }
    }

    /// Plain text failure
    #[track_caller]
    pub fn message(msg: impl Into<String>) -> Self {
        Self::new(Failure::Message(msg.into()))
    }

    /// Pre-built envelope, passed through untouched
    #[track_caller]
    pub fn result(result: WebResult) -> Self {
        Self::new(Failure::Result(result))
    }

    /// Known condition with its canonical message
    #[track_caller]
    pub fn code(code: ResultCode) -> Self {
        Self::new(Failure::Code(code))
    }

    /// Known condition with a custom message
    #[track_caller]
    pub fn custom(code: ResultCode, msg: impl Into<String>) -> Self {
        Self::result(WebResult::custom(code, msg))
    }

    #[track_caller]
    pub fn other(err: impl Into<anyhow::Error>) -> Self {
        Self::new(Failure::Other(err.into()))
    }

    #[track_caller]
    pub fn unrecognized() -> Self {
        Self::new(Failure::Unrecognized)
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    /// Where the failure was raised
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn into_web_result(self) -> WebResult {
        self.failure.into_web_result()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.failure, f)
    }
}

// ApiError must not implement std::error::Error or this overlaps `From<T> for T`.
impl<E> From<E> for ApiError
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[track_caller]
    fn from(err: E) -> Self {
        Self::other(err)
    }
}

impl From<WebResult> for ApiError {
    #[track_caller]
    fn from(result: WebResult) -> Self {
        Self::result(result)
    }
}

impl From<ResultCode> for ApiError {
    #[track_caller]
    fn from(code: ResultCode) -> Self {
        Self::code(code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_web_result().into_response()
    }
}

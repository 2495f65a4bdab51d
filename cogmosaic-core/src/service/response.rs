use serde::Serialize;

use crate::{MosaicError, MosaicResult};

/// Content type of JSON documents.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of messages.
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Outcome class of a handled request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The request succeeded.
    Ok,
    /// The request itself is wrong, the body tells why.
    Nok,
    /// Valid request without content, the body tells why.
    Empty,
}

/// Transport independent response of a [`MosaicService`](super::MosaicService) operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Outcome class.
    pub status: ResponseStatus,
    /// MIME type of `body`.
    pub content_type: String,
    /// Payload.
    pub body: Vec<u8>,
}

impl Response {
    /// Successful response.
    #[must_use]
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            content_type: content_type.into(),
            body,
        }
    }

    /// Successful response with a JSON document.
    pub fn json<T: Serialize>(value: &T) -> MosaicResult<Self> {
        Ok(Self::ok(JSON_CONTENT_TYPE, serde_json::to_vec(value)?))
    }

    /// The request cannot be served as asked.
    #[must_use]
    pub fn nok(message: impl Into<String>) -> Self {
        Self::message(ResponseStatus::Nok, message.into())
    }

    /// Nothing to serve.
    #[must_use]
    pub fn empty(message: impl Into<String>) -> Self {
        Self::message(ResponseStatus::Empty, message.into())
    }

    fn message(status: ResponseStatus, message: String) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            body: message.into_bytes(),
        }
    }

    /// The body as text, if it is UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

impl MosaicError {
    /// Report user errors as a `NOK` response. Other errors are returned
    /// unchanged for the transport to report as failures.
    pub fn into_response(self) -> MosaicResult<Response> {
        if self.is_user_error() {
            Ok(Response::nok(self.to_string()))
        } else {
            Err(self)
        }
    }
}

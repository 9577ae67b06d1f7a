//! Classification of a raw service reply into a verdict or a failure.

use serde_json::Value;
use shared::{
    domain::ComparisonResult,
    error::SubmissionError,
    protocol::{
        RawReply, ServiceErrorBody, ENTITY_TOO_LARGE_MARKER, PAYLOAD_TOO_LARGE_CODE,
        UNAVAILABLE_CODES,
    },
};
use tracing::warn;

pub fn interpret_reply(reply: &RawReply) -> Result<ComparisonResult, SubmissionError> {
    let text = reply.body.as_str();
    if text.trim().is_empty() {
        return Err(SubmissionError::EmptyResponse);
    }

    let parsed: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(status = reply.status, error = %err, body = text, "compare reply is not json");
            return Err(classify_unparseable(text));
        }
    };

    if !reply.is_success() {
        return Err(server_error(reply.status, parsed));
    }

    serde_json::from_value(parsed).map_err(|err| {
        warn!(status = reply.status, error = %err, "compare reply has unexpected shape");
        SubmissionError::MalformedResponse
    })
}

/// Substring sniffing for bodies that are not JSON (proxy error pages and the like).
/// Branch order matters: the exact 413 marker wins over a bare "413".
pub fn classify_unparseable(text: &str) -> SubmissionError {
    if text.contains(ENTITY_TOO_LARGE_MARKER) {
        SubmissionError::PayloadTooLarge { exact_marker: true }
    } else if text.contains(PAYLOAD_TOO_LARGE_CODE) {
        SubmissionError::PayloadTooLarge {
            exact_marker: false,
        }
    } else if UNAVAILABLE_CODES.iter().any(|code| text.contains(code)) {
        SubmissionError::ServerUnavailable
    } else {
        SubmissionError::MalformedResponse
    }
}

fn server_error(status: u16, parsed: Value) -> SubmissionError {
    let body: ServiceErrorBody = match parsed {
        Value::Object(_) => serde_json::from_value(parsed).unwrap_or_default(),
        _ => ServiceErrorBody::default(),
    };
    match body.error {
        Some(message) if !message.is_empty() => SubmissionError::ServerError(message),
        _ => SubmissionError::server_status(status),
    }
}

#[cfg(test)]
#[path = "tests/interpret_tests.rs"]
mod tests;

use serde::{Deserialize, de::DeserializeOwned};

use crate::HttpResponse;
use crate::errors::{Error, RequestError, Result};

/// Error envelope sent by the feed service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    exception: Option<String>,
}

/// Convert non-2xx responses into a structured error that includes the server detail.
///
/// If the status is successful (2xx), the original response is returned.
/// Otherwise the body is inspected for the service's `{detail, exception}`
/// envelope; failing that the raw body, and failing that the reason phrase,
/// becomes the error message.
pub(crate) fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let message = match serde_json::from_slice::<ServiceErrorBody>(&response.body) {
        Ok(ServiceErrorBody {
            detail: Some(detail),
            exception,
        }) => match exception {
            Some(exception) => format!("{exception}: {detail}"),
            None => detail,
        },
        _ if !response.body.is_empty() => String::from_utf8_lossy(&response.body).into_owned(),
        _ => status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string(),
    };

    tracing::warn!("Feed service responded {status}: {message}");
    Err(Error::from(RequestError::Server { status, message }))
}

/// Deserialize a JSON response body, naming the expected type on failure.
pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|err| {
        Error::from(RequestError::DecodeJson {
            message: format!("{} ({err})", std::any::type_name::<T>()),
        })
    })
}

/// Drop repeated entries, keeping the first occurrence of each.
pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn success_passes_through() {
        assert!(check_status(response(201, "{}")).is_ok());
    }

    #[test]
    fn service_envelope_becomes_message() {
        let err = check_status(response(
            400,
            r#"{"code":4,"detail":"activity is missing actor","exception":"InputException","status_code":400}"#,
        ))
        .unwrap_err();
        match err {
            Error::Request(RequestError::Server { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "InputException: activity is missing actor");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn raw_body_and_reason_fallbacks() {
        match check_status(response(502, "upstream down")).unwrap_err() {
            Error::Request(RequestError::Server { message, .. }) => {
                assert_eq!(message, "upstream down")
            }
            other => panic!("unexpected error {other:?}"),
        }
        match check_status(response(503, "")).unwrap_err() {
            Error::Request(RequestError::Server { message, .. }) => {
                assert_eq!(message, "Service Unavailable")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn decode_failure_names_type() {
        let err = decode::<Vec<u32>>(&response(200, "{\"not\":\"a list\"}")).unwrap_err();
        assert!(matches!(
            err,
            Error::Request(RequestError::DecodeJson { ref message }) if message.contains("Vec<u32>")
        ));
    }

    #[test]
    fn dedup_keeps_first() {
        let items = vec!["a".into(), "b".into(), "a".into(), "c".into(), "b".into()];
        assert_eq!(dedup_preserving_order(items), vec!["a", "b", "c"]);
    }
}

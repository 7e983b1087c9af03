//! HTTP response helpers shared by the API Lambdas.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

/// Envelope every API response uses: `success` plus either `data` or `error`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Serialize `data` into a JSON response with the given status.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    let body = serde_json::to_string(data)?;
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("response builder with static parts cannot fail"))
}

/// Enveloped error response with the given status and message.
pub fn error_response(
    status: u16,
    message: impl Into<String>,
) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ApiResponse::<()>::error(message))
}

/// Error response for a domain error, status taken from the error itself.
pub fn domain_error_response(err: &Error) -> Result<Response<Body>, lambda_http::Error> {
    error_response(err.status_code(), err.to_string())
}

/// Parse a request body as JSON.
///
/// The inner `Err` is a ready-made 400 response for the caller to return;
/// the outer `Err` only fires if building that response itself fails.
pub fn parse_json_body<T: DeserializeOwned>(
    body: &Body,
) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let response = ApiResponse::<()>::error("nope");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"nope"}"#);
    }

    #[test]
    fn test_success_envelope_omits_error_field() {
        let json = serde_json::to_string(&ApiResponse::success(7)).unwrap();
        assert_eq!(json, r#"{"success":true,"data":7}"#);
    }

    #[test]
    fn test_domain_error_status_mapping() {
        let response = domain_error_response(&Error::NotFound("event x".into())).unwrap();
        assert_eq!(response.status(), 404);

        let response = domain_error_response(&Error::Auth("no session".into())).unwrap();
        assert_eq!(response.status(), 401);
    }

    #[test]
    fn test_parse_json_body_rejects_garbage() {
        let result: Result<i32, _> = parse_json_body(&Body::from("not json")).unwrap();
        let response = result.unwrap_err();
        assert_eq!(response.status(), 400);
    }
}

//! Response classification.
//!
//! Maps a raw `(status, body)` pair to an [`Outcome`]. The mapping is pure:
//! the same pair always yields the same outcome.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// The classified result of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a JSON body.
    Decoded(Value),
    /// 2xx with no body, or a body that is not JSON.
    Accepted,
    /// Any failure, from the service or from the client side.
    Failure(ApiError),
}

impl Outcome {
    /// Collapse into a `Result`; `Accepted` becomes `Ok(None)`.
    pub fn into_result(self) -> Result<Option<Value>, ApiError> {
        match self {
            Outcome::Decoded(value) => Ok(Some(value)),
            Outcome::Accepted => Ok(None),
            Outcome::Failure(err) => Err(err),
        }
    }

    /// Decode the payload into `T`. `Accepted` is an error here because the
    /// caller expected a body.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self.into_result()? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
            None => Err(ApiError::DeserializationError(
                "expected a JSON body, got none".to_string(),
            )),
        }
    }

    /// Succeed regardless of body.
    pub fn accepted(self) -> Result<(), ApiError> {
        self.into_result().map(|_| ())
    }
}

impl From<ApiError> for Outcome {
    fn from(err: ApiError) -> Self {
        Outcome::Failure(err)
    }
}

pub fn classify(status: u16, body: &str) -> Outcome {
    match status {
        204 => Outcome::Accepted,
        200..=299 => match serde_json::from_str(body) {
            Ok(value) => Outcome::Decoded(value),
            Err(_) => Outcome::Accepted,
        },
        401 => Outcome::Failure(ApiError::Unauthorized),
        404 => Outcome::Failure(ApiError::NotFound),
        // A 422 whose body is not JSON keeps the raw text as a string value.
        422 => {
            let errors = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
            Outcome::Failure(ApiError::UnprocessableEntity(errors))
        }
        500 => Outcome::Failure(ApiError::InternalServerError),
        _ => Outcome::Failure(ApiError::HttpError {
            status,
            body: body.to_string(),
        }),
    }
}

pub fn classify_response(response: &HttpResponse) -> Outcome {
    classify(response.status, &response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_content_is_accepted() {
        assert_eq!(classify(204, ""), Outcome::Accepted);
    }

    #[test]
    fn json_body_is_decoded() {
        assert_eq!(classify(200, r#"{"a":1}"#), Outcome::Decoded(json!({"a": 1})));
        assert_eq!(classify(201, r#"[1,2]"#), Outcome::Decoded(json!([1, 2])));
    }

    #[test]
    fn non_json_success_body_is_accepted() {
        assert_eq!(classify(200, "get dog food finished"), Outcome::Accepted);
        assert_eq!(classify(200, ""), Outcome::Accepted);
    }

    #[test]
    fn documented_failures_map_to_variants() {
        assert_eq!(classify(401, ""), Outcome::Failure(ApiError::Unauthorized));
        assert_eq!(classify(404, ""), Outcome::Failure(ApiError::NotFound));
        assert_eq!(classify(500, "boom"), Outcome::Failure(ApiError::InternalServerError));
    }

    #[test]
    fn unprocessable_entity_carries_parsed_errors() {
        assert_eq!(
            classify(422, r#"{"name":["is required"]}"#),
            Outcome::Failure(ApiError::UnprocessableEntity(json!({"name": ["is required"]})))
        );
    }

    #[test]
    fn unprocessable_entity_keeps_non_json_body_as_string() {
        assert_eq!(
            classify(422, "bad"),
            Outcome::Failure(ApiError::UnprocessableEntity(json!("bad")))
        );
    }

    #[test]
    fn undocumented_status_is_http_error() {
        assert_eq!(
            classify(503, "maintenance"),
            Outcome::Failure(ApiError::HttpError {
                status: 503,
                body: "maintenance".to_string()
            })
        );
        assert!(matches!(
            classify(302, ""),
            Outcome::Failure(ApiError::HttpError { status: 302, .. })
        ));
    }

    #[test]
    fn classification_is_idempotent() {
        for (status, body) in [(200, r#"{"a":1}"#), (204, ""), (422, r#"{"x":[]}"#), (418, "?")] {
            assert_eq!(classify(status, body), classify(status, body));
        }
    }

    #[test]
    fn decode_rejects_accepted() {
        let err = Outcome::Accepted.decode::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn into_result_maps_variants() {
        assert_eq!(Outcome::Accepted.into_result(), Ok(None));
        assert_eq!(Outcome::Decoded(json!(1)).into_result(), Ok(Some(json!(1))));
        assert_eq!(
            Outcome::Failure(ApiError::NotFound).into_result(),
            Err(ApiError::NotFound)
        );
    }
}

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        FromRequest, Request,
        rejection::{BytesRejection, FailedToBufferBody},
    },
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde_json::Deserializer;

use crate::errors::AppError;

pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024; // 64 KiB upper bound for request bodies

/// JSON body extractor that reports the failing path and rejects trailing data.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        validate_content_type(req.headers())?;

        let body_bytes = Bytes::from_request(req, state)
            .await
            .map_err(body_rejection)?;
        if body_bytes.len() > MAX_BODY_SIZE_BYTES {
            return Err(AppError::PayloadTooLarge);
        }

        let mut deserializer = Deserializer::from_slice(body_bytes.as_ref());
        let result = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            let error = err.into_inner();
            if path.is_empty() || path == "." {
                AppError::InvalidJson(error.to_string())
            } else {
                AppError::InvalidJson(format!("at {path}: {error}"))
            }
        })?;

        deserializer
            .end()
            .map_err(|err| AppError::InvalidJson(format!("unexpected trailing data: {err}")))?;

        Ok(ValidatedJson(result))
    }
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            AppError::PayloadTooLarge
        }
        other => AppError::BadRequest(format!(
            "could not read request body: {}",
            other.body_text()
        )),
    }
}

fn validate_content_type(headers: &HeaderMap) -> Result<(), AppError> {
    if let Some(value) = headers.get(CONTENT_TYPE)
        && let Ok(value) = value.to_str()
        && (value.starts_with("application/json") || value.ends_with("+json"))
    {
        return Ok(());
    }

    Err(AppError::UnsupportedMediaType)
}

#[cfg(test)]
mod tests {
    use std::io;

    use axum::{
        Router,
        body::Body,
        extract::DefaultBodyLimit,
        http::{self, StatusCode},
        response::IntoResponse,
        routing::post,
    };
    use futures::stream;
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        field: String,
    }

    fn json_request(body: impl Into<Body>) -> Request {
        http::Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn extract(req: Request) -> Result<Payload, AppError> {
        ValidatedJson::<Payload>::from_request(req, &())
            .await
            .map(|ValidatedJson(payload)| payload)
    }

    #[tokio::test]
    async fn test_accepts_json_payload() {
        let payload = extract(json_request(r#"{"field":"email"}"#)).await.unwrap();
        assert_eq!(payload.field, "email");
    }

    #[tokio::test]
    async fn test_rejects_wrong_content_type() {
        let req = http::Request::builder()
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"field":"email"}"#))
            .unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[tokio::test]
    async fn test_error_names_failing_path() {
        let err = extract(json_request(r#"{"field":42}"#)).await.unwrap_err();
        assert!(matches!(&err, AppError::InvalidJson(msg) if msg.contains("field")));
    }

    #[tokio::test]
    async fn test_rejects_trailing_data() {
        let err = extract(json_request(r#"{"field":"a"} {}"#)).await.unwrap_err();
        assert!(matches!(&err, AppError::InvalidJson(msg) if msg.contains("trailing")));
    }

    #[tokio::test]
    async fn test_rejects_oversized_body() {
        let big = format!(r#"{{"field":"{}"}}"#, "a".repeat(MAX_BODY_SIZE_BYTES));
        let err = extract(json_request(big)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_limit_layer_rejection_is_payload_too_large() {
        let router = Router::new()
            .route(
                "/",
                post(|ValidatedJson(payload): ValidatedJson<Payload>| async move { payload.field }),
            )
            .layer(DefaultBodyLimit::max(16));
        let big = format!(r#"{{"field":"{}"}}"#, "a".repeat(64));
        let req = http::Request::post("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(big))
            .unwrap();
        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_broken_body_stream_is_bad_request() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(br#"{"field":"#)),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let err = extract(json_request(Body::from_stream(stream::iter(chunks))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use tracing::warn;

use crate::error::ApiError;

/// JSON body extractor whose rejection renders through `ApiError`, so a
/// malformed body comes back as `400 {"error": ...}` instead of axum's
/// plain-text 422 with the serde message.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "json body rejected");
                Err(ApiError::Validation("Invalid request body".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
    }

    fn json_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_deserializes() {
        let ApiJson(sample) = ApiJson::<Sample>::from_request(json_request(r#"{"name":"bauble"}"#), &())
            .await
            .unwrap();
        assert_eq!(sample.name, "bauble");
    }

    #[tokio::test]
    async fn malformed_body_maps_to_validation() {
        let err = ApiJson::<Sample>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Invalid request body"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn serde_detail_is_not_leaked() {
        let err = ApiJson::<Sample>::from_request(json_request(r#"{"name":42}"#), &())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(!msg.contains("deserialize"));
        assert!(!msg.contains("line"));
    }
}

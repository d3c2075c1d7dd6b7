//! Extractors that report malformed input as `400 bad_request` in the shared
//! error body instead of axum's plain-text rejections.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::Uri;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::error::ApiError;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| ApiJson(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = match parts.uri.query().and_then(fold_repeated_keys) {
            Some(folded) => {
                let uri = format!("/?{folded}")
                    .parse::<Uri>()
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?;
                axum::extract::Query::<T>::try_from_uri(&uri)
            }
            None => axum::extract::Query::<T>::from_request_parts(parts, state).await,
        };

        query
            .map(|axum::extract::Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

/// `?skills=Jest&skills=Cypress` becomes `?skills=Jest,Cypress` so list
/// filters accept both spellings. Returns `None` when no key repeats.
fn fold_repeated_keys(query: &str) -> Option<String> {
    let mut pairs: Vec<(String, Vec<String>)> = Vec::new();
    let mut repeated = false;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => {
                values.push(value.into_owned());
                repeated = true;
            }
            None => pairs.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    if !repeated {
        return None;
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &pairs {
        serializer.append_pair(key, &values.join(","));
    }
    Some(serializer.finish())
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Path(value)| ApiPath(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_are_joined_in_order() {
        assert_eq!(
            fold_repeated_keys("skills=Jest&grade=Senior&skills=Cypress").as_deref(),
            Some("skills=Jest%2CCypress&grade=Senior")
        );
    }

    #[test]
    fn queries_without_repeats_are_left_alone() {
        assert_eq!(fold_repeated_keys("skills=Jest,Cypress&grade=Senior"), None);
        assert_eq!(fold_repeated_keys(""), None);
    }
}

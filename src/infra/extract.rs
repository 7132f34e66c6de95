//! Custom axum extractors.

use super::error::ClientError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
};
use http::request::Parts;
use serde::de::DeserializeOwned;

/// A custom Query extractor since axum's does not let us customize the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T> AsRef<T> for Query<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ClientError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let res = axum::extract::Query::from_request_parts(parts, state).await?;
        Ok(Query(res.0))
    }
}

/// A form that can be read from a `multipart/form-data` body.
#[async_trait]
pub trait MultipartForm: Sized + Send {
    /// Reads the form, consuming the body.
    async fn read(multipart: Multipart) -> Result<Self, ClientError>;
}

/// Extracts a [`MultipartForm`], rejecting with our error body.
#[derive(Debug, Clone, Default)]
pub struct Form<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Form<T>
where
    T: MultipartForm,
    S: Send + Sync,
{
    type Rejection = ClientError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Ok(Form(T::read(multipart).await?))
    }
}

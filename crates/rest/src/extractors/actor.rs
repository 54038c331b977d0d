//! Acting user extractor.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, request::Parts},
};

/// Header carrying the id of the acting user.
pub static X_ACTOR_ID: HeaderName = HeaderName::from_static("x-actor-id");

/// The acting user named by `X-Actor-Id`, if any.
///
/// Missing or blank headers yield `None`; lifecycle operations reject that
/// with `ActorRequired`, so the extractor itself never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub Option<String>);

impl Actor {
    /// The actor id as a string slice.
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(&X_ACTOR_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);
        Ok(Actor(actor))
    }
}

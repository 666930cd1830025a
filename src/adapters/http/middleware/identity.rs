//! Request identity extractor.
//!
//! The session layer is an external collaborator: authenticated requests
//! arrive with an opaque `x-user-id` header. Requests without one are
//! anonymous and keyed by source IP for usage accounting.

use axum::extract::ConnectInfo;
use std::net::SocketAddr;

use crate::domain::chat::Identity;
use crate::domain::foundation::UserId;

/// Header carrying the opaque user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor resolving the request's usage identity.
///
/// Never rejects: a missing or empty header falls back to the source IP,
/// and a request without `ConnectInfo` (some test setups) falls back to
/// a fixed unknown marker.
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Identity);

impl RequestIdentity {
    /// The user id conversations created by this request belong to.
    ///
    /// Anonymous identities own their conversations under an `anon:`
    /// prefixed id so they never collide with real user ids.
    pub fn owner(&self) -> UserId {
        match &self.0 {
            Identity::User(id) => id.clone(),
            // The "anon:" prefix guarantees a non-empty id.
            Identity::Anonymous(ip) => {
                UserId::new(format!("anon:{}", ip)).unwrap_or_else(|_| unreachable!())
            }
        }
    }
}

impl<S> axum::extract::FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let header_user = parts
                .headers
                .get(USER_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| UserId::new(v).ok());

            if let Some(user_id) = header_user {
                return Ok(RequestIdentity(Identity::User(user_id)));
            }

            let ip = parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            Ok(RequestIdentity(Identity::Anonymous(ip)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_owner_is_prefixed() {
        let identity = RequestIdentity(Identity::Anonymous("203.0.113.7".to_string()));
        assert_eq!(identity.owner().as_str(), "anon:203.0.113.7");
    }

    #[test]
    fn user_owner_passes_through() {
        let user = UserId::new("u-42").unwrap();
        let identity = RequestIdentity(Identity::User(user.clone()));
        assert_eq!(identity.owner(), user);
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::config::{AuthSettings, SessionToken};
use crate::host::HostUser;

use super::ServerState;

/// The host session resolved for one request. `user` is `None` for anonymous calls.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<HostUser>,
}

/// Maps bearer tokens to host users.
#[derive(Clone, Default)]
pub struct SessionAuthenticator {
    tokens: Arc<[SessionToken]>,
}

impl SessionAuthenticator {
    pub fn new(tokens: Vec<SessionToken>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.tokens.clone())
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Option<HostUser> {
        let token = extract_token(headers.get(AUTHORIZATION))?;
        self.tokens
            .iter()
            .find(|candidate| candidate.token.as_bytes().ct_eq(token.as_bytes()).into())
            .map(|candidate| candidate.user.clone())
    }
}

/// Resolve the session without enforcing it; handlers decide what anonymous callers may do.
pub async fn resolve_session(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = Session {
        user: state.auth.authenticate(request.headers()),
    };
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(session);
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    (!bearer.is_empty()).then_some(bearer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> SessionAuthenticator {
        SessionAuthenticator::new(vec![SessionToken {
            token: "admin-token".into(),
            user: HostUser::new("root", ["admin"]),
        }])
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn resolves_known_bearer_tokens() {
        let user = authenticator()
            .authenticate(&bearer("Bearer admin-token"))
            .expect("user");
        assert_eq!(user.id, "root");
    }

    #[test]
    fn rejects_unknown_or_malformed_tokens() {
        let auth = authenticator();
        assert!(auth.authenticate(&bearer("Bearer admin-tokem")).is_none());
        assert!(auth.authenticate(&bearer("admin-token")).is_none());
        assert!(auth.authenticate(&bearer("Bearer ")).is_none());
        assert!(auth.authenticate(&HeaderMap::new()).is_none());
    }
}

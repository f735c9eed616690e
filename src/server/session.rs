use crate::storage::SessionId;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;

pub const COOKIE_NAME: &str = "pdf_session";

/// The caller's session, taken from the `pdf_session` cookie.
///
/// A missing or malformed cookie yields a brand-new session. Handlers send the
/// cookie back with [`Session::attach`] so the client keeps it.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub id: SessionId,
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id: SessionId = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == COOKIE_NAME)
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or_default();
        Session { id }
    }

    pub fn cookie(&self) -> String {
        format!("{}={}; Path=/; HttpOnly; SameSite=Lax", COOKIE_NAME, self.id)
    }

    pub fn attach(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if let Ok(value) = HeaderValue::from_str(&self.cookie()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Session::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn reads_session_among_other_cookies() {
        let id = SessionId::new();
        let cookie = format!("theme=dark; pdf_session={}; x=1", id);
        let session = Session::from_headers(&headers(&cookie));
        assert_eq!(session.id, id);
    }

    #[test]
    fn malformed_or_missing_cookie_gets_fresh_session() {
        let a = Session::from_headers(&headers("pdf_session=../../etc"));
        let b = Session::from_headers(&HeaderMap::new());
        assert_ne!(a.id, b.id);
        assert_ne!(a.id.to_string(), "../../etc");
    }

    #[test]
    fn attach_sets_cookie() {
        let session = Session { id: SessionId::new() };
        let response = session.attach("ok");
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert_eq!(cookie, format!("pdf_session={}; Path=/; HttpOnly; SameSite=Lax", session.id));
    }
}

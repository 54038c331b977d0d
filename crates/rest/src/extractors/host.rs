//! Request host extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use http::{HeaderMap, HeaderName, Uri, header::HOST};

use crate::error::RestError;
use crate::state::AppState;

/// Host forwarded by a reverse proxy. Only honored when
/// `trust_forwarded_host` is enabled.
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// The host a request was addressed to, as sent by the client.
///
/// Normalization happens in the resolver, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHost(pub String);

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Picks the request host: `X-Forwarded-Host` (first entry, when trusted),
/// then `Host`, then the URI authority.
pub(crate) fn extract_host(headers: &HeaderMap, uri: &Uri, trust_forwarded: bool) -> Option<String> {
    if trust_forwarded {
        let forwarded = header_str(headers, &X_FORWARDED_HOST)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(host) = forwarded {
            return Some(host.to_string());
        }
    }

    header_str(headers, &HOST)
        .map(String::from)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

impl FromRequestParts<AppState> for RequestHost {
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract_host(
            &parts.headers,
            &parts.uri,
            state.config().trust_forwarded_host,
        )
        .map(RequestHost)
        .ok_or_else(|| RestError::TenantNotResolved {
            host: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert((*name).clone(), HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_host_header() {
        let map = headers(&[(&HOST, "acme.example.com:8080")]);
        let uri: Uri = "/clients".parse().unwrap();
        assert_eq!(
            extract_host(&map, &uri, false).as_deref(),
            Some("acme.example.com:8080")
        );
    }

    #[test]
    fn test_forwarded_host_only_when_trusted() {
        let map = headers(&[
            (&HOST, "internal:8080"),
            (&X_FORWARDED_HOST, "acme.example.com, proxy.local"),
        ]);
        let uri: Uri = "/clients".parse().unwrap();

        assert_eq!(extract_host(&map, &uri, false).as_deref(), Some("internal:8080"));
        assert_eq!(
            extract_host(&map, &uri, true).as_deref(),
            Some("acme.example.com")
        );
    }

    #[test]
    fn test_falls_back_to_uri_authority() {
        let uri: Uri = "http://globex.example.com/clients".parse().unwrap();
        assert_eq!(
            extract_host(&HeaderMap::new(), &uri, false).as_deref(),
            Some("globex.example.com")
        );

        let uri: Uri = "/clients".parse().unwrap();
        assert_eq!(extract_host(&HeaderMap::new(), &uri, true), None);
    }
}

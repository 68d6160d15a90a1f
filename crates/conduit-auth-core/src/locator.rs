//! Credential lookup across transport locations
//!
//! Candidates come out in a fixed order: cookie, then `Authorization`
//! header, then query string. Cookies go first because they are set by the
//! server and are the least likely to hold a stale token.

use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

/// Cookie carrying the credential
pub const AUTH_COOKIE: &str = "auth_token";

/// Query parameter carrying the credential
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Where a candidate credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cookie,
    Header,
    Query,
    /// Supplied by a duplex-channel client at open time
    Handshake,
}

/// A credential waiting to be verified
#[derive(Clone, PartialEq, Eq)]
pub struct Candidate {
    pub token: String,
    pub source: CredentialSource,
}

impl Candidate {
    pub fn new(token: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            token: token.into(),
            source,
        }
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("source", &self.source)
            .field("token_len", &self.token.len())
            .finish()
    }
}

/// Finds candidate credentials in a request
#[derive(Debug, Clone)]
pub struct CredentialLocator {
    cookie_name: String,
    query_param: String,
}

impl Default for CredentialLocator {
    fn default() -> Self {
        Self {
            cookie_name: AUTH_COOKIE.to_string(),
            query_param: TOKEN_QUERY_PARAM.to_string(),
        }
    }
}

impl CredentialLocator {
    /// Create a locator using the default cookie and query names
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect candidates from request headers and raw query string,
    /// in `[cookie, header, query]` order, skipping absent ones.
    pub fn locate(&self, headers: &HeaderMap, query: Option<&str>) -> Vec<Candidate> {
        [
            self.cookie_token(headers)
                .map(|t| Candidate::new(t, CredentialSource::Cookie)),
            bearer_token(headers).map(|t| Candidate::new(t, CredentialSource::Header)),
            self.query_token(query)
                .map(|t| Candidate::new(t, CredentialSource::Query)),
        ]
        .into_iter()
        .flatten()
        .filter(|c| !c.token.is_empty())
        .collect()
    }

    /// Collect candidates supplied by a duplex client at open time.
    ///
    /// Accepts a single token or a list; absent and empty entries are dropped
    /// and the remaining order is kept.
    pub fn locate_handshake<I, T>(tokens: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = Option<T>>,
        T: Into<String>,
    {
        tokens
            .into_iter()
            .flatten()
            .map(Into::<String>::into)
            .filter(|t| !t.is_empty())
            .map(|t| Candidate::new(t, CredentialSource::Handshake))
            .collect()
    }

    fn cookie_token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|s| s.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| cookie_value(value))
    }

    fn query_token(&self, query: Option<&str>) -> Option<String> {
        url::form_urlencoded::parse(query?.as_bytes())
            .find(|(name, _)| *name == self.query_param.as_str())
            .map(|(_, value)| value.into_owned())
    }
}

/// Cookie value as cookie parsers read it: surrounding double quotes
/// dropped, `%XX` escapes decoded. A malformed escape leaves the value as sent.
fn cookie_value(raw: &str) -> String {
    let value = raw.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    if !value.contains('%') {
        return value.to_string();
    }
    percent_decode(value).unwrap_or_else(|| value.to_string())
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Token after the scheme in `Authorization: <scheme> <token>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.split_whitespace().nth(1).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(http::header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn tokens(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.token.as_str()).collect()
    }

    #[test]
    fn test_precedence_cookie_header_query() {
        let h = headers(&[
            (AUTHORIZATION, "Bearer B"),
            (COOKIE, "theme=dark; auth_token=A"),
        ]);
        let found = CredentialLocator::new().locate(&h, Some("token=C"));

        assert_eq!(tokens(&found), vec!["A", "B", "C"]);
        assert_eq!(
            found.iter().map(|c| c.source).collect::<Vec<_>>(),
            vec![
                CredentialSource::Cookie,
                CredentialSource::Header,
                CredentialSource::Query
            ]
        );
    }

    #[test]
    fn test_absent_sources_skipped() {
        let h = headers(&[(AUTHORIZATION, "Bearer only-header")]);
        let found = CredentialLocator::new().locate(&h, Some("other=1"));
        assert_eq!(tokens(&found), vec!["only-header"]);
    }

    #[test]
    fn test_nothing_presented_is_empty() {
        let found = CredentialLocator::new().locate(&HeaderMap::new(), None);
        assert!(found.is_empty());
    }

    #[test]
    fn test_empty_values_treated_as_absent() {
        let h = headers(&[(COOKIE, "auth_token="), (AUTHORIZATION, "Bearer")]);
        let found = CredentialLocator::new().locate(&h, Some("token="));
        assert!(found.is_empty());
    }

    #[test]
    fn test_query_token_percent_decoded() {
        let found = CredentialLocator::new().locate(&HeaderMap::new(), Some("a=1&token=x%2By.z"));
        assert_eq!(tokens(&found), vec!["x+y.z"]);
    }

    #[test]
    fn test_cookie_split_across_headers() {
        let h = headers(&[(COOKIE, "a=1"), (COOKIE, "auth_token=second-header")]);
        let found = CredentialLocator::new().locate(&h, None);
        assert_eq!(tokens(&found), vec!["second-header"]);
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let h = headers(&[(COOKIE, "old_auth_token=x; auth_token_v2=y")]);
        assert!(CredentialLocator::new().locate(&h, None).is_empty());
    }

    #[test]
    fn test_cookie_quotes_stripped() {
        let h = headers(&[(COOKIE, "theme=dark; auth_token=\"a.b.c\"")]);
        let found = CredentialLocator::new().locate(&h, None);
        assert_eq!(tokens(&found), vec!["a.b.c"]);

        // A lone quote is not a quoted value
        let h = headers(&[(COOKIE, "auth_token=\"abc")]);
        let found = CredentialLocator::new().locate(&h, None);
        assert_eq!(tokens(&found), vec!["\"abc"]);
    }

    #[test]
    fn test_cookie_percent_decoded() {
        let h = headers(&[(COOKIE, "auth_token=\"x%2By%3Dz+w\"")]);
        let found = CredentialLocator::new().locate(&h, None);
        assert_eq!(tokens(&found), vec!["x+y=z+w"]);

        let h = headers(&[(COOKIE, "auth_token=caf%C3%A9")]);
        let found = CredentialLocator::new().locate(&h, None);
        assert_eq!(tokens(&found), vec!["café"]);
    }

    #[test]
    fn test_malformed_cookie_escape_kept_raw() {
        for raw in ["50%", "a%zz", "a%+1b", "%FF"] {
            let cookie = format!("auth_token={raw}");
            let h = headers(&[(COOKIE, cookie.as_str())]);
            let found = CredentialLocator::new().locate(&h, None);
            assert_eq!(tokens(&found), vec![raw]);
        }
    }

    #[test]
    fn test_handshake_single_and_list() {
        let single = CredentialLocator::locate_handshake([Some("tok")]);
        assert_eq!(tokens(&single), vec!["tok"]);
        assert_eq!(single[0].source, CredentialSource::Handshake);

        let list = CredentialLocator::locate_handshake(vec![
            None,
            Some(String::new()),
            Some("first".to_string()),
            Some("second".to_string()),
        ]);
        assert_eq!(tokens(&list), vec!["first", "second"]);

        let none = CredentialLocator::locate_handshake(Vec::<Option<String>>::new());
        assert!(none.is_empty());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let c = Candidate::new("very-secret-token", CredentialSource::Cookie);
        assert!(!format!("{c:?}").contains("very-secret"));
    }
}

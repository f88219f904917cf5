//! Shared HTTP session: one reqwest client, one cookie jar, one cookie context.
//!
//! The cookie context holds the literal values the request templates
//! substitute (defaults plus CLI overrides). The same values are seeded into
//! the jar for the cookie origin, and the jar also collects whatever the
//! replayed endpoints set, so later calls and the correlation-id lookup see
//! server-side updates. A jar value only wins over the context when it differs
//! from what seeding left there, so values the cookie syntax cannot carry
//! (`;`, surrounding spaces) keep their literal form.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::audit::json_object_text;
use crate::config::{COMMON_HEADERS, DEFAULT_COOKIES, ReplayConfig};
use crate::replay::{ReplayError, ReplayResult};

/// Cookie name → value, as used to fill request templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieContext {
    values: BTreeMap<String, String>,
}

impl CookieContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded with the captured browser cookies.
    pub fn with_defaults() -> Self {
        let mut context = Self::new();
        for (name, value) in DEFAULT_COOKIES {
            context.set(*name, *value);
        }
        context
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value for template substitution; missing cookies become empty.
    pub fn value_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Body attached to an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Raw(String),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// The body as written to the audit trail; forms render as a JSON object.
    pub fn preview(&self) -> String {
        match self {
            RequestBody::Raw(body) => body.clone(),
            RequestBody::Form(fields) => json_object_text(
                fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            ),
        }
    }
}

/// One outbound call, built fresh by a request function.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub tag: &'static str,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// What came back, decoded once for logging and JSON extraction.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: u16,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

/// Session shared by every call of a run.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    jar: Arc<Jar>,
    cookies: CookieContext,
    /// What the jar reported for each name right after it was seeded.
    seeded: BTreeMap<String, Option<String>>,
    config: ReplayConfig,
}

impl Session {
    /// Builds the client with the configured user agent and seeds the jar
    /// with `cookies` for the cookie origin and its subdomains.
    pub fn new(config: ReplayConfig, cookies: CookieContext) -> ReplayResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            http::header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| ReplayError::InvalidHeader("user-agent".into()))?,
        );

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(default_headers)
            .build()?;

        let mut session = Self {
            client,
            jar,
            cookies: CookieContext::new(),
            seeded: BTreeMap::new(),
            config,
        };
        for (name, value) in cookies.iter() {
            session.set_cookie(name, value);
        }
        Ok(session)
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn cookies(&self) -> &CookieContext {
        &self.cookies
    }

    /// Records the value in the context and in the jar for the cookie origin.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.set(name, value);
        let origin = &self.config.cookie_origin;
        let domain = origin.host_str().unwrap_or_default();
        self.jar.add_cookie_str(
            &format!("{name}={value}; Domain={domain}; Path=/"),
            origin,
        );
        let stored = jar_cookie(self.jar.as_ref(), origin, name);
        self.seeded.insert(name.to_string(), stored);
    }

    /// Current value of `name`. A value the endpoints set in the jar for any
    /// contacted origin shadows the context; otherwise the literal context
    /// value is returned.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let seeded = self.seeded.get(name).and_then(Option::as_deref);
        self.config
            .contacted_origins()
            .into_iter()
            .filter_map(|url| jar_cookie(self.jar.as_ref(), url, name))
            .find(|value| Some(value.as_str()) != seeded)
            .or_else(|| self.cookies.get(name).map(str::to_string))
    }

    /// Dispatches `request` with the configured timeout and decodes the reply.
    pub async fn send(&self, request: &RequestDescriptor) -> ReplayResult<ResponseRecord> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(self.config.timeout);

        builder = match &request.body {
            RequestBody::Raw(body) => builder.body(body.clone()),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        log::debug!("{} <- {} bytes from {}", request.tag, bytes.len(), url);

        Ok(ResponseRecord {
            status,
            url,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn jar_cookie(jar: &Jar, url: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(url)?;
    let header = header.to_str().ok()?;
    header.split("; ").find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Common headers with a call-specific `Content-Type` merged in.
pub fn call_headers(content_type: &str) -> ReplayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in COMMON_HEADERS {
        insert_header(&mut headers, name, value)?;
    }
    insert_header(&mut headers, "Content-Type", content_type)?;
    Ok(headers)
}

pub fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> ReplayResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ReplayError::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| ReplayError::InvalidHeader(name.to_string()))?;
    headers.insert(header_name, header_value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_tracking_cookies() {
        let context = CookieContext::with_defaults();
        assert_eq!(context.get("__uzmbj0"), Some("1763078854"));
        assert_eq!(context.value_or_empty("_ga"), "");
    }

    #[test]
    fn form_preview_keeps_field_order() {
        let body = RequestBody::Form(vec![
            ("cid".into(), "cczh".into()),
            ("et".into(), "82".into()),
            ("a".into(), "1".into()),
        ]);
        assert_eq!(body.preview(), r#"{"cid": "cczh", "et": "82", "a": "1"}"#);
    }

    #[test]
    fn call_headers_merge_content_type() {
        let headers = call_headers("text/plain").unwrap();
        assert_eq!(headers["content-type"], "text/plain");
        assert_eq!(headers["origin"], "https://verymobile.it");
        assert_eq!(headers.len(), COMMON_HEADERS.len() + 1);
    }

    #[test]
    fn session_cookie_reads_seeded_values() {
        let mut session =
            Session::new(ReplayConfig::default(), CookieContext::with_defaults()).unwrap();
        session.set_cookie("_ga", "GA1.2.333.444");
        assert_eq!(session.cookie("_ga").as_deref(), Some("GA1.2.333.444"));
        assert_eq!(session.cookies().get("_ga"), Some("GA1.2.333.444"));
        assert_eq!(session.cookie("missing"), None);
    }

    #[test]
    fn literal_value_survives_cookie_syntax() {
        let mut session =
            Session::new(ReplayConfig::default(), CookieContext::with_defaults()).unwrap();
        session.set_cookie("_ga", " GA1;x ");
        assert_eq!(session.cookie("_ga").as_deref(), Some(" GA1;x "));
    }

    #[test]
    fn server_set_value_shadows_context() {
        let mut session =
            Session::new(ReplayConfig::default(), CookieContext::with_defaults()).unwrap();
        session.set_cookie("_ga", "GA1;x");
        let origin = session.config().cookie_origin.clone();
        session
            .jar
            .add_cookie_str("_ga=GA1.2.555.666; Domain=verymobile.it; Path=/", &origin);
        assert_eq!(session.cookie("_ga").as_deref(), Some("GA1.2.555.666"));
        assert_eq!(session.cookies().get("_ga"), Some("GA1;x"));
    }

    #[test]
    fn unsendable_user_agent_is_rejected() {
        let config = ReplayConfig::builder()
            .with_user_agent("bad\nagent")
            .build();
        let err = Session::new(config, CookieContext::new()).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidHeader(name) if name == "user-agent"));
    }

    #[test]
    fn jar_cookies_apply_to_subdomains() {
        let session = Session::new(ReplayConfig::default(), CookieContext::with_defaults()).unwrap();
        let sub = Url::parse("https://www.verymobile.it/offerte").unwrap();
        assert_eq!(
            jar_cookie(session.jar.as_ref(), &sub, "couponGamification").as_deref(),
            Some("B-YV6YG1")
        );
    }
}

//! Tracking beacon call.
//!
//! The form mirrors the beacon the page script posts: fixed markers plus
//! values lifted from the cookie context.

use http::Method;

use super::dispatch;
use crate::audit::AuditLog;
use crate::config::ReplayConfig;
use crate::replay::ReplayResult;
use crate::session::{
    CookieContext, RequestBody, RequestDescriptor, ResponseRecord, Session, call_headers,
    insert_header,
};

pub const TRACKING_TAG: &str = "c99a";

/// Cap applied to the serialized `JSinfo` field.
const JSINFO_LIMIT: usize = 1000;

/// Form field → cookie it is filled from.
const COOKIE_FIELDS: &[(&str, &str)] = &[
    ("uzl", "__uzmlj0"),
    ("__uzmaj", "__uzma"),
    ("__uzmbj", "__uzmbj0"),
    ("__uzmlj", "__uzmlj0"),
    ("__uzmcj", "__uzmcj0"),
    ("__uzmdj", "__uzmdj0"),
    ("__uzmfj", "__uzmfj0"),
    ("uzmxj", "uzmxj"),
    ("uzmx", "uzmx"),
];

/// Builds the ordered beacon form and applies `overrides`. An override
/// replaces a field in place, or is appended when the template lacks it.
pub fn tracking_form(
    config: &ReplayConfig,
    cookies: &CookieContext,
    overrides: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut form = vec![("cid".to_string(), "cczh".to_string())];
    form.extend(
        COOKIE_FIELDS
            .iter()
            .map(|(field, cookie)| (field.to_string(), cookies.value_or_empty(cookie).to_string())),
    );
    form.push(("dync".into(), "uzmx".into()));
    form.push(("url".into(), config.page_url.clone()));
    form.push(("JSinfo".into(), js_info(&config.user_agent)));
    form.push(("__uzmf".into(), cookies.value_or_empty("__uzmf").to_string()));

    for (name, value) in overrides {
        match form.iter_mut().find(|(field, _)| field.as_str() == *name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => form.push((name.to_string(), value.to_string())),
        }
    }
    form
}

fn js_info(user_agent: &str) -> String {
    let encoded = serde_json::Value::String(user_agent.to_string()).to_string();
    format!("{{\"j0\": {encoded}}}")
        .chars()
        .take(JSINFO_LIMIT)
        .collect()
}

pub fn tracking_request(
    config: &ReplayConfig,
    cookies: &CookieContext,
    overrides: &[(&str, &str)],
) -> ReplayResult<RequestDescriptor> {
    let mut headers = call_headers("application/x-www-form-urlencoded")?;
    insert_header(&mut headers, "Referer", &config.page_url)?;

    Ok(RequestDescriptor {
        tag: TRACKING_TAG,
        method: Method::POST,
        url: config.tracking_url.clone(),
        headers,
        body: RequestBody::Form(tracking_form(config, cookies, overrides)),
    })
}

pub async fn call_tracking(
    session: &Session,
    log: &AuditLog,
    overrides: &[(&str, &str)],
) -> ReplayResult<ResponseRecord> {
    let request = tracking_request(session.config(), session.cookies(), overrides)?;
    dispatch(session, log, &request)
        .await
        .inspect_err(|err| log.error(&format!("[{TRACKING_TAG}] request error: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn form_substitutes_cookie_values_in_template_order() {
        let form = tracking_form(&ReplayConfig::default(), &CookieContext::with_defaults(), &[]);
        let names: Vec<&str> = form.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cid", "uzl", "__uzmaj", "__uzmbj", "__uzmlj", "__uzmcj", "__uzmdj", "__uzmfj",
                "uzmxj", "uzmx", "dync", "url", "JSinfo", "__uzmf"
            ]
        );
        assert_eq!(field(&form, "cid"), Some("cczh"));
        assert_eq!(field(&form, "__uzmaj"), Some("1e983c5a-1858-4f35-8139-f71f8801f3b1"));
        assert_eq!(field(&form, "__uzmbj"), Some("1763078854"));
        assert_eq!(field(&form, "uzl"), field(&form, "__uzmlj"));
    }

    #[test]
    fn missing_cookies_become_empty_fields() {
        let form = tracking_form(&ReplayConfig::default(), &CookieContext::new(), &[]);
        assert_eq!(field(&form, "uzmx"), Some(""));
        assert_eq!(field(&form, "dync"), Some("uzmx"));
    }

    #[test]
    fn overrides_replace_in_place_or_append() {
        let form = tracking_form(
            &ReplayConfig::default(),
            &CookieContext::with_defaults(),
            &[("cid", "other"), ("et", "82")],
        );
        assert_eq!(form[0], ("cid".to_string(), "other".to_string()));
        assert_eq!(form.last(), Some(&("et".to_string(), "82".to_string())));
    }

    #[test]
    fn js_info_embeds_the_user_agent_as_json() {
        let info = js_info("UA/1.0");
        assert_eq!(info, r#"{"j0": "UA/1.0"}"#);
        assert_eq!(js_info(&"u".repeat(2000)).chars().count(), JSINFO_LIMIT);
    }

    #[test]
    fn request_uses_form_content_type_and_page_referer() {
        let request =
            tracking_request(&ReplayConfig::default(), &CookieContext::with_defaults(), &[])
                .unwrap();
        assert_eq!(request.tag, TRACKING_TAG);
        assert_eq!(request.headers["content-type"], "application/x-www-form-urlencoded");
        assert_eq!(request.headers["referer"], "https://verymobile.it/offerte/very-599");
    }
}

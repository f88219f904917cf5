//! Replay configuration.
//!
//! Defaults reproduce the browser session the replay was captured from:
//! endpoints, user agent, the common `fetch()` headers and the cookie set
//! present when the coupon popup fired. Endpoints can be pointed elsewhere
//! through [`ReplayConfigBuilder`].

use std::time::Duration;

use url::Url;

use crate::replay::ReplayResult;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

pub const DEFAULT_EDGE_URL: &str = "https://mboxedge37.tt.omtrdc.net/rest/v1/delivery?client=windtre&sessionId=de71c9d5bab040ffa05c369bc6bdddfc&version=2.11.4";
pub const DEFAULT_TRACKING_URL: &str =
    "https://verymobile.it/c99a4269-161c-4242-a3f0-28d44fa6ce24?";
pub const DEFAULT_WEBHOOK_URL: &str = "https://n8nanitia.app.n8n.cloud/webhook/popup-noleave";

/// Origin the default cookies are scoped to.
pub const DEFAULT_COOKIE_ORIGIN: &str = "https://verymobile.it/";
pub const DEFAULT_PAGE_URL: &str = "https://verymobile.it/offerte/very-599";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Headers every call sends before its own `Content-Type` is merged in.
pub const COMMON_HEADERS: &[(&str, &str)] = &[
    ("Accept", "*/*"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("Origin", "https://verymobile.it"),
    ("Referer", "https://verymobile.it/offerte/very-599"),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "cross-site"),
];

pub const DEFAULT_COOKIES: &[(&str, &str)] = &[
    ("__uzma", "1e983c5a-1858-4f35-8139-f71f8801f3b1"),
    ("__uzmb", "1759947967"),
    ("__uzme", "6459"),
    ("__ssds", "0"),
    ("__ssuzjsr0", "a9be0cd8e"),
    ("__uzmaj0", "1e983c5a-1858-4f35-8139-f71f8801f3b1"),
    ("__uzmbj0", "1763078854"),
    ("__uzmlj0", "2YDCUsrHqPXue+jydYzKmk8B6wSrGrcnCVB2Kn62KR0="),
    ("at_check", "true"),
    ("mboxEdgeCluster", "37"),
    ("couponGamification", "B-YV6YG1"),
    ("__uzmcj0", "691507039830"),
    ("__uzmdj0", "1764436606"),
    (
        "__uzmfj0",
        "7f90001e983c5a-1858-4f35-8139-f71f8801f3b12-17630788542921357751983-001e6ef264a7f80dd2570",
    ),
    (
        "uzmxj",
        "7f900007428410-dc6b-4331-b2f5-c524f75288752-17630788542921357751983-2c8d15751fb83fc570",
    ),
    ("__uzmc", "1814228672767"),
    ("__uzmd", "1764436647"),
    (
        "__uzmf",
        "7f90001e983c5a-1858-4f35-8139-f71f8801f3b18-17599479678794488680010-001891e451ca5452454286",
    ),
    (
        "uzmx",
        "7f900007428410-dc6b-4331-b2f5-c524f75288757-17604270736624009574227-4e5a239ebba651ad232",
    ),
    (
        "mbox",
        "PC#01c60f3bcc054c248e1b3ce75eaacacd.37_0#1827681451|session#de71c9d5bab040ffa05c369bc6bdddfc#1764438511",
    ),
];

/// Everything the request functions need to rebuild the captured calls.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub edge_url: Url,
    pub tracking_url: Url,
    pub webhook_url: Url,
    pub cookie_origin: Url,
    pub page_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            edge_url: parse_builtin(DEFAULT_EDGE_URL),
            tracking_url: parse_builtin(DEFAULT_TRACKING_URL),
            webhook_url: parse_builtin(DEFAULT_WEBHOOK_URL),
            cookie_origin: parse_builtin(DEFAULT_COOKIE_ORIGIN),
            page_url: DEFAULT_PAGE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ReplayConfig {
    pub fn builder() -> ReplayConfigBuilder {
        ReplayConfigBuilder::new()
    }

    /// Every origin a call may receive cookies from. Endpoints come before
    /// the cookie origin so server-set values shadow the seeded ones.
    pub fn contacted_origins(&self) -> [&Url; 4] {
        [
            &self.edge_url,
            &self.tracking_url,
            &self.webhook_url,
            &self.cookie_origin,
        ]
    }
}

// The built-in URLs are literals checked by `default_urls_parse`.
fn parse_builtin(raw: &str) -> Url {
    Url::parse(raw).unwrap_or_else(|err| panic!("built-in url {raw} is invalid: {err}"))
}

/// Fluent builder for [`ReplayConfig`].
#[derive(Debug, Default)]
pub struct ReplayConfigBuilder {
    config: ReplayConfig,
}

impl ReplayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge_url(mut self, url: &str) -> ReplayResult<Self> {
        self.config.edge_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_tracking_url(mut self, url: &str) -> ReplayResult<Self> {
        self.config.tracking_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_webhook_url(mut self, url: &str) -> ReplayResult<Self> {
        self.config.webhook_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ReplayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_urls_parse() {
        let config = ReplayConfig::default();
        assert_eq!(config.edge_url.host_str(), Some("mboxedge37.tt.omtrdc.net"));
        assert_eq!(config.tracking_url.host_str(), Some("verymobile.it"));
        assert_eq!(config.webhook_url.path(), "/webhook/popup-noleave");
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn builder_overrides_endpoints() {
        let config = ReplayConfig::builder()
            .with_webhook_url("http://127.0.0.1:9000/hook")
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.webhook_url.as_str(), "http://127.0.0.1:9000/hook");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.edge_url.as_str(), DEFAULT_EDGE_URL);
    }

    #[test]
    fn builder_overrides_user_agent() {
        let config = ReplayConfig::builder()
            .with_user_agent("coupon-replay-test/1.0")
            .build();
        assert_eq!(config.user_agent, "coupon-replay-test/1.0");
        assert_eq!(ReplayConfig::default().user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn builder_rejects_invalid_url() {
        assert!(ReplayConfig::builder().with_edge_url("not a url").is_err());
    }
}

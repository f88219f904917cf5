//! Run orchestration.
//!
//! Drives one of the two fixed sequences over a shared [`Session`]:
//! `simple` asks the webhook directly, `full` first replays the page-load
//! warm-up (edge delivery twice, tracking twice) and then asks the webhook,
//! echoing whatever coupon comes back.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::audit::AuditLog;
use crate::calls::{
    WebhookReply, call_edge_delivery, call_tracking, call_webhook, echo_coupon,
};
use crate::config::ReplayConfig;
use crate::coupon::{correlation_id, extract_coupon, format_keys};
use crate::output::{SaveOutcome, save_coupon};
use crate::pacing::{AFTER_EDGE_DELIVERY, AFTER_TRACKING, Pacer, TokioPacer};
use crate::session::{CookieContext, Session};

/// Analytics cookie the correlation id is derived from.
pub const GA_COOKIE: &str = "_ga";

/// Result alias used across the crate.
pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("header conversion failed: {0}")]
    InvalidHeader(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Webhook only.
    #[default]
    Simple,
    /// Edge delivery ×2, tracking ×2, webhook, automatic echo.
    Full,
}

/// Per-run inputs, usually straight from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub mode: Mode,
    pub ga: Option<String>,
    pub existing: Option<String>,
    /// Echo a received coupon in simple mode; full mode always echoes.
    pub echo: bool,
    pub print_raw: bool,
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Webhook unreachable or not answering with a JSON object.
    NoResponse,
    /// Webhook answered without a usable coupon.
    NoCoupon,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::NoResponse | RunStatus::NoCoupon => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: Mode,
    pub status: RunStatus,
    pub coupon: Option<String>,
    pub reply: Option<WebhookReply>,
    pub saved: Option<SaveOutcome>,
}

impl RunReport {
    fn no_response(mode: Mode) -> Self {
        Self {
            mode,
            status: RunStatus::NoResponse,
            coupon: None,
            reply: None,
            saved: None,
        }
    }

    fn answered(mode: Mode, reply: WebhookReply, coupon: Option<String>) -> Self {
        let status = if coupon.is_some() {
            RunStatus::Success
        } else {
            RunStatus::NoCoupon
        };
        Self {
            mode,
            status,
            coupon,
            reply: Some(reply),
            saved: None,
        }
    }
}

/// Owns the session for one run and borrows the audit log.
pub struct CouponReplay<'a> {
    session: Session,
    log: &'a AuditLog,
    pacer: Arc<dyn Pacer>,
}

impl<'a> CouponReplay<'a> {
    /// Session with the captured default cookies, paced in real time.
    pub fn new(config: ReplayConfig, log: &'a AuditLog) -> ReplayResult<Self> {
        Self::with_pacer(config, log, Arc::new(TokioPacer))
    }

    pub fn with_pacer(
        config: ReplayConfig,
        log: &'a AuditLog,
        pacer: Arc<dyn Pacer>,
    ) -> ReplayResult<Self> {
        let session = Session::new(config, CookieContext::with_defaults())?;
        Ok(Self {
            session,
            log,
            pacer,
        })
    }

    pub async fn run(&mut self, options: &RunOptions) -> RunReport {
        self.log.info("=== Avvio coupon-replay ===");

        if let Some(ga) = options.ga.as_deref() {
            self.session.set_cookie(GA_COOKIE, ga);
            self.log.info(&format!("Cookie _ga impostato da CLI: {ga}"));
        }

        let ga = self.session.cookies().get(GA_COOKIE);
        let cid = correlation_id(ga);
        self.log
            .info(&format!("[info] cookie _ga: {ga:?} -> cid derived: {cid:?}"));

        let mut report = match options.mode {
            Mode::Simple => self.run_simple(options, cid).await,
            Mode::Full => self.run_full(options, cid).await,
        };
        self.log.info("=== Fine esecuzione ===");

        if report.status != RunStatus::NoResponse
            && let Some(path) = options.out.as_deref()
        {
            report.saved = Some(save_coupon(self.log, report.coupon.as_deref(), path));
        }
        report
    }

    async fn run_simple(&self, options: &RunOptions, cid: Option<String>) -> RunReport {
        self.log.info("[mode] simple - chiama solo n8n");

        let reply = call_webhook(
            &self.session,
            self.log,
            cid.as_deref(),
            options.existing.as_deref(),
        )
        .await;
        let Some(reply) = reply else {
            self.fail("Nessuna risposta valida da n8n.");
            return RunReport::no_response(Mode::Simple);
        };

        let coupon = self.read_coupon(&reply, options.print_raw);
        if let Some(coupon) = coupon.as_deref()
            && options.echo
        {
            echo_coupon(&self.session, self.log, coupon).await;
        }
        RunReport::answered(Mode::Simple, reply, coupon)
    }

    async fn run_full(&self, options: &RunOptions, cid: Option<String>) -> RunReport {
        self.log
            .info("[mode] full - sequenza mbox -> mbox -> c99a -> c99a -> n8n (echo incluso)");
        self.log
            .println("[full] eseguo sequenza simulata: mbox -> mbox -> c99a -> c99a -> n8n");

        if let Err(err) = self.warm_up().await {
            self.log
                .error(&format!("[full] errore durante sequenza simulata: {err}"));
            self.log
                .println(&format!("[full] warning: errore durante sequenza simulata: {err}"));
        }

        let ga = self.session.cookie(GA_COOKIE);
        let cid = correlation_id(ga.as_deref()).or(cid);
        self.log
            .info(&format!("[full] dopo sequenza cookie _ga: {ga:?} -> cid: {cid:?}"));

        let reply = call_webhook(
            &self.session,
            self.log,
            cid.as_deref(),
            options.existing.as_deref(),
        )
        .await;
        let Some(reply) = reply else {
            self.fail("[full] n8n non ha risposto correttamente.");
            return RunReport::no_response(Mode::Full);
        };

        let coupon = self.read_coupon(&reply, options.print_raw);
        if let Some(coupon) = coupon.as_deref()
            && let Some(echo) = echo_coupon(&self.session, self.log, coupon).await
        {
            self.log
                .info(&format!("[full] echo response keys: {}", format_keys(&echo)));
        }
        RunReport::answered(Mode::Full, reply, coupon)
    }

    /// Page-load warm-up. The first failing call ends it.
    async fn warm_up(&self) -> ReplayResult<()> {
        call_edge_delivery(&self.session, self.log, None).await?;
        self.pacer.pause(AFTER_EDGE_DELIVERY).await;
        call_edge_delivery(&self.session, self.log, None).await?;
        self.pacer.pause(AFTER_EDGE_DELIVERY).await;
        call_tracking(&self.session, self.log, &[]).await?;
        self.pacer.pause(AFTER_TRACKING).await;
        call_tracking(&self.session, self.log, &[("et", "82")]).await?;
        self.pacer.pause(AFTER_TRACKING).await;
        Ok(())
    }

    /// Prints the raw reply when asked, then reports the coupon or the keys
    /// the reply carried instead.
    fn read_coupon(&self, reply: &WebhookReply, print_raw: bool) -> Option<String> {
        if print_raw {
            match serde_json::to_string_pretty(reply) {
                Ok(raw) => self.log.println(&raw),
                Err(err) => self.log.error(&format!("raw reply not printable: {err}")),
            }
        }

        let coupon = extract_coupon(reply);
        match coupon.as_deref() {
            Some(coupon) => {
                self.log.info(&format!("Coupon ricevuto: {coupon}"));
                self.log.println("\n--- COUPON RICEVUTO ---");
                self.log.println(coupon);
            }
            None => {
                let keys = format_keys(reply);
                self.log
                    .warning(&format!("Nessun campo 'Coupon' nella risposta. Keys: {keys}"));
                self.log
                    .println(&format!("Nessun campo 'Coupon' nella risposta. Keys: {keys}"));
            }
        }
        coupon
    }

    fn fail(&self, message: &str) {
        self.log.error(message);
        self.log.println(message);
    }
}

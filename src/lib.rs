//! # coupon-replay
//!
//! Replays the HTTP calls a landing page's coupon popup makes (edge
//! delivery, tracking beacon and coupon webhook) and reports the coupon the
//! webhook hands out. Every request and response is written to an audit log.
//!
//! ## Example
//!
//! ```no_run
//! use coupon_replay::{AuditConfig, AuditLog, CouponReplay, Mode, ReplayConfig, RunOptions};
//! use log::LevelFilter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = AuditLog::configure(&AuditConfig::new("coupon_gen.log", LevelFilter::Info, false))?;
//!     let mut replay = CouponReplay::new(ReplayConfig::default(), &log)?;
//!     let report = replay
//!         .run(&RunOptions { mode: Mode::Full, ..Default::default() })
//!         .await;
//!     println!("coupon: {:?}", report.coupon);
//!     Ok(())
//! }
//! ```

mod replay;

pub mod audit;
pub mod calls;
pub mod config;
pub mod coupon;
pub mod output;
pub mod pacing;
pub mod session;

pub use crate::replay::{
    CouponReplay,
    GA_COOKIE,
    Mode,
    ReplayError,
    ReplayResult,
    RunOptions,
    RunReport,
    RunStatus,
};

pub use crate::audit::{AuditConfig, AuditLog, parse_level};
pub use crate::calls::{WebhookPayload, WebhookReply};
pub use crate::config::{ReplayConfig, ReplayConfigBuilder};
pub use crate::coupon::{COUPON_KEYS, correlation_id, extract_coupon};
pub use crate::output::{SaveOutcome, save_coupon};
pub use crate::pacing::{Pacer, RecordingPacer, TokioPacer};
pub use crate::session::{CookieContext, RequestBody, RequestDescriptor, ResponseRecord, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

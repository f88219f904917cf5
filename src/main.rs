use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use coupon_replay::{AuditConfig, AuditLog, CouponReplay, Mode, ReplayConfig, RunOptions, parse_level};

#[derive(Debug, Parser)]
#[command(name = "coupon-replay", version)]
#[command(about = "Emula il popup coupon e stampa il coupon restituito (con logging su file).")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Simple)]
    mode: Mode,

    /// Valore cookie _ga (es. GA1.2.1234567890.1764436606).
    #[arg(long)]
    ga: Option<String>,

    /// Passa coupon esistente nel payload (campo 'coupon').
    #[arg(long)]
    existing: Option<String>,

    /// Invia (echo) il coupon ricevuto al webhook (solo simple mode).
    #[arg(long)]
    echo: bool,

    /// Salva il coupon ricevuto su file (una riga).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stampa il JSON raw restituito dal webhook.
    #[arg(long)]
    print_raw: bool,

    /// File di log.
    #[arg(long, default_value = "coupon_gen.log")]
    log: PathBuf,

    /// Livello di log: DEBUG, INFO, WARNING, ERROR.
    #[arg(long, default_value = "INFO")]
    log_level: String,

    /// Registra interi body request/response.
    #[arg(long)]
    log_full: bool,

    #[arg(long, env = "COUPON_REPLAY_EDGE_URL")]
    edge_url: Option<String>,

    #[arg(long, env = "COUPON_REPLAY_TRACKING_URL")]
    tracking_url: Option<String>,

    #[arg(long, env = "COUPON_REPLAY_WEBHOOK_URL")]
    webhook_url: Option<String>,

    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,
}

impl Cli {
    fn replay_config(&self) -> anyhow::Result<ReplayConfig> {
        let mut builder = ReplayConfig::builder().with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(url) = &self.edge_url {
            builder = builder.with_edge_url(url).context("invalid --edge-url")?;
        }
        if let Some(url) = &self.tracking_url {
            builder = builder.with_tracking_url(url).context("invalid --tracking-url")?;
        }
        if let Some(url) = &self.webhook_url {
            builder = builder.with_webhook_url(url).context("invalid --webhook-url")?;
        }
        Ok(builder.build())
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: self.mode,
            ga: self.ga.clone(),
            existing: self.existing.clone(),
            echo: self.echo,
            print_raw: self.print_raw,
            out: self.out.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("coupon-replay: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let audit = AuditConfig::new(&cli.log, parse_level(&cli.log_level), cli.log_full);
    let log = AuditLog::configure(&audit)
        .with_context(|| format!("cannot open log file {}", cli.log.display()))?;

    let config = cli.replay_config()?;
    let mut replay = CouponReplay::new(config, &log).context("cannot build http session")?;
    let report = replay.run(&cli.run_options()).await;
    log::debug!("run finished: {:?}", report.status);

    Ok(report.status.exit_code())
}

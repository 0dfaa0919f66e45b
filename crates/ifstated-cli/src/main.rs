//! Command-line front-end (spec §6): loads a YAML configuration, runs one
//! reconciliation pass, and maps the engine's error taxonomy onto a process
//! exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ifstated_engine::engine::{Engine, Mode};
use ifstated_model::config::Config;
use ifstated_model::link::{VrrpKind, VrrpSelector, VrrpState};
use tracing::{error, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: PathBuf,

    /// Apply the computed changes to the kernel
    #[arg(long, conflicts_with = "check")]
    apply: bool,

    /// Compute and log the diff without mutating kernel state
    #[arg(long, conflicts_with = "apply")]
    check: bool,

    /// Restrict this pass to objects tagged for one VRRP transition, given
    /// as `type:name:state` (spec §4.6 "by_vrrp")
    #[arg(long, value_parser = parse_vrrp_selector)]
    vrrp: Option<VrrpSelector>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_vrrp_selector(raw: &str) -> Result<VrrpSelector, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(kind), Some(name), Some(state)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected type:name:state".to_string());
    };
    let kind = match kind {
        "group" => VrrpKind::Group,
        "instance" => VrrpKind::Instance,
        other => return Err(format!("unknown vrrp type '{other}'")),
    };
    let state = match state {
        "unknown" => VrrpState::Unknown,
        "fault" => VrrpState::Fault,
        "backup" => VrrpState::Backup,
        "master" => VrrpState::Master,
        other => return Err(format!("unknown vrrp state '{other}'")),
    };
    Ok(VrrpSelector { kind, name: name.to_string(), state })
}

/// Process exit codes (spec §6/§7 error taxonomy, this workspace's mapping
/// decision — see DESIGN.md).
mod exit_code {
    pub const OK: u8 = 0;
    pub const CONFIG_MALFORMED: u8 = 2;
    pub const LINK_CIRCULAR: u8 = 4;
    pub const LINK_NO_CONFIG: u8 = 5;
    pub const RUNTIME: u8 = 1;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            return ExitCode::from(exit_code::RUNTIME);
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let raw = match tokio::fs::read_to_string(&cli.config).await {
        Ok(raw) => raw,
        Err(err) => {
            error!(path = %cli.config.display(), %err, "failed to read configuration");
            return ExitCode::from(exit_code::CONFIG_MALFORMED);
        }
    };

    let mut config: Config = match serde_yaml_ng::from_str(&raw) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "configuration failed to parse");
            return ExitCode::from(exit_code::CONFIG_MALFORMED);
        }
    };

    if config.namespaces.values().all(|ns| ns.links.is_empty()) {
        error!("configuration has no link entries; refusing to run (guard against accidental wipe)");
        return ExitCode::from(exit_code::LINK_NO_CONFIG);
    }

    if let Some(selector) = &cli.vrrp {
        config = Engine::filter_by_vrrp(&config, selector);
    }

    let mode = if cli.apply { Mode::Apply } else { Mode::Check };

    let mut engine = Engine::new(ifstated_engine::defaults::Defaults::new(Vec::new()));
    match engine.reconcile(&config, mode).await {
        Ok(()) => ExitCode::from(exit_code::OK),
        Err(ifstated_engine::EngineError::LinkCircularLinked(cycle)) => {
            error!(?cycle, "dependency graph has a cycle");
            ExitCode::from(exit_code::LINK_CIRCULAR)
        }
        Err(err) => {
            error!(%err, "reconciliation failed");
            ExitCode::from(exit_code::RUNTIME)
        }
    }
}

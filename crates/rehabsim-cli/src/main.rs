//! `rehabsim` – rehabilitation device simulator.
//!
//! Stands in for the physical device: the frontend connects over TCP,
//! selects a patient and task, and receives motor snapshots over UDP while
//! the simulated handle moves.
//!
//! 1. Loads `rehabsim.toml` (or `--config <path>`), writing the defaults
//!    first if the file does not exist, then applies `REHABSIM_*`
//!    environment overrides and `--seed`.
//! 2. With `--print-config`, prints the effective configuration and exits.
//! 3. Installs the tracing subscriber and serves frontends until Ctrl-C or
//!    an emergency stop.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use rehabsim_middleware::{ServerError, SimServer, StopReason};
use rehabsim_runtime::{Simulator, TracingLogSink, init_tracing};
use rehabsim_types::SimulatorConfig;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rehabsim")]
#[command(version)]
#[command(about = "Rehabilitation device simulator for frontend development")]
struct Args {
    /// Configuration file; created with defaults when missing.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seed for packet loss and task randomisation (overrides the file).
    #[arg(long)]
    seed: Option<u64>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut cfg = match config::load_from(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = args.seed {
        cfg.network.seed = Some(seed);
    }

    if args.print_config {
        return match toml::to_string_pretty(&cfg) {
            Ok(raw) => {
                print!("{raw}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Config error".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    // Hold the guard until exit so pending spans are flushed.
    let _guard = init_tracing("rehabsim", cfg.logging.format);

    print_banner(&cfg, &args.config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(cfg)) {
        Ok(reason) => exit_code(reason),
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cfg: SimulatorConfig) -> Result<StopReason, ServerError> {
    let simulator = Simulator::new(cfg, Instant::now()).with_log_sink(Box::new(TracingLogSink));
    let server = SimServer::bind(simulator).await?;

    let stopped = server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to install Ctrl-C handler; stop with an emergency stop instead");
                std::future::pending::<()>().await;
            }
            println!();
            println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        })
        .await?;

    info!(state = %stopped.simulator.session_state(), reason = ?stopped.reason, "simulator stopped");
    match stopped.reason {
        StopReason::Requested => println!("{}", "  ✓ Exiting rehabsim.".green()),
        StopReason::EmergencyStop => println!("{}", "  ✗ Emergency stop – exiting rehabsim.".red().bold()),
    }
    Ok(stopped.reason)
}

/// An emergency stop is an abnormal exit.
fn exit_code(reason: StopReason) -> ExitCode {
    match reason {
        StopReason::Requested => ExitCode::SUCCESS,
        StopReason::EmergencyStop => ExitCode::FAILURE,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner(cfg: &SimulatorConfig, config_path: &Path) {
    let net = &cfg.network;
    println!();
    println!(
        "  {} {}",
        "rehabsim".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Rehabilitation device simulator");
    println!();
    println!("  Config       {}", config_path.display().to_string().bold());
    println!("  Commands     tcp://{}:{}", net.bind_ip, net.command_port);
    println!("  Motor data   udp://<frontend>:{}", net.motor_data_port);
    println!("  Cycle        {} ms", cfg.cycle.period_ms);
    if net.patient_loss_rate > 0.0 || net.control_loss_rate > 0.0 || net.motor_data_loss_rate > 0.0 {
        println!(
            "  {}  loss patient={} control={} motor={}",
            "Simulated packet loss".yellow(),
            net.patient_loss_rate,
            net.control_loss_rate,
            net.motor_data_loss_rate
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::parse_from(["rehabsim"]);
        assert_eq!(args.config, PathBuf::from(config::DEFAULT_CONFIG_PATH));
        assert_eq!(args.seed, None);
        assert!(!args.print_config);
    }

    #[test]
    fn emergency_stop_exits_with_failure() {
        assert_eq!(exit_code(StopReason::EmergencyStop), ExitCode::FAILURE);
        assert_eq!(exit_code(StopReason::Requested), ExitCode::SUCCESS);
    }

    #[test]
    fn args_overrides() {
        let args = Args::parse_from(["rehabsim", "--config", "lab.toml", "--seed", "42", "--print-config"]);
        assert_eq!(args.config, PathBuf::from("lab.toml"));
        assert_eq!(args.seed, Some(42));
        assert!(args.print_config);
    }
}

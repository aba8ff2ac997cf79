// MIT License - Copyright (c) 2026 Peter Wright
// Command-line monitor and controller

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use arrowhead_bridge::{
    probe_mode, ArmingState, ArrowheadPanel, Delimiter, EventReceiver, OutputConfig, PanelConfig,
    PanelEvent, ReconcilePolicy, Snapshot, ZoneConfig,
};

/// How long a one-shot command waits for the panel's `OK`/`ERR`.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "arrowhead-bridge")]
#[command(about = "Monitor and control an Arrowhead alarm panel over TCP")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Poll the panel and print every snapshot as a JSON line (default)
    Monitor,
    /// Check that the panel answers MODE with an echo
    Probe,
    /// Arm an area in away mode
    ArmAway {
        #[arg(long, default_value_t = 1)]
        area: u32,
    },
    /// Arm an area in stay mode
    ArmStay {
        #[arg(long, default_value_t = 1)]
        area: u32,
    },
    /// Bypass a zone, then arm stay
    ArmNight {
        zone: u32,
        #[arg(long, default_value_t = 1)]
        area: u32,
    },
    /// Disarm an area
    Disarm {
        #[arg(long)]
        pin: String,
        #[arg(long, default_value_t = 1)]
        area: u32,
    },
    /// Bypass a zone
    Bypass { zone: u32 },
    /// Remove a zone bypass
    Unbypass { zone: u32 },
    /// Turn an output on
    OutputOn { output: u32 },
    /// Turn an output off
    OutputOff { output: u32 },
    /// Request a status dump and print the resulting snapshot
    Status,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    #[serde(default)]
    zones: Vec<ZoneConfig>,
    #[serde(default)]
    outputs: Vec<OutputConfig>,
    #[serde(default)]
    policy: ReconcilePolicy,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_mode")]
    mode: u8,
    #[serde(default = "default_scan_interval")]
    scan_interval_ms: u64,
    #[serde(default = "default_refresh_timeout")]
    refresh_timeout_ms: u64,
    #[serde(default = "default_connect_timeout")]
    connect_timeout_ms: u64,
    #[serde(default)]
    delimiter: Delimiter,
}

fn default_port() -> u16 {
    9000
}
fn default_mode() -> u8 {
    2
}
fn default_scan_interval() -> u64 {
    60000
}
fn default_refresh_timeout() -> u64 {
    10000
}
fn default_connect_timeout() -> u64 {
    5000
}

fn build_panel_config(config: Config) -> PanelConfig {
    PanelConfig::builder()
        .host(config.panel.host)
        .port(config.panel.port)
        .mode(config.panel.mode)
        .scan_interval_ms(config.panel.scan_interval_ms)
        .refresh_timeout_ms(config.panel.refresh_timeout_ms)
        .connect_timeout_ms(config.panel.connect_timeout_ms)
        .delimiter(config.panel.delimiter)
        .zones(config.zones)
        .outputs(config.outputs)
        .policy(config.policy)
        .build()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One line of monitor output.
#[derive(Serialize)]
struct SnapshotLine<'a> {
    now: i64,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    arming_state: Option<ArmingState>,
    ready_to_arm: bool,
    open_zones: Vec<u32>,
    alarmed_zones: Vec<u32>,
    bypassed_zones: Vec<u32>,
}

fn print_snapshot(snapshot: &Snapshot) -> Result<()> {
    let line = SnapshotLine {
        now: Utc::now().timestamp(),
        snapshot,
        arming_state: snapshot.arming_state(),
        ready_to_arm: snapshot.ready_to_arm(),
        open_zones: snapshot.open_zones(),
        alarmed_zones: snapshot.alarmed_zones(),
        bypassed_zones: snapshot.bypassed_zones(),
    };
    println!(
        "{}",
        serde_json::to_string(&line).context("Failed to serialize snapshot")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

async fn monitor(panel: Arc<ArrowheadPanel>) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut snapshots = panel.subscribe();
    let mut events = panel.events();

    let cancel = CancellationToken::new();
    let runner = {
        let panel = Arc::clone(&panel);
        let cancel = cancel.clone();
        tokio::spawn(async move { panel.run(cancel).await })
    };

    print_snapshot(&panel.snapshot())?;

    info!("Monitoring panel. Send SIGINT/SIGTERM to stop.");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot)?;
            }
            event = events.recv() => match event {
                Ok(PanelEvent::Connected) => info!("Panel connected"),
                Ok(PanelEvent::Disconnected) => warn!("Panel disconnected, will reconnect on next refresh"),
                Ok(PanelEvent::ConnectionLost { reason }) => {
                    warn!("Panel connection lost ({reason}), will reconnect on next refresh");
                }
                Ok(PanelEvent::SystemCondition { condition, pendant }) => match pendant {
                    Some(n) => info!("Pendant {n}: {}", condition.description()),
                    None => info!("System: {}", condition.description()),
                },
                Ok(event) => debug!("Panel event: {:?}", event),
                Err(RecvError::Lagged(n)) => warn!("Event receiver lagged, missed {n} events"),
                Err(RecvError::Closed) => {
                    info!("Event channel closed");
                    break;
                }
            },
        }
    }

    cancel.cancel();
    runner.await.context("Refresh task failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// One-shot commands
// ---------------------------------------------------------------------------

/// Wait for the panel to acknowledge `verb`. Other acknowledgments are skipped.
async fn wait_for_response(events: &mut EventReceiver, verb: &str) -> Result<()> {
    let deadline = Instant::now() + RESPONSE_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, events.recv()).await {
            Err(_) => anyhow::bail!("No response from panel to {verb} within {RESPONSE_TIMEOUT:?}"),
            Ok(Ok(PanelEvent::CommandSucceeded { command })) if command.starts_with(verb) => {
                info!("Panel accepted: {command}");
                return Ok(());
            }
            Ok(Ok(PanelEvent::CommandFailed { code })) => anyhow::bail!("Panel rejected {verb}: {code}"),
            Ok(Ok(PanelEvent::ConnectionLost { reason })) => {
                anyhow::bail!("Connection lost while waiting for {verb}: {reason}")
            }
            Ok(Ok(_)) => {}
            Ok(Err(RecvError::Lagged(n))) => warn!("Event receiver lagged, missed {n} events"),
            Ok(Err(RecvError::Closed)) => anyhow::bail!("Event channel closed"),
        }
    }
}

/// Wait for the status dump started by `request_status` to finish.
async fn wait_for_sync(events: &mut EventReceiver) -> Result<()> {
    let deadline = Instant::now() + RESPONSE_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, events.recv()).await {
            Err(_) => anyhow::bail!("Status dump did not complete within {RESPONSE_TIMEOUT:?}"),
            Ok(Ok(PanelEvent::SyncCompleted)) => return Ok(()),
            Ok(Ok(PanelEvent::CommandFailed { code })) => anyhow::bail!("Panel rejected STATUS: {code}"),
            Ok(Ok(_)) => {}
            Ok(Err(RecvError::Lagged(n))) => warn!("Event receiver lagged, missed {n} events"),
            Ok(Err(RecvError::Closed)) => anyhow::bail!("Event channel closed"),
        }
    }
}

async fn run_command(panel: &ArrowheadPanel, command: CliCommand) -> Result<()> {
    let mut events = panel.events();
    panel.connect().await.context("Failed to connect to panel")?;
    panel.set_mode(panel.config().mode).await?;
    wait_for_response(&mut events, "MODE").await?;

    match command {
        CliCommand::ArmAway { area } => {
            panel.arm_away(area).await?;
            wait_for_response(&mut events, "ARMAWAY").await?;
        }
        CliCommand::ArmStay { area } => {
            panel.arm_stay(area).await?;
            wait_for_response(&mut events, "ARMSTAY").await?;
        }
        CliCommand::ArmNight { zone, area } => {
            panel.arm_night(zone, area).await?;
            wait_for_response(&mut events, "ARMSTAY").await?;
        }
        CliCommand::Disarm { pin, area } => {
            panel.disarm(&pin, area).await?;
            wait_for_response(&mut events, "DISARM").await?;
        }
        CliCommand::Bypass { zone } => {
            panel.bypass_zone(zone).await?;
            wait_for_response(&mut events, "BYPASS").await?;
        }
        CliCommand::Unbypass { zone } => {
            panel.unbypass_zone(zone).await?;
            wait_for_response(&mut events, "UNBYPASS").await?;
        }
        CliCommand::OutputOn { output } => {
            panel.trigger_output(output).await?;
            wait_for_response(&mut events, "OUTPUTON").await?;
        }
        CliCommand::OutputOff { output } => {
            panel.output_off(output).await?;
            wait_for_response(&mut events, "OUTPUTOFF").await?;
        }
        CliCommand::Status => {
            panel.request_status().await?;
            wait_for_sync(&mut events).await?;
            print_snapshot(&panel.snapshot())?;
        }
        CliCommand::Monitor | CliCommand::Probe => {}
    }

    panel.disconnect().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=arrowhead_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    let panel_config = build_panel_config(config);

    match cli.command.unwrap_or(CliCommand::Monitor) {
        CliCommand::Monitor => {
            let panel = Arc::new(ArrowheadPanel::new(panel_config).context("Invalid panel config")?);
            monitor(panel).await?;
        }
        CliCommand::Probe => {
            info!(
                "Probing panel at {}:{} with MODE {}",
                panel_config.host, panel_config.port, panel_config.mode
            );
            if !probe_mode(&panel_config).await {
                error!("Panel did not answer the mode probe");
                anyhow::bail!("Mode probe failed");
            }
            println!("Panel answered MODE {}", panel_config.mode);
        }
        command => {
            let panel = ArrowheadPanel::new(panel_config).context("Invalid panel config")?;
            if let Err(e) = run_command(&panel, command).await {
                let _ = panel.disconnect().await;
                return Err(e);
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrowhead_bridge::{PartitionStatus, ZoneKind};

    #[test]
    fn test_parse_config_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "10.0.0.5"

            [[zones]]
            number = 1
            name = "Front door"
            kind = "door"

            [[zones]]
            number = 2
            name = "Lounge"

            [[outputs]]
            number = 1
            name = "Siren"
            "#,
        )
        .unwrap();

        let panel = build_panel_config(config);
        assert_eq!(panel.host, "10.0.0.5");
        assert_eq!(panel.port, 9000);
        assert_eq!(panel.mode, 2);
        assert_eq!(panel.scan_interval_ms, 60000);
        assert_eq!(panel.zones.len(), 2);
        assert_eq!(panel.zones[0].kind, ZoneKind::Door);
        assert_eq!(panel.zones[1].kind, ZoneKind::Motion);
        assert_eq!(panel.outputs[0].name, "Siren");
        assert!(!panel.policy.derive_partition_alarm);
    }

    #[test]
    fn test_parse_policy_and_delimiter() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "10.0.0.5"
            port = 9001
            delimiter = "cr_lf"

            [policy]
            derive_partition_alarm = true
            shielded_statuses = ["ready", "not_ready"]
            "#,
        )
        .unwrap();

        let panel = build_panel_config(config);
        assert_eq!(panel.port, 9001);
        assert_eq!(panel.delimiter, Delimiter::CrLf);
        assert!(panel.policy.derive_partition_alarm);
        assert_eq!(panel.policy.shielded_statuses.len(), 2);
        assert!(panel.policy.shielded_statuses.contains(&PartitionStatus::NotReady));
    }

    #[test]
    fn test_snapshot_line_flattens_snapshot() {
        let snapshot = Snapshot::initial([1, 2]);
        let line = SnapshotLine {
            now: 0,
            snapshot: &snapshot,
            arming_state: snapshot.arming_state(),
            ready_to_arm: snapshot.ready_to_arm(),
            open_zones: snapshot.open_zones(),
            alarmed_zones: snapshot.alarmed_zones(),
            bypassed_zones: snapshot.bypassed_zones(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["partition_status"], "disarmed");
        assert_eq!(json["arming_state"], "disarmed");
        assert_eq!(json["zones"]["2"]["bypassed"], false);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["arrowhead-bridge", "disarm", "--pin", "1234"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(CliCommand::Disarm { ref pin, area: 1 }) if pin == "1234"
        ));

        let cli = Cli::try_parse_from(["arrowhead-bridge", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, "x.toml");
        assert!(cli.command.is_none());
    }
}

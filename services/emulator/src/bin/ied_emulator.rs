//! Virtual IED entry point.
//!
//! Loads the TOML configuration, wires the shared state, and runs the
//! device: sniffer and SV publisher on dedicated real-time threads
//! (publisher higher), GOOSE heartbeat on an ordinary thread. When a
//! single-shot replay completes, everything is stopped and the replay
//! report plus counters are logged.

use anyhow::{Context, Result};
use clap::Parser;
use config::EmulatorConfig;
use ied_emulator::{Sniffer, Subscription, TripEvaluator};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ied-emulator", about = "IEC 61850 virtual IED emulator", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Validate the configuration (including trip rules) and exit
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = config::load_config(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    // Rules and subscriptions validate the same way in both paths, so a
    // --check run exercises exactly what a live run would register.
    let evaluator = build_evaluator(&cfg)?;
    let subscriptions = build_subscriptions(&cfg)?;

    if args.check {
        info!(
            rules = evaluator.rules().len(),
            subscriptions = subscriptions.len(),
            "configuration OK"
        );
        return Ok(());
    }

    run(cfg, evaluator, subscriptions)
}

fn build_evaluator(cfg: &EmulatorConfig) -> Result<TripEvaluator> {
    let mut evaluator = TripEvaluator::new();
    for rule in &cfg.rules {
        evaluator
            .add_rule(&rule.name, &rule.expression)
            .with_context(|| format!("registering rule '{}'", rule.name))?;
        if !rule.enabled {
            evaluator.set_enabled(&rule.name, false);
        }
    }
    Ok(evaluator)
}

fn build_subscriptions(cfg: &EmulatorConfig) -> Result<Vec<Subscription>> {
    cfg.subscriptions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Subscription::from_config(s).with_context(|| format!("building subscription {i}"))
        })
        .collect()
}

#[cfg(target_os = "linux")]
fn run(
    cfg: EmulatorConfig,
    evaluator: TripEvaluator,
    subscriptions: Vec<Subscription>,
) -> Result<()> {
    use ied_emulator::{EmulatorStats, GooseHeartbeat, MemorySampleSource, SharedState, SvReplay};
    use network::{MonotonicClock, RawSocket};
    use std::sync::Arc;
    use std::thread;
    use tracing::warn;

    const PUBLISHER_RT_PRIORITY: i32 = 50;
    const SNIFFER_RT_PRIORITY: i32 = 40;

    if let Err(e) = network::lock_memory() {
        warn!(error = %e, "running without locked memory");
    }

    let shared = Arc::new(SharedState::new());

    let sniffer_socket = RawSocket::open(&cfg.interface)?;
    let mut sniffer = Sniffer::new(subscriptions, evaluator, shared.clone());
    let sniffer_handle = thread::Builder::new()
        .name("sniffer".into())
        .spawn(move || {
            if let Err(e) = network::set_realtime_priority(SNIFFER_RT_PRIORITY) {
                warn!(error = %e, "sniffer running at default priority");
            }
            sniffer.run(&sniffer_socket)
        })
        .context("spawning sniffer thread")?;

    let heartbeat_handle = match cfg.goose.as_ref() {
        Some(goose_cfg) => {
            let heartbeat = GooseHeartbeat::plan(goose_cfg, shared.clone())?;
            let socket = RawSocket::open(&cfg.interface)?;
            Some(
                thread::Builder::new()
                    .name("goose-heartbeat".into())
                    .spawn(move || heartbeat.run(&socket, &MonotonicClock))
                    .context("spawning heartbeat thread")?,
            )
        }
        None => None,
    };

    if let Some(sv_cfg) = cfg.sv.clone() {
        let source = MemorySampleSource::sine(
            sv_cfg.smp_rate,
            sv_cfg.channels,
            sv_cfg.source.amplitude,
            sv_cfg.source.frequency_hz,
            sv_cfg.source.seconds,
        )?;
        let replay = SvReplay::plan(&sv_cfg, Box::new(source), shared.clone())?;
        let socket = RawSocket::open(&cfg.interface)?;
        let publisher_handle = thread::Builder::new()
            .name("sv-publisher".into())
            .spawn(move || {
                if let Err(e) = network::set_realtime_priority(PUBLISHER_RT_PRIORITY) {
                    warn!(error = %e, "publisher running at default priority");
                }
                replay.run(&socket, &MonotonicClock)
            })
            .context("spawning publisher thread")?;

        let report = publisher_handle
            .join()
            .map_err(|_| anyhow::anyhow!("publisher thread panicked"))??;
        info!(
            started_at = %report.started_at,
            ended_at = %report.ended_at,
            elapsed_ms = report.elapsed.as_millis() as u64,
            frames = report.frames_sent,
            "replay report"
        );
    } else {
        info!("no SV publisher configured, sniffing until terminated");
        // Blocks for the process lifetime; termination kills the threads.
        sniffer_handle
            .join()
            .map_err(|_| anyhow::anyhow!("sniffer thread panicked"))??;
        return Ok(());
    }

    shared.request_stop();
    sniffer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("sniffer thread panicked"))??;
    if let Some(handle) = heartbeat_handle {
        let beats = handle
            .join()
            .map_err(|_| anyhow::anyhow!("heartbeat thread panicked"))??;
        info!(beats, "heartbeat stopped");
    }

    let stats = &shared.stats;
    info!(
        published = EmulatorStats::get(&stats.frames_published),
        publish_errors = EmulatorStats::get(&stats.publish_errors),
        seen = EmulatorStats::get(&stats.frames_seen),
        matched = EmulatorStats::get(&stats.frames_matched),
        dropped = EmulatorStats::get(&stats.frames_dropped),
        parse_errors = EmulatorStats::get(&stats.parse_errors),
        trips = EmulatorStats::get(&stats.trips),
        "final counters"
    );
    for event in shared.trip_events() {
        info!(rule = %event.rule, at = %event.at, "trip event: {}", event.message);
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(
    _cfg: EmulatorConfig,
    _evaluator: TripEvaluator,
    _subscriptions: Vec<Subscription>,
) -> Result<()> {
    anyhow::bail!("the live emulator requires Linux AF_PACKET sockets; use --check elsewhere");
}

//! Validated runtime configuration.

use crate::schema::{RawConfig, RawGoosePublisher, RawSubscription, RawSvPublisher, RawVlan};
use crate::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::info;
use types::{MacAddr, SmpSynch, VlanTag};

/// How the SV replay terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayModeConfig {
    /// Stop when the channel buffer is exhausted, the stop flag is set, or
    /// digital input 0 asserts (an in-band trip ends the shot).
    SingleShot,
    /// Wrap the read index until externally stopped.
    Loop,
    /// Reserved. Accepted by the parser so existing files round-trip, but
    /// plan construction rejects it as unimplemented.
    Interval,
}

#[derive(Debug, Clone)]
pub struct SvPublisherConfig {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub app_id: u16,
    pub vlan: Option<VlanTag>,
    pub sv_id: String,
    pub dataset_ref: Option<String>,
    pub conf_rev: u32,
    pub smp_rate: u32,
    pub channels: usize,
    pub smp_synch: SmpSynch,
    pub mode: ReplayModeConfig,
    pub start_time: Option<f64>,
    pub source: SvSourceConfig,
}

/// Synthetic waveform parameters for standalone runs.
#[derive(Debug, Clone, Copy)]
pub struct SvSourceConfig {
    pub amplitude: i32,
    pub frequency_hz: f64,
    pub seconds: f64,
}

#[derive(Debug, Clone)]
pub struct GoosePublisherConfig {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub app_id: u16,
    pub vlan: Option<VlanTag>,
    pub gocb_ref: String,
    pub dataset_ref: String,
    pub go_id: Option<String>,
    pub ttl_ms: u32,
    pub conf_rev: u32,
    pub heartbeat_ms: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub dst: MacAddr,
    pub gocb_ref: String,
    /// `(payload_index, channel_index)` pairs.
    pub mappings: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub name: String,
    pub expression: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    pub interface: String,
    pub sv: Option<SvPublisherConfig>,
    pub goose: Option<GoosePublisherConfig>,
    pub subscriptions: Vec<SubscriptionConfig>,
    pub rules: Vec<RuleConfig>,
}

/// Load and validate a TOML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<EmulatorConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    let cfg = validate(raw)?;
    info!(
        path = %path.display(),
        sv = cfg.sv.is_some(),
        goose = cfg.goose.is_some(),
        subscriptions = cfg.subscriptions.len(),
        rules = cfg.rules.len(),
        "loaded emulator configuration"
    );
    Ok(cfg)
}

fn validate(raw: RawConfig) -> ConfigResult<EmulatorConfig> {
    if raw.interface.name.is_empty() {
        return Err(ConfigError::invalid("interface.name", "must not be empty"));
    }

    let sv = raw.publisher.sv.map(validate_sv).transpose()?;
    let goose = raw.publisher.goose.map(validate_goose).transpose()?;

    let subscriptions = raw
        .subscriptions
        .iter()
        .enumerate()
        .map(|(i, s)| validate_subscription(i, s))
        .collect::<ConfigResult<Vec<_>>>()?;

    let mut rules = Vec::with_capacity(raw.rules.len());
    for (i, rule) in raw.rules.into_iter().enumerate() {
        if rule.name.is_empty() {
            return Err(ConfigError::invalid(format!("rule[{i}].name"), "must not be empty"));
        }
        if rules.iter().any(|r: &RuleConfig| r.name == rule.name) {
            return Err(ConfigError::invalid(
                format!("rule[{i}].name"),
                format!("duplicate rule name '{}'", rule.name),
            ));
        }
        rules.push(RuleConfig {
            name: rule.name,
            expression: rule.expression,
            enabled: rule.enabled,
        });
    }

    Ok(EmulatorConfig {
        interface: raw.interface.name,
        sv,
        goose,
        subscriptions,
        rules,
    })
}

fn validate_sv(raw: RawSvPublisher) -> ConfigResult<SvPublisherConfig> {
    let key = "publisher.sv";
    if raw.smp_rate == 0 {
        return Err(ConfigError::invalid(format!("{key}.smp_rate"), "must be > 0"));
    }
    if raw.channels == 0 {
        return Err(ConfigError::invalid(format!("{key}.channels"), "must be > 0"));
    }
    if let Some(t) = raw.start_time {
        if !t.is_finite() || t < 0.0 {
            return Err(ConfigError::invalid(
                format!("{key}.start_time"),
                "must be a finite epoch time",
            ));
        }
    }
    Ok(SvPublisherConfig {
        dst: parse_mac(&raw.dst_mac, &format!("{key}.dst_mac"))?,
        src: parse_mac(&raw.src_mac, &format!("{key}.src_mac"))?,
        app_id: raw.app_id,
        vlan: raw.vlan.map(|v| parse_vlan(&v, &format!("{key}.vlan"))).transpose()?,
        sv_id: raw.sv_id,
        dataset_ref: raw.dataset_ref,
        conf_rev: raw.conf_rev,
        smp_rate: raw.smp_rate,
        channels: raw.channels,
        smp_synch: parse_smp_synch(&raw.smp_synch, &format!("{key}.smp_synch"))?,
        mode: parse_mode(&raw.mode, &format!("{key}.mode"))?,
        start_time: raw.start_time,
        source: validate_source(&raw.source, key)?,
    })
}

fn validate_goose(raw: RawGoosePublisher) -> ConfigResult<GoosePublisherConfig> {
    let key = "publisher.goose";
    if raw.gocb_ref.is_empty() {
        return Err(ConfigError::invalid(format!("{key}.gocb_ref"), "must not be empty"));
    }
    if raw.dataset_ref.is_empty() {
        return Err(ConfigError::invalid(format!("{key}.dataset_ref"), "must not be empty"));
    }
    if raw.entries == 0 {
        return Err(ConfigError::invalid(format!("{key}.entries"), "must be > 0"));
    }
    Ok(GoosePublisherConfig {
        dst: parse_mac(&raw.dst_mac, &format!("{key}.dst_mac"))?,
        src: parse_mac(&raw.src_mac, &format!("{key}.src_mac"))?,
        app_id: raw.app_id,
        vlan: raw.vlan.map(|v| parse_vlan(&v, &format!("{key}.vlan"))).transpose()?,
        gocb_ref: raw.gocb_ref,
        dataset_ref: raw.dataset_ref,
        go_id: raw.go_id,
        ttl_ms: raw.ttl_ms,
        conf_rev: raw.conf_rev,
        heartbeat_ms: raw.heartbeat_ms,
        entries: raw.entries,
    })
}

fn validate_subscription(index: usize, raw: &RawSubscription) -> ConfigResult<SubscriptionConfig> {
    let key = format!("subscription[{index}]");
    if raw.gocb_ref.is_empty() {
        return Err(ConfigError::invalid(format!("{key}.gocb_ref"), "must not be empty"));
    }
    if raw.mappings.is_empty() {
        return Err(ConfigError::invalid(format!("{key}.mappings"), "must not be empty"));
    }
    Ok(SubscriptionConfig {
        dst: parse_mac(&raw.dst_mac, &format!("{key}.dst_mac"))?,
        gocb_ref: raw.gocb_ref.clone(),
        mappings: raw.mappings.iter().map(|m| (m[0], m[1])).collect(),
    })
}

fn validate_source(raw: &crate::schema::RawSvSource, key: &str) -> ConfigResult<SvSourceConfig> {
    if raw.seconds <= 0.0 {
        return Err(ConfigError::invalid(
            format!("{key}.source.seconds"),
            "must be > 0",
        ));
    }
    if raw.frequency_hz <= 0.0 {
        return Err(ConfigError::invalid(
            format!("{key}.source.frequency_hz"),
            "must be > 0",
        ));
    }
    Ok(SvSourceConfig {
        amplitude: raw.amplitude,
        frequency_hz: raw.frequency_hz,
        seconds: raw.seconds,
    })
}

fn parse_mac(text: &str, key: &str) -> ConfigResult<MacAddr> {
    text.parse().map_err(|e| ConfigError::invalid(key, e))
}

fn parse_vlan(raw: &RawVlan, key: &str) -> ConfigResult<VlanTag> {
    VlanTag::new(raw.priority, raw.drop_eligible, raw.id)
        .map_err(|e| ConfigError::invalid(key, e))
}

fn parse_smp_synch(text: &str, key: &str) -> ConfigResult<SmpSynch> {
    match text {
        "none" => Ok(SmpSynch::None),
        "local" => Ok(SmpSynch::Local),
        "global" => Ok(SmpSynch::Global),
        other => Err(ConfigError::invalid(
            key,
            format!("unknown smpSynch '{other}', expected none|local|global"),
        )),
    }
}

fn parse_mode(text: &str, key: &str) -> ConfigResult<ReplayModeConfig> {
    match text {
        "single-shot" => Ok(ReplayModeConfig::SingleShot),
        "loop" => Ok(ReplayModeConfig::Loop),
        "interval" => Ok(ReplayModeConfig::Interval),
        other => Err(ConfigError::invalid(
            key,
            format!("unknown replay mode '{other}', expected single-shot|loop|interval"),
        )),
    }
}

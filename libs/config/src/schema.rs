//! Raw serde mirror of the TOML file.
//!
//! Fields here are deliberately loose (MACs as text, modes as strings);
//! [`crate::runtime`] does the validation. Keeping the two apart means a
//! file that fails validation still produces an error naming the exact
//! key, not a serde type error pointing at a line number.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub interface: RawInterface,
    #[serde(default)]
    pub publisher: RawPublisher,
    #[serde(default, rename = "subscription")]
    pub subscriptions: Vec<RawSubscription>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RawRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInterface {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPublisher {
    pub sv: Option<RawSvPublisher>,
    pub goose: Option<RawGoosePublisher>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSvPublisher {
    pub dst_mac: String,
    pub src_mac: String,
    pub app_id: u16,
    #[serde(default)]
    pub vlan: Option<RawVlan>,
    pub sv_id: String,
    #[serde(default)]
    pub dataset_ref: Option<String>,
    #[serde(default = "default_conf_rev")]
    pub conf_rev: u32,
    pub smp_rate: u32,
    pub channels: usize,
    #[serde(default = "default_smp_synch")]
    pub smp_synch: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Absolute start time, seconds since the Unix epoch. Omitted: align
    /// to the next whole second.
    #[serde(default)]
    pub start_time: Option<f64>,
    /// Synthetic waveform for standalone runs; a real deployment feeds
    /// the publisher from a recorded-samples loader instead.
    #[serde(default)]
    pub source: RawSvSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSvSource {
    #[serde(default = "default_amplitude")]
    pub amplitude: i32,
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,
    #[serde(default = "default_seconds")]
    pub seconds: f64,
}

impl Default for RawSvSource {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            frequency_hz: default_frequency(),
            seconds: default_seconds(),
        }
    }
}

fn default_amplitude() -> i32 {
    10_000
}

fn default_frequency() -> f64 {
    50.0
}

fn default_seconds() -> f64 {
    10.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGoosePublisher {
    pub dst_mac: String,
    pub src_mac: String,
    pub app_id: u16,
    #[serde(default)]
    pub vlan: Option<RawVlan>,
    pub gocb_ref: String,
    pub dataset_ref: String,
    #[serde(default)]
    pub go_id: Option<String>,
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u32,
    #[serde(default = "default_conf_rev")]
    pub conf_rev: u32,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    /// Number of boolean dataset entries, wired to digital-input slots
    /// positionally.
    pub entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawVlan {
    pub priority: u8,
    #[serde(default)]
    pub drop_eligible: bool,
    pub id: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSubscription {
    pub dst_mac: String,
    pub gocb_ref: String,
    /// Pairs of `[payload_index, channel_index]`.
    pub mappings: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    pub name: String,
    pub expression: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_conf_rev() -> u32 {
    1
}

fn default_smp_synch() -> String {
    "none".to_string()
}

fn default_mode() -> String {
    "single-shot".to_string()
}

fn default_ttl_ms() -> u32 {
    2000
}

fn default_heartbeat_ms() -> u64 {
    1000
}

fn default_enabled() -> bool {
    true
}

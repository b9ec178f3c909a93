//! Sampled-Value replay engine.
//!
//! Turns a channel-sample source plus a static SV configuration into a
//! continuous stream of correctly timed frames. The packet template is
//! encoded once at plan construction; each tick overwrites the 2-byte
//! sample counter and each channel's 4-byte value at their recorded
//! offsets and transmits the unchanged-length buffer. Wake times are
//! `previous wake + period` against an absolute-deadline clock, so timing
//! error does not accumulate.
//!
//! Failure policy: anything wrong with the configuration or source is
//! reported by [`SvReplay::plan`] before a single frame is sent; a send
//! failure inside the loop is counted and logged and the loop continues,
//! tolerating transient socket errors.

use crate::{EmulatorError, EmulatorResult, EmulatorStats, SampleSource, SharedState};
use chrono::{DateTime, Utc};
use codec::{encode_sv_frame, LinkHeader, SvTemplate};
use config::{ReplayModeConfig, SvPublisherConfig};
use network::{Clock, FrameTransport};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use types::{EtherType, SvAsdu, SvStreamConfig};

/// Termination policy, fixed at plan construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Stop when the buffer is exhausted, the stop flag is set, or
    /// digital input 0 asserts (an in-band trip ends the shot).
    SingleShot,
    /// Wrap the read index until externally stopped.
    Loop,
}

/// Post-run report for the caller.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub frames_sent: u64,
}

/// A fully validated replay plan: template built, offsets recorded,
/// source checked. Consumed by [`SvReplay::run`].
pub struct SvReplay {
    template: SvTemplate,
    source: Box<dyn SampleSource>,
    shared: Arc<SharedState>,
    mode: ReplayMode,
    smp_rate: u32,
    start_time: Option<f64>,
}

// `source` is a `Box<dyn SampleSource>` trait object, which cannot derive
// `Debug`; the rest of the plan is formatted directly.
impl std::fmt::Debug for SvReplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvReplay")
            .field("template", &self.template)
            .field("source", &"<dyn SampleSource>")
            .field("shared", &self.shared)
            .field("mode", &self.mode)
            .field("smp_rate", &self.smp_rate)
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl SvReplay {
    /// Validate the configuration and build the packet template. Every
    /// failure here happens before any frame is sent.
    pub fn plan(
        cfg: &SvPublisherConfig,
        source: Box<dyn SampleSource>,
        shared: Arc<SharedState>,
    ) -> EmulatorResult<Self> {
        let mode = match cfg.mode {
            ReplayModeConfig::SingleShot => ReplayMode::SingleShot,
            ReplayModeConfig::Loop => ReplayMode::Loop,
            // Reserved in the configuration format; rejected rather than
            // silently no-op'd.
            ReplayModeConfig::Interval => return Err(EmulatorError::IntervalModeUnsupported),
        };

        if cfg.smp_rate == 0 {
            return Err(EmulatorError::ZeroSampleRate);
        }
        if source.is_empty() {
            return Err(EmulatorError::EmptySource {
                reason: "source has no samples",
            });
        }
        if source.channels().len() != cfg.channels {
            return Err(EmulatorError::ChannelCountMismatch {
                source_channels: source.channels().len(),
                configured: cfg.channels,
            });
        }

        let link = LinkHeader {
            dst: cfg.dst,
            src: cfg.src,
            vlan: cfg.vlan,
            ethertype: EtherType::SampledValues,
            app_id: cfg.app_id,
        };
        let stream = SvStreamConfig::single(SvAsdu {
            sv_id: cfg.sv_id.clone(),
            dataset_ref: cfg.dataset_ref.clone(),
            smp_cnt: 0,
            conf_rev: cfg.conf_rev,
            refresh_time: None,
            smp_synch: cfg.smp_synch,
            smp_rate: u16::try_from(cfg.smp_rate).ok(),
            channel_count: cfg.channels,
            smp_mod: None,
        });
        let template = encode_sv_frame(&link, &stream)?;

        debug!(
            frame_len = template.len(),
            rate = cfg.smp_rate,
            channels = cfg.channels,
            "built SV packet template"
        );

        Ok(Self {
            template,
            source,
            shared,
            mode,
            smp_rate: cfg.smp_rate,
            start_time: cfg.start_time,
        })
    }

    /// Run the periodic transmission loop to completion.
    ///
    /// Blocks the calling thread; meant for a dedicated real-time thread.
    pub fn run(
        mut self,
        transport: &dyn FrameTransport,
        clock: &dyn Clock,
    ) -> EmulatorResult<ReplayReport> {
        let period_ns = 1_000_000_000u64 / self.smp_rate as u64;
        // The on-wire counter wraps at the sample rate, 16 bits at most.
        let wrap = self.smp_rate.min(65_536);
        let delay = start_delay(self.start_time, SystemTime::now());

        info!(
            delay_ms = delay.as_millis() as u64,
            rate = self.smp_rate,
            mode = ?self.mode,
            "starting SV replay"
        );

        let mut wake = clock.now_ns().saturating_add(delay.as_nanos() as u64);
        clock.sleep_until_ns(wake);

        let started_at = Utc::now();
        let t0 = Instant::now();
        let channels = self.source.channels();
        let total = channels[0].len();
        let mut index = 0usize;
        let mut tick = 0u32;
        let mut frames_sent = 0u64;

        loop {
            if self.shared.stop_requested() {
                debug!("stop requested, ending replay");
                break;
            }
            if self.mode == ReplayMode::SingleShot && self.shared.inputs.get(0) {
                info!("digital input 0 asserted, ending single-shot replay");
                break;
            }

            self.template.set_sample_count(0, (tick % wrap) as u16)?;
            for (ch, samples) in channels.iter().enumerate() {
                self.template.set_channel_value(0, ch, samples[index])?;
            }

            match transport.send(self.template.frame()) {
                Ok(()) => {
                    frames_sent += 1;
                    EmulatorStats::bump(&self.shared.stats.frames_published);
                }
                Err(e) => {
                    EmulatorStats::bump(&self.shared.stats.publish_errors);
                    warn!(error = %e, "SV frame send failed, continuing");
                }
            }

            tick = (tick + 1) % wrap;
            index += 1;
            if index >= total {
                match self.mode {
                    ReplayMode::SingleShot => break,
                    ReplayMode::Loop => index = 0,
                }
            }

            wake += period_ns;
            clock.sleep_until_ns(wake);
        }

        let report = ReplayReport {
            started_at,
            ended_at: Utc::now(),
            elapsed: t0.elapsed(),
            frames_sent,
        };
        info!(frames = report.frames_sent, "SV replay finished");
        Ok(report)
    }
}

/// Delay from `now` until transmission should begin.
///
/// No explicit start: align to the next whole second, or the one after it
/// when the boundary is less than 200 ms away (avoids starting mid-ramp).
/// Explicit start in the past clamps to now.
fn start_delay(start_time: Option<f64>, now: SystemTime) -> Duration {
    match start_time {
        Some(epoch_secs) => {
            let target = UNIX_EPOCH + Duration::from_secs_f64(epoch_secs.max(0.0));
            target.duration_since(now).unwrap_or(Duration::ZERO)
        }
        None => {
            let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
            let to_boundary = Duration::from_nanos(
                (1_000_000_000 - since_epoch.subsec_nanos() as u64) % 1_000_000_000,
            );
            if to_boundary < Duration::from_millis(200) {
                to_boundary + Duration::from_secs(1)
            } else {
                to_boundary
            }
        }
    }
}

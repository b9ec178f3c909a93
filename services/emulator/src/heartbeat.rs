//! GOOSE heartbeat publisher.
//!
//! Publishes the device's boolean state (mirrored from the digital-input
//! slots) at a fixed interval. The template is encoded once; each beat
//! patches the timestamp and the boolean entries in place. There is no
//! stNum/sqNum retransmission curve here: state and sequence numbers stay
//! at their configured values.

use crate::{EmulatorError, EmulatorResult, EmulatorStats, SharedState, MAX_DIGITAL_INPUTS};
use codec::{encode_goose_frame, GooseTemplate, LinkHeader};
use config::GoosePublisherConfig;
use network::{Clock, FrameTransport};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use types::{EtherType, GoosePdu, GooseValue, UtcTimestamp};

/// A planned GOOSE heartbeat: template built, entry count validated.
#[derive(Debug)]
pub struct GooseHeartbeat {
    template: GooseTemplate,
    shared: Arc<SharedState>,
    entries: usize,
    period_ns: u64,
}

impl GooseHeartbeat {
    pub fn plan(cfg: &GoosePublisherConfig, shared: Arc<SharedState>) -> EmulatorResult<Self> {
        if cfg.entries > MAX_DIGITAL_INPUTS {
            return Err(EmulatorError::InputIndexOutOfRange {
                index: cfg.entries - 1,
                max: MAX_DIGITAL_INPUTS,
            });
        }

        let link = LinkHeader {
            dst: cfg.dst,
            src: cfg.src,
            vlan: cfg.vlan,
            ethertype: EtherType::Goose,
            app_id: cfg.app_id,
        };
        let pdu = GoosePdu {
            gocb_ref: cfg.gocb_ref.clone(),
            time_allowed_to_live: cfg.ttl_ms,
            dataset_ref: cfg.dataset_ref.clone(),
            go_id: cfg.go_id.clone(),
            timestamp: UtcTimestamp::from_system_time(SystemTime::now()).unwrap_or_default(),
            st_num: 1,
            sq_num: 0,
            simulation: false,
            conf_rev: cfg.conf_rev,
            nds_com: false,
            entries: vec![GooseValue::Boolean(false); cfg.entries],
        };
        let template = encode_goose_frame(&link, &pdu)?;

        debug!(
            frame_len = template.len(),
            entries = cfg.entries,
            period_ms = cfg.heartbeat_ms,
            "built GOOSE heartbeat template"
        );

        Ok(Self {
            template,
            shared,
            entries: cfg.entries,
            period_ns: cfg.heartbeat_ms.saturating_mul(1_000_000).max(1),
        })
    }

    /// Publish until the stop flag is set. Returns frames sent.
    pub fn run(
        mut self,
        transport: &dyn FrameTransport,
        clock: &dyn Clock,
    ) -> EmulatorResult<u64> {
        info!(period_ns = self.period_ns, "starting GOOSE heartbeat");
        let mut wake = clock.now_ns();
        let mut frames_sent = 0u64;

        loop {
            if self.shared.stop_requested() {
                break;
            }

            self.template.set_timestamp(
                UtcTimestamp::from_system_time(SystemTime::now()).unwrap_or_default(),
            );
            for i in 0..self.entries {
                self.template.set_bool_entry(i, self.shared.inputs.get(i))?;
            }

            match transport.send(self.template.frame()) {
                Ok(()) => {
                    frames_sent += 1;
                    EmulatorStats::bump(&self.shared.stats.frames_published);
                }
                Err(e) => {
                    EmulatorStats::bump(&self.shared.stats.publish_errors);
                    warn!(error = %e, "GOOSE heartbeat send failed, continuing");
                }
            }

            wake += self.period_ns;
            clock.sleep_until_ns(wake);
        }

        info!(frames = frames_sent, "GOOSE heartbeat stopped");
        Ok(frames_sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::GoosePublisherConfig;
    use network::{Loopback, VirtualClock};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn goose_config(entries: usize) -> GoosePublisherConfig {
        GoosePublisherConfig {
            dst: "01:0C:CD:01:00:01".parse().unwrap(),
            src: "00:30:A7:00:00:01".parse().unwrap(),
            app_id: 0x0001,
            vlan: None,
            gocb_ref: "IED1LD0/LLN0$GO$gcb01".into(),
            dataset_ref: "IED1LD0/LLN0$Dataset1".into(),
            go_id: Some("IED1_GOOSE".into()),
            ttl_ms: 2000,
            conf_rev: 1,
            heartbeat_ms: 1000,
            entries,
        }
    }

    /// Requests stop after a fixed number of sleeps so the run loop ends
    /// deterministically.
    struct StopAfter {
        inner: VirtualClock,
        sleeps_left: AtomicU64,
        shared: Arc<SharedState>,
    }

    impl Clock for StopAfter {
        fn now_ns(&self) -> u64 {
            self.inner.now_ns()
        }
        fn sleep_until_ns(&self, deadline_ns: u64) {
            self.inner.sleep_until_ns(deadline_ns);
            if self.sleeps_left.fetch_sub(1, Ordering::AcqRel) <= 1 {
                self.shared.request_stop();
            }
        }
    }

    #[test]
    fn beats_mirror_digital_inputs() {
        let shared = Arc::new(SharedState::new());
        shared.inputs.set(0, true);
        shared.inputs.set(2, true);

        let heartbeat = GooseHeartbeat::plan(&goose_config(4), shared.clone()).unwrap();
        let (tx, rx) = Loopback::pair();
        let clock = StopAfter {
            inner: VirtualClock::new(),
            sleeps_left: AtomicU64::new(3),
            shared: shared.clone(),
        };

        let sent = heartbeat.run(&tx, &clock).unwrap();
        assert_eq!(sent, 3);

        use network::FrameTransport;
        let mut buf = [0u8; 2048];
        let n = rx.recv(&mut buf).unwrap().unwrap();
        let view = codec::classify_frame(&buf[..n]).unwrap();
        let goose = codec::decode_goose(view.pdu).unwrap();
        assert_eq!(goose.gocb_ref, Some("IED1LD0/LLN0$GO$gcb01".as_bytes()));
        assert_eq!(goose.bools, vec![true, false, true, false]);
    }

    #[test]
    fn too_many_entries_rejected_at_plan() {
        let err = GooseHeartbeat::plan(
            &goose_config(MAX_DIGITAL_INPUTS + 1),
            Arc::new(SharedState::new()),
        )
        .unwrap_err();
        assert!(matches!(err, EmulatorError::InputIndexOutOfRange { .. }));
    }
}

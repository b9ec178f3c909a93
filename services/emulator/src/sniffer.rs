//! GOOSE/SV frame sniffer.
//!
//! A receive loop on its own thread: filter by MAC, classify by
//! EtherType, decode just enough structure, land the results. Matched
//! GOOSE booleans go to the digital-input slots (Release stores) and the
//! trip evaluator's point table; SV samples go to an attached analysis
//! consumer. Truncated or inconsistent frames are non-fatal: logged,
//! counted, dropped, and the loop continues.
//!
//! Two states, Running and Stopped, with one transition: the shared stop
//! flag, re-checked every receive timeout (100 ms), so stopping costs at
//! most one timeout of latency.

use crate::trip::TripEvaluator;
use crate::{EmulatorError, EmulatorResult, EmulatorStats, EvalOutcome, SharedState, TripEvent,
            MAX_DIGITAL_INPUTS};
use codec::{classify_frame, decode_goose, decode_sv, CodecError, FrameView};
use config::SubscriptionConfig;
use network::FrameTransport;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use types::{EtherType, MacAddr, PointValue, TypesError};

/// Receive timeout: how often the stop flag is re-checked, not a protocol
/// timeout.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Fixed divisor applied to raw SV sample values before they reach the
/// analysis consumer.
pub const SV_SCALE_DIVISOR: f64 = 1000.0;

/// Largest frame the receive buffer accommodates (max Ethernet frame with
/// a VLAN tag, rounded up).
const RECV_BUF_SIZE: usize = 2048;

/// Consumer of decoded SV samples, attached for live analysis.
pub trait AnalysisSink: Send {
    fn process_sample(&self, stream: &str, channel: &str, value: f64, timestamp: SystemTime);
}

#[derive(Debug)]
struct MappingSlot {
    payload_index: usize,
    channel_index: usize,
    /// Data-point path the decoded boolean lands under, precomputed so
    /// the per-frame path is allocation-free.
    point_path: String,
}

/// One subscribed GOOSE stream: destination MAC, byte-exact control-block
/// reference, and payload-to-input mappings.
#[derive(Debug)]
pub struct Subscription {
    dst: MacAddr,
    gocb_ref: Vec<u8>,
    mappings: Vec<MappingSlot>,
}

impl Subscription {
    /// Build a subscription, validating every mapped input slot exists.
    pub fn new(
        dst: MacAddr,
        gocb_ref: &str,
        mappings: &[(usize, usize)],
    ) -> EmulatorResult<Self> {
        for &(_, channel_index) in mappings {
            if channel_index >= MAX_DIGITAL_INPUTS {
                return Err(EmulatorError::InputIndexOutOfRange {
                    index: channel_index,
                    max: MAX_DIGITAL_INPUTS,
                });
            }
        }
        Ok(Self {
            dst,
            gocb_ref: gocb_ref.as_bytes().to_vec(),
            mappings: mappings
                .iter()
                .map(|&(payload_index, channel_index)| MappingSlot {
                    payload_index,
                    channel_index,
                    point_path: format!("di/{channel_index}"),
                })
                .collect(),
        })
    }

    pub fn from_config(cfg: &SubscriptionConfig) -> EmulatorResult<Self> {
        Self::new(cfg.dst, &cfg.gocb_ref, &cfg.mappings)
    }
}

struct AnalysisAttachment {
    src: MacAddr,
    stream_label: String,
    sink: Box<dyn AnalysisSink>,
}

/// The receive-side half of the virtual IED.
pub struct Sniffer {
    subscriptions: Vec<Subscription>,
    shared: Arc<SharedState>,
    evaluator: TripEvaluator,
    analysis: Option<AnalysisAttachment>,
    channel_labels: Vec<String>,
}

impl Sniffer {
    pub fn new(
        subscriptions: Vec<Subscription>,
        evaluator: TripEvaluator,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            subscriptions,
            shared,
            evaluator,
            analysis: None,
            channel_labels: Vec::new(),
        }
    }

    /// Attach a live analysis consumer for SV frames from `src`.
    pub fn with_analysis(
        mut self,
        src: MacAddr,
        stream_label: impl Into<String>,
        sink: Box<dyn AnalysisSink>,
    ) -> Self {
        self.analysis = Some(AnalysisAttachment {
            src,
            stream_label: stream_label.into(),
            sink,
        });
        self
    }

    /// Rule and point table, for registration before the loop starts.
    pub fn evaluator_mut(&mut self) -> &mut TripEvaluator {
        &mut self.evaluator
    }

    /// Run the receive loop until the stop flag is set.
    pub fn run(&mut self, transport: &dyn FrameTransport) -> EmulatorResult<()> {
        transport.set_recv_timeout(RECV_TIMEOUT)?;
        // The one receive buffer; no per-frame allocation after this.
        let mut buf = vec![0u8; RECV_BUF_SIZE];

        info!(
            subscriptions = self.subscriptions.len(),
            analysis = self.analysis.is_some(),
            "sniffer running"
        );

        loop {
            if self.shared.stop_requested() {
                break;
            }
            match transport.recv(&mut buf) {
                Ok(Some(n)) => self.handle_frame(&buf[..n], SystemTime::now()),
                Ok(None) => {} // timeout: loop around to the stop check
                Err(e) => {
                    warn!(error = %e, "receive failed, continuing");
                }
            }
        }

        info!("sniffer stopped");
        Ok(())
    }

    fn handle_frame(&mut self, frame: &[u8], captured_at: SystemTime) {
        EmulatorStats::bump(&self.shared.stats.frames_seen);

        if frame.len() < 12 {
            EmulatorStats::bump(&self.shared.stats.parse_errors);
            debug!(len = frame.len(), "runt frame");
            return;
        }

        // Cheap MAC filter before any TLV work: destination against the
        // subscriptions, source against the analyzed stream.
        let dst = &frame[0..6];
        let src = &frame[6..12];
        let sub_match = self.subscriptions.iter().any(|s| s.dst.octets() == dst);
        let analysis_match = self
            .analysis
            .as_ref()
            .map(|a| a.src.octets() == src)
            .unwrap_or(false);
        if !sub_match && !analysis_match {
            EmulatorStats::bump(&self.shared.stats.frames_dropped);
            return;
        }

        let view = match classify_frame(frame) {
            Ok(view) => view,
            // Foreign EtherType is ordinary non-61850 traffic, not damage.
            Err(CodecError::Types(TypesError::UnsupportedEtherType { .. })) => {
                EmulatorStats::bump(&self.shared.stats.frames_dropped);
                return;
            }
            Err(e) => {
                EmulatorStats::bump(&self.shared.stats.parse_errors);
                debug!(error = %e, "frame classification failed");
                return;
            }
        };

        match view.ethertype {
            EtherType::Goose if sub_match => self.handle_goose(&view),
            EtherType::SampledValues if analysis_match => self.handle_sv(&view, captured_at),
            _ => {
                EmulatorStats::bump(&self.shared.stats.frames_dropped);
            }
        }
    }

    fn handle_goose(&mut self, view: &FrameView<'_>) {
        let goose = match decode_goose(view.pdu) {
            Ok(goose) => goose,
            Err(e) => {
                EmulatorStats::bump(&self.shared.stats.parse_errors);
                debug!(error = %e, "GOOSE decode failed");
                return;
            }
        };

        let Some(gocb_ref) = goose.gocb_ref else {
            EmulatorStats::bump(&self.shared.stats.frames_dropped);
            return;
        };

        let Some(subscription) = self
            .subscriptions
            .iter()
            .find(|s| s.dst == view.dst && s.gocb_ref == gocb_ref)
        else {
            // Not one of ours: silent drop, not an error.
            EmulatorStats::bump(&self.shared.stats.frames_dropped);
            return;
        };

        for slot in &subscription.mappings {
            let Some(&value) = goose.bools.get(slot.payload_index) else {
                EmulatorStats::bump(&self.shared.stats.parse_errors);
                warn!(
                    payload_index = slot.payload_index,
                    decoded = goose.bools.len(),
                    "subscription maps a dataset index the frame does not carry"
                );
                return;
            };
            self.shared.inputs.set(slot.channel_index, value);
            self.evaluator
                .update_point(&slot.point_path, PointValue::Bool(value));
        }
        EmulatorStats::bump(&self.shared.stats.frames_matched);

        EmulatorStats::bump(&self.shared.stats.evaluations);
        match self.evaluator.evaluate() {
            EvalOutcome::Triggered { rule, message } => {
                // Record the transition only; a triggered rule stays
                // triggered until its inputs change.
                if !self.shared.trip_active() {
                    info!(rule = %rule, "trip");
                    self.shared.record_trip(TripEvent {
                        rule,
                        message,
                        at: chrono::Utc::now(),
                    });
                }
            }
            EvalOutcome::Clear => {}
            EvalOutcome::Error { rule, message } => {
                debug!(rule = %rule, message = %message, "rule evaluation error");
            }
        }
    }

    fn handle_sv(&mut self, view: &FrameView<'_>, captured_at: SystemTime) {
        let Some(attachment) = &self.analysis else {
            return;
        };

        let sv = match decode_sv(view.pdu) {
            Ok(sv) => sv,
            Err(e) => {
                EmulatorStats::bump(&self.shared.stats.parse_errors);
                debug!(error = %e, "SV decode failed");
                return;
            }
        };

        EmulatorStats::bump(&self.shared.stats.frames_matched);
        for asdu in &sv.asdus {
            for (i, &raw) in asdu.samples.iter().enumerate() {
                // Label cache grows to the widest frame seen, then stays.
                while self.channel_labels.len() <= i {
                    let n = self.channel_labels.len();
                    self.channel_labels.push(format!("ch{n}"));
                }
                attachment.sink.process_sample(
                    &attachment.stream_label,
                    &self.channel_labels[i],
                    raw as f64 / SV_SCALE_DIVISOR,
                    captured_at,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{encode_goose_frame, encode_sv_frame, LinkHeader};
    use parking_lot::Mutex;
    use types::{GoosePdu, GooseValue, SmpSynch, SvAsdu, SvStreamConfig, UtcTimestamp};

    const GOCB: &str = "IED2LD0/LLN0$GO$gcb01";

    fn goose_frame(dst: &str, bools: &[bool]) -> Vec<u8> {
        let link = LinkHeader {
            dst: dst.parse().unwrap(),
            src: "00:30:A7:00:00:02".parse().unwrap(),
            vlan: None,
            ethertype: EtherType::Goose,
            app_id: 0x0001,
        };
        let pdu = GoosePdu {
            gocb_ref: GOCB.into(),
            time_allowed_to_live: 2000,
            dataset_ref: "IED2LD0/LLN0$Trips".into(),
            go_id: None,
            timestamp: UtcTimestamp::new(1_722_000_000, 0),
            st_num: 1,
            sq_num: 0,
            simulation: false,
            conf_rev: 1,
            nds_com: false,
            entries: bools.iter().map(|&b| GooseValue::Boolean(b)).collect(),
        };
        encode_goose_frame(&link, &pdu).unwrap().frame().to_vec()
    }

    fn sniffer_for(dst: &str, mappings: &[(usize, usize)]) -> (Sniffer, Arc<SharedState>) {
        let shared = Arc::new(SharedState::new());
        let subscription =
            Subscription::new(dst.parse().unwrap(), GOCB, mappings).unwrap();
        let mut evaluator = TripEvaluator::new();
        evaluator.add_rule("trip_on_di0", "di/0 == true").unwrap();
        (
            Sniffer::new(vec![subscription], evaluator, shared.clone()),
            shared,
        )
    }

    #[test]
    fn matched_goose_updates_inputs_and_trips() {
        let dst = "01:0C:CD:01:00:05";
        let (mut sniffer, shared) = sniffer_for(dst, &[(0, 0), (2, 1)]);

        sniffer.handle_frame(&goose_frame(dst, &[true, false, true]), SystemTime::now());

        assert!(shared.inputs.get(0));
        assert!(shared.inputs.get(1));
        assert!(shared.trip_active());
        let events = shared.trip_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule, "trip_on_di0");
        assert_eq!(EmulatorStats::get(&shared.stats.frames_matched), 1);
    }

    #[test]
    fn trip_event_recorded_once_per_transition() {
        let dst = "01:0C:CD:01:00:05";
        let (mut sniffer, shared) = sniffer_for(dst, &[(0, 0)]);

        for _ in 0..5 {
            sniffer.handle_frame(&goose_frame(dst, &[true]), SystemTime::now());
        }
        assert_eq!(shared.trip_events().len(), 1);
        assert_eq!(EmulatorStats::get(&shared.stats.evaluations), 5);
    }

    #[test]
    fn unmatched_mac_is_a_silent_drop() {
        let (mut sniffer, shared) = sniffer_for("01:0C:CD:01:00:05", &[(0, 0)]);

        sniffer.handle_frame(
            &goose_frame("01:0C:CD:01:00:99", &[true]),
            SystemTime::now(),
        );

        assert!(!shared.trip_active());
        assert_eq!(EmulatorStats::get(&shared.stats.frames_dropped), 1);
        assert_eq!(EmulatorStats::get(&shared.stats.parse_errors), 0);
    }

    #[test]
    fn unmatched_gocb_ref_is_a_silent_drop() {
        let dst = "01:0C:CD:01:00:05";
        let shared = Arc::new(SharedState::new());
        let subscription =
            Subscription::new(dst.parse().unwrap(), "OTHER/LLN0$GO$gcb09", &[(0, 0)]).unwrap();
        let mut sniffer = Sniffer::new(vec![subscription], TripEvaluator::new(), shared.clone());

        sniffer.handle_frame(&goose_frame(dst, &[true]), SystemTime::now());

        assert!(!shared.inputs.get(0));
        assert_eq!(EmulatorStats::get(&shared.stats.frames_dropped), 1);
    }

    #[test]
    fn payload_index_beyond_dataset_is_a_parse_error() {
        let dst = "01:0C:CD:01:00:05";
        let (mut sniffer, shared) = sniffer_for(dst, &[(7, 0)]);

        sniffer.handle_frame(&goose_frame(dst, &[true, false]), SystemTime::now());

        assert_eq!(EmulatorStats::get(&shared.stats.parse_errors), 1);
        assert!(!shared.inputs.get(0));
        assert_eq!(EmulatorStats::get(&shared.stats.frames_matched), 0);
    }

    #[test]
    fn truncated_frame_is_counted_not_fatal() {
        let dst = "01:0C:CD:01:00:05";
        let (mut sniffer, shared) = sniffer_for(dst, &[(0, 0)]);

        let frame = goose_frame(dst, &[true]);
        sniffer.handle_frame(&frame[..frame.len() - 3], SystemTime::now());

        assert_eq!(EmulatorStats::get(&shared.stats.parse_errors), 1);
        assert!(!shared.trip_active());
    }

    #[test]
    fn out_of_range_channel_index_rejected_at_subscription() {
        let err = Subscription::new(
            "01:0C:CD:01:00:05".parse().unwrap(),
            GOCB,
            &[(0, MAX_DIGITAL_INPUTS)],
        )
        .unwrap_err();
        assert!(matches!(err, EmulatorError::InputIndexOutOfRange { .. }));
    }

    #[derive(Default)]
    struct CollectingSink {
        samples: Mutex<Vec<(String, String, f64)>>,
    }

    impl AnalysisSink for Arc<CollectingSink> {
        fn process_sample(&self, stream: &str, channel: &str, value: f64, _timestamp: SystemTime) {
            self.samples
                .lock()
                .push((stream.to_string(), channel.to_string(), value));
        }
    }

    #[test]
    fn sv_samples_reach_the_analysis_sink_scaled() {
        let src: MacAddr = "00:30:A7:00:00:55".parse().unwrap();
        let link = LinkHeader {
            dst: "01:0C:CD:04:00:01".parse().unwrap(),
            src,
            vlan: None,
            ethertype: EtherType::SampledValues,
            app_id: 0x4000,
        };
        let mut template = encode_sv_frame(
            &link,
            &SvStreamConfig::single(SvAsdu {
                sv_id: "MU01".into(),
                dataset_ref: None,
                smp_cnt: 0,
                conf_rev: 1,
                refresh_time: None,
                smp_synch: SmpSynch::Local,
                smp_rate: None,
                channel_count: 2,
                smp_mod: None,
            }),
        )
        .unwrap();
        template.set_channel_value(0, 0, 1500).unwrap();
        template.set_channel_value(0, 1, -2500).unwrap();

        let sink = Arc::new(CollectingSink::default());
        let shared = Arc::new(SharedState::new());
        let mut sniffer = Sniffer::new(Vec::new(), TripEvaluator::new(), shared.clone())
            .with_analysis(src, "stream-A", Box::new(sink.clone()));

        sniffer.handle_frame(template.frame(), SystemTime::now());

        let samples = sink.samples.lock();
        assert_eq!(
            *samples,
            vec![
                ("stream-A".to_string(), "ch0".to_string(), 1.5),
                ("stream-A".to_string(), "ch1".to_string(), -2.5),
            ]
        );
        assert_eq!(EmulatorStats::get(&shared.stats.frames_matched), 1);
    }

    #[test]
    fn run_loop_honors_the_stop_flag() {
        use network::Loopback;

        let (_tx, rx) = Loopback::pair();
        let (mut sniffer, shared) = sniffer_for("01:0C:CD:01:00:05", &[(0, 0)]);

        let stopper = shared.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stopper.request_stop();
        });

        // Returns within roughly one receive timeout of the stop request.
        let t0 = std::time::Instant::now();
        sniffer.run(&rx).unwrap();
        assert!(t0.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}

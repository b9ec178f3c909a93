//! End-to-end: frames leave one side of a loopback wire exactly as the
//! publisher built them and arrive at a live sniffer, driving analysis
//! and trip logic the way a real capture would.

use codec::{encode_goose_frame, LinkHeader};
use config::{ReplayModeConfig, SvPublisherConfig, SvSourceConfig};
use ied_emulator::{
    AnalysisSink, EmulatorStats, GooseHeartbeat, MemorySampleSource, SharedState, Sniffer,
    Subscription, SvReplay, TripEvaluator,
};
use network::{Loopback, MonotonicClock, VirtualClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use types::{EtherType, GoosePdu, GooseValue, MacAddr, SmpSynch, UtcTimestamp};

const PUB_SRC: &str = "00:30:A7:00:00:01";

fn sv_config(mode: ReplayModeConfig, channels: usize, smp_rate: u32) -> SvPublisherConfig {
    SvPublisherConfig {
        dst: "01:0C:CD:04:00:01".parse().unwrap(),
        src: PUB_SRC.parse().unwrap(),
        app_id: 0x4000,
        vlan: None,
        sv_id: "MU01".into(),
        dataset_ref: None,
        conf_rev: 1,
        smp_rate,
        channels,
        smp_synch: SmpSynch::Local,
        mode,
        start_time: Some(0.0),
        source: SvSourceConfig {
            amplitude: 1000,
            frequency_hz: 50.0,
            seconds: 1.0,
        },
    }
}

#[derive(Default)]
struct CollectingSink {
    samples: Mutex<Vec<(String, f64)>>,
}

/// Newtype so the sink can be shared with the sniffer (`Box<dyn
/// AnalysisSink>`) while the test still holds an `Arc` to read results.
/// A direct `impl AnalysisSink for Arc<CollectingSink>` would violate the
/// orphan rule here, since both the trait and `Arc` are foreign to this crate.
struct SharedSink(Arc<CollectingSink>);

impl AnalysisSink for SharedSink {
    fn process_sample(&self, _stream: &str, channel: &str, value: f64, _timestamp: SystemTime) {
        self.0.samples.lock().push((channel.to_string(), value));
    }
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let t0 = Instant::now();
    while t0.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

/// SV frames published on one end of the wire arrive at the analysis
/// sink scaled, in order, one entry per channel per frame.
#[test]
fn replayed_sv_frames_reach_the_analysis_sink() {
    let frames = 480usize;
    let channels = 4usize;
    let channel_data: Vec<Vec<i32>> = (0..channels)
        .map(|ch| (0..frames).map(|i| (i * 10 + ch) as i32).collect())
        .collect();

    let publisher_shared = Arc::new(SharedState::new());
    let replay = SvReplay::plan(
        &sv_config(ReplayModeConfig::SingleShot, channels, 4800),
        Box::new(MemorySampleSource::new(4800, channel_data).unwrap()),
        publisher_shared,
    )
    .unwrap();

    let (pub_end, sniff_end) = Loopback::pair();

    let sink = Arc::new(CollectingSink::default());
    let sniffer_shared = Arc::new(SharedState::new());
    let mut sniffer = Sniffer::new(Vec::new(), TripEvaluator::new(), sniffer_shared.clone())
        .with_analysis(PUB_SRC.parse().unwrap(), "MU01", Box::new(SharedSink(sink.clone())));

    let sniffer_thread = std::thread::spawn(move || {
        sniffer.run(&sniff_end).unwrap();
        sniffer
    });

    // The virtual clock collapses the 100 ms schedule to nothing.
    let report = replay.run(&pub_end, &VirtualClock::new()).unwrap();
    assert_eq!(report.frames_sent, frames as u64);

    assert!(
        wait_until(Duration::from_secs(5), || {
            EmulatorStats::get(&sniffer_shared.stats.frames_matched) == frames as u64
        }),
        "sniffer saw {} of {frames} frames",
        EmulatorStats::get(&sniffer_shared.stats.frames_matched),
    );
    sniffer_shared.request_stop();
    sniffer_thread.join().unwrap();

    let samples = sink.samples.lock();
    assert_eq!(samples.len(), frames * channels);
    // First frame: one sample per channel, raw / 1000.
    assert_eq!(samples[0], ("ch0".to_string(), 0.0));
    assert_eq!(samples[1], ("ch1".to_string(), 0.001));
    // Last frame, last channel: (479*10 + 3) / 1000.
    assert_eq!(
        samples[frames * channels - 1],
        (format!("ch{}", channels - 1), 4.793)
    );
    assert_eq!(
        EmulatorStats::get(&sniffer_shared.stats.parse_errors),
        0,
        "well-formed frames must not count as parse errors"
    );
}

/// An in-band GOOSE trip ends a single-shot replay: remote frame →
/// sniffer → digital input 0 → publisher stops mid-buffer.
#[test]
fn goose_trip_stops_a_running_replay() {
    let shared = Arc::new(SharedState::new());

    // Sniffer subscribed to the remote IED's trip dataset; payload entry
    // 0 lands in digital input 0, which the single-shot publisher polls.
    let remote_dst: MacAddr = "01:0C:CD:01:00:07".parse().unwrap();
    let gocb = "REMLD0/LLN0$GO$gcb01";
    let subscription = Subscription::new(remote_dst, gocb, &[(0, 0)]).unwrap();
    let mut evaluator = TripEvaluator::new();
    evaluator.add_rule("remote_trip", "di/0 == true").unwrap();
    let mut sniffer = Sniffer::new(vec![subscription], evaluator, shared.clone());

    let (goose_tx, goose_rx) = Loopback::pair();
    let sniffer_thread = std::thread::spawn(move || sniffer.run(&goose_rx).unwrap());

    // Ten seconds of samples; the trip must cut this short.
    let total = 10_000usize;
    let replay = SvReplay::plan(
        &sv_config(ReplayModeConfig::SingleShot, 1, 1000),
        Box::new(MemorySampleSource::new(1000, vec![vec![0i32; total]]).unwrap()),
        shared.clone(),
    )
    .unwrap();
    let (pub_end, _drain) = Loopback::pair();
    let publisher_thread = std::thread::spawn(move || replay.run(&pub_end, &MonotonicClock));

    // Let the replay get going, then publish the remote trip.
    std::thread::sleep(Duration::from_millis(150));
    let trip_frame = encode_goose_frame(
        &LinkHeader {
            dst: remote_dst,
            src: "00:30:A7:00:00:99".parse().unwrap(),
            vlan: None,
            ethertype: EtherType::Goose,
            app_id: 0x0007,
        },
        &GoosePdu {
            gocb_ref: gocb.into(),
            time_allowed_to_live: 2000,
            dataset_ref: "REMLD0/LLN0$Trips".into(),
            go_id: None,
            timestamp: UtcTimestamp::new(1_722_000_000, 0),
            st_num: 2,
            sq_num: 0,
            simulation: false,
            conf_rev: 1,
            nds_com: false,
            entries: vec![GooseValue::Boolean(true)],
        },
    )
    .unwrap();
    use network::FrameTransport;
    goose_tx.send(trip_frame.frame()).unwrap();

    let report = publisher_thread
        .join()
        .expect("publisher thread panicked")
        .unwrap();
    assert!(
        report.frames_sent < total as u64,
        "trip should stop the replay early, sent {}",
        report.frames_sent
    );
    assert!(shared.trip_active());
    let events = shared.trip_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rule, "remote_trip");

    shared.request_stop();
    sniffer_thread.join().unwrap();
}

/// Two emulated devices: A's heartbeat mirrors its digital inputs onto
/// the wire, B's subscription lands them in B's inputs and trips B's
/// rule.
#[test]
fn heartbeat_state_crosses_devices() {
    let shared_a = Arc::new(SharedState::new());
    let shared_b = Arc::new(SharedState::new());

    shared_a.inputs.set(1, true);

    let goose_cfg = config::GoosePublisherConfig {
        dst: "01:0C:CD:01:00:11".parse().unwrap(),
        src: "00:30:A7:00:00:0A".parse().unwrap(),
        app_id: 0x0011,
        vlan: None,
        gocb_ref: "IEDALD0/LLN0$GO$gcb01".into(),
        dataset_ref: "IEDALD0/LLN0$Status".into(),
        go_id: Some("IEDA".into()),
        ttl_ms: 100,
        conf_rev: 1,
        heartbeat_ms: 5,
        entries: 4,
    };
    let heartbeat = GooseHeartbeat::plan(&goose_cfg, shared_a.clone()).unwrap();

    // A's dataset entry 1 → B's digital input 0.
    let subscription = Subscription::new(
        "01:0C:CD:01:00:11".parse().unwrap(),
        "IEDALD0/LLN0$GO$gcb01",
        &[(1, 0)],
    )
    .unwrap();
    let mut evaluator = TripEvaluator::new();
    evaluator.add_rule("neighbor_up", "di/0 == true").unwrap();
    let mut sniffer_b = Sniffer::new(vec![subscription], evaluator, shared_b.clone());

    let (wire_a, wire_b) = Loopback::pair();
    let heartbeat_thread = std::thread::spawn(move || heartbeat.run(&wire_a, &MonotonicClock));
    let sniffer_thread = std::thread::spawn(move || sniffer_b.run(&wire_b).unwrap());

    assert!(
        wait_until(Duration::from_secs(2), || shared_b.trip_active()),
        "B never saw A's heartbeat"
    );
    assert!(shared_b.inputs.get(0));

    shared_a.request_stop();
    shared_b.request_stop();
    let beats = heartbeat_thread.join().unwrap().unwrap();
    assert!(beats >= 1);
    sniffer_thread.join().unwrap();
}

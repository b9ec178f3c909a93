//! Full-frame encode cost: paid once per stream start, not per tick, but
//! worth keeping visible so template rebuilds stay cheap.

use codec::{encode_goose_frame, encode_sv_frame, LinkHeader};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use types::{EtherType, GoosePdu, GooseValue, SmpSynch, SvAsdu, SvStreamConfig, UtcTimestamp};

fn bench_encode(c: &mut Criterion) {
    let sv_link = LinkHeader {
        dst: "01:0C:CD:04:00:01".parse().unwrap(),
        src: "00:30:A7:00:00:01".parse().unwrap(),
        vlan: None,
        ethertype: EtherType::SampledValues,
        app_id: 0x4000,
    };
    let sv_cfg = SvStreamConfig::single(SvAsdu {
        sv_id: "MU01".into(),
        dataset_ref: None,
        smp_cnt: 0,
        conf_rev: 1,
        refresh_time: None,
        smp_synch: SmpSynch::Local,
        smp_rate: Some(4800),
        channel_count: 8,
        smp_mod: None,
    });

    let goose_link = LinkHeader {
        dst: "01:0C:CD:01:00:01".parse().unwrap(),
        src: "00:30:A7:00:00:01".parse().unwrap(),
        vlan: None,
        ethertype: EtherType::Goose,
        app_id: 0x0001,
    };
    let goose_pdu = GoosePdu {
        gocb_ref: "IED1LD0/LLN0$GO$gcb01".into(),
        time_allowed_to_live: 2000,
        dataset_ref: "IED1LD0/LLN0$Dataset1".into(),
        go_id: Some("IED1_GOOSE".into()),
        timestamp: UtcTimestamp::new(1_722_000_000, 0),
        st_num: 1,
        sq_num: 0,
        simulation: false,
        conf_rev: 1,
        nds_com: false,
        entries: (0..16).map(|i| GooseValue::Boolean(i % 2 == 0)).collect(),
    };

    c.bench_function("encode_sv_frame_8ch", |b| {
        b.iter(|| black_box(encode_sv_frame(&sv_link, &sv_cfg).unwrap().len()))
    });
    c.bench_function("encode_goose_frame_16bool", |b| {
        b.iter(|| black_box(encode_goose_frame(&goose_link, &goose_pdu).unwrap().len()))
    });
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);

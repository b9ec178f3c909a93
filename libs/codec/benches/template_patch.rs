//! Per-tick patch cost: the publisher's entire hot-path encode work.

use codec::{encode_sv_frame, LinkHeader};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use types::{EtherType, SmpSynch, SvAsdu, SvStreamConfig};

fn sv_template() -> codec::SvTemplate {
    let link = LinkHeader {
        dst: "01:0C:CD:04:00:01".parse().unwrap(),
        src: "00:30:A7:00:00:01".parse().unwrap(),
        vlan: None,
        ethertype: EtherType::SampledValues,
        app_id: 0x4000,
    };
    let asdu = SvAsdu {
        sv_id: "MU01".into(),
        dataset_ref: None,
        smp_cnt: 0,
        conf_rev: 1,
        refresh_time: None,
        smp_synch: SmpSynch::Local,
        smp_rate: Some(4800),
        channel_count: 8,
        smp_mod: None,
    };
    encode_sv_frame(&link, &SvStreamConfig::single(asdu)).unwrap()
}

fn bench_patch_tick(c: &mut Criterion) {
    let mut template = sv_template();
    let mut tick = 0u32;

    c.bench_function("patch_counter_and_8_channels", |b| {
        b.iter(|| {
            template
                .set_sample_count(0, (tick % 4800) as u16)
                .unwrap();
            for ch in 0..8 {
                template
                    .set_channel_value(0, ch, black_box(tick as i32))
                    .unwrap();
            }
            tick = tick.wrapping_add(1);
            black_box(template.frame().len())
        })
    });
}

criterion_group!(benches, bench_patch_tick);
criterion_main!(benches);

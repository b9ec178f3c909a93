//! Sampled-Value frame encoding with per-ASDU offset indexing.
//!
//! The publisher's entire per-tick cost is two patches into the
//! [`SvTemplate`] produced here: the 2-byte sample counter and each
//! channel's 4-byte value. Both live at offsets recorded during the single
//! encode pass, so patching is O(1) per field with no allocation and no
//! re-encoding.
//!
//! ASDU field order is fixed by tag number:
//!
//! ```text
//! 0x80 svID    0x81 datSet     0x82 smpCnt (2B)   0x83 confRev (4B)
//! 0x84 refrTm  0x85 smpSynch   0x86 smpRate (2B)  0x87 samples (8B/ch)
//! 0x88 smpMod (2B)
//! ```

use crate::ber::{encode_length, encoded_length_size, unsigned_bytes, write_tlv};
use crate::ethernet::LinkHeader;
use crate::{CodecError, CodecResult, TAG_SV_PDU};
use types::sv::SAMPLE_ENTRY_SIZE;
use types::{SvAsdu, SvStreamConfig};

/// Tag of the sequence-of-samples block inside an ASDU.
pub const TAG_SV_SAMPLES: u8 = 0x87;

/// Patchable field offsets for one ASDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvAsduOffsets {
    /// Offset of the 2-byte big-endian sample counter value.
    pub smp_cnt: usize,
    /// Offset of the first byte of the sample block.
    pub samples: usize,
    pub channel_count: usize,
}

/// Offset index for a complete SV frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvOffsets {
    pub asdus: Vec<SvAsduOffsets>,
    /// Byte distance between consecutive ASDUs' fields when every ASDU
    /// encodes to the same size; `None` for heterogeneous ASDUs.
    pub stride: Option<usize>,
}

/// An encoded SV frame plus its offset index.
///
/// Once built, the buffer's total length never changes; only the sample
/// counter and channel values are overwritten per tick.
#[derive(Debug, Clone)]
pub struct SvTemplate {
    buf: Vec<u8>,
    offsets: SvOffsets,
}

impl SvTemplate {
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn offsets(&self) -> &SvOffsets {
        &self.offsets
    }

    pub fn num_asdus(&self) -> usize {
        self.offsets.asdus.len()
    }

    /// Overwrite the sample counter of one ASDU, big-endian.
    #[inline]
    pub fn set_sample_count(&mut self, asdu: usize, count: u16) -> CodecResult<()> {
        let off = self.asdu_offsets(asdu)?.smp_cnt;
        self.buf[off..off + 2].copy_from_slice(&count.to_be_bytes());
        Ok(())
    }

    /// Overwrite one channel's 4-byte big-endian sample value. The
    /// adjacent quality word stays zero-filled.
    #[inline]
    pub fn set_channel_value(&mut self, asdu: usize, channel: usize, value: i32) -> CodecResult<()> {
        let offsets = self.asdu_offsets(asdu)?;
        if channel >= offsets.channel_count {
            return Err(CodecError::FieldOutOfRange {
                context: "channel",
                index: channel,
                len: offsets.channel_count,
            });
        }
        let off = offsets.samples + channel * SAMPLE_ENTRY_SIZE;
        self.buf[off..off + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    #[inline]
    fn asdu_offsets(&self, asdu: usize) -> CodecResult<SvAsduOffsets> {
        self.offsets
            .asdus
            .get(asdu)
            .copied()
            .ok_or(CodecError::FieldOutOfRange {
                context: "ASDU",
                index: asdu,
                len: self.offsets.asdus.len(),
            })
    }
}

/// Encode one ASDU body, returning `(bytes, smp_cnt offset, samples
/// offset)` with offsets relative to the body start.
fn encode_asdu(asdu: &SvAsdu) -> CodecResult<(Vec<u8>, usize, usize)> {
    if asdu.channel_count == 0 {
        return Err(CodecError::InvalidStream {
            reason: "ASDU has zero channels",
        });
    }

    let mut body = Vec::with_capacity(64 + asdu.channel_count * SAMPLE_ENTRY_SIZE);

    write_tlv(0x80, asdu.sv_id.as_bytes(), &mut body)?;
    if let Some(dataset) = &asdu.dataset_ref {
        write_tlv(0x81, dataset.as_bytes(), &mut body)?;
    }

    body.push(0x82);
    encode_length(2, &mut body)?;
    let smp_cnt_rel = body.len();
    body.extend_from_slice(&asdu.smp_cnt.to_be_bytes());

    body.push(0x83);
    encode_length(4, &mut body)?;
    body.extend_from_slice(&asdu.conf_rev.to_be_bytes());

    if let Some(refr_tm) = &asdu.refresh_time {
        body.push(0x84);
        encode_length(8, &mut body)?;
        body.extend_from_slice(&refr_tm.seconds.to_be_bytes());
        body.extend_from_slice(&refr_tm.fraction.to_be_bytes());
    }

    write_tlv(0x85, &[u8::from(asdu.smp_synch)], &mut body)?;

    if let Some(rate) = asdu.smp_rate {
        body.push(0x86);
        encode_length(2, &mut body)?;
        body.extend_from_slice(&rate.to_be_bytes());
    }

    // Sample block: value + quality per channel, quality zero-filled.
    let block_len = asdu.channel_count * SAMPLE_ENTRY_SIZE;
    body.push(TAG_SV_SAMPLES);
    encode_length(block_len, &mut body)?;
    let samples_rel = body.len();
    body.resize(body.len() + block_len, 0);

    if let Some(smp_mod) = asdu.smp_mod {
        body.push(0x88);
        encode_length(2, &mut body)?;
        body.extend_from_slice(&smp_mod.to_be_bytes());
    }

    Ok((body, smp_cnt_rel, samples_rel))
}

/// Encode a complete SV frame, producing the template the replay engine
/// patches per tick.
pub fn encode_sv_frame(link: &LinkHeader, cfg: &SvStreamConfig) -> CodecResult<SvTemplate> {
    if cfg.asdus.is_empty() {
        return Err(CodecError::InvalidStream {
            reason: "stream has no ASDUs",
        });
    }

    // Sequence of ASDUs, each wrapped in tag 0x30.
    let mut seq = Vec::new();
    let mut rel_offsets = Vec::with_capacity(cfg.asdus.len());
    for asdu in &cfg.asdus {
        let (asdu_body, smp_cnt_rel, samples_rel) = encode_asdu(asdu)?;
        seq.push(0x30);
        encode_length(asdu_body.len(), &mut seq)?;
        let base = seq.len();
        rel_offsets.push(SvAsduOffsets {
            smp_cnt: base + smp_cnt_rel,
            samples: base + samples_rel,
            channel_count: asdu.channel_count,
        });
        seq.extend_from_slice(&asdu_body);
    }

    let mut body = Vec::with_capacity(8 + seq.len());
    write_tlv(0x80, &unsigned_bytes(cfg.asdus.len() as u64), &mut body)?;
    if let Some(security) = &cfg.security {
        write_tlv(0x81, security, &mut body)?;
    }
    body.push(0xA2);
    encode_length(seq.len(), &mut body)?;
    let seq_base = body.len();
    body.extend_from_slice(&seq);

    let prefix = link.encoded_size() + 1 + encoded_length_size(body.len())?;
    let mut buf = Vec::with_capacity(prefix + body.len());
    link.encode_into(1 + encoded_length_size(body.len())? + body.len(), &mut buf)?;
    buf.push(TAG_SV_PDU);
    encode_length(body.len(), &mut buf)?;
    debug_assert_eq!(buf.len(), prefix);
    buf.extend_from_slice(&body);

    let asdus: Vec<SvAsduOffsets> = rel_offsets
        .into_iter()
        .map(|o| SvAsduOffsets {
            smp_cnt: prefix + seq_base + o.smp_cnt,
            samples: prefix + seq_base + o.samples,
            channel_count: o.channel_count,
        })
        .collect();

    let stride = uniform_stride(&asdus);

    Ok(SvTemplate {
        buf,
        offsets: SvOffsets { asdus, stride },
    })
}

fn uniform_stride(asdus: &[SvAsduOffsets]) -> Option<usize> {
    if asdus.len() < 2 {
        return None;
    }
    let stride = asdus[1].smp_cnt - asdus[0].smp_cnt;
    let uniform = asdus
        .windows(2)
        .all(|w| w[1].smp_cnt - w[0].smp_cnt == stride && w[1].samples - w[0].samples == stride);
    uniform.then_some(stride)
}

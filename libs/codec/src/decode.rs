//! Defensive decoding of received GOOSE and SV frames.
//!
//! The walk validates, before every dereference, that tag, length prefix,
//! and value fit inside the remaining received bytes. A violation aborts
//! decoding of that frame with an error (the caller logs and drops it)
//! and never indexes past the buffer. Feeding any truncation of a valid
//! frame through these functions either fully decodes or returns
//! `CodecError::Truncated`; it cannot panic.

use crate::ber::BerReader;
use crate::ethernet::APDU_HEADER_SIZE;
use crate::{CodecError, CodecResult, TAG_GOOSE_PDU, TAG_SV_PDU};
use tracing::trace;
use types::goose::TAG_DATA_BOOLEAN;
use types::vlan::TPID;
use types::{EtherType, MacAddr, VlanTag};

/// Link-layer view of a received frame, PDU bytes still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub vlan: Option<VlanTag>,
    pub ethertype: EtherType,
    pub app_id: u16,
    /// The BER-TLV PDU: outer tag through declared end.
    pub pdu: &'a [u8],
}

/// Classify a raw frame: addresses, optional 802.1Q tag (shifting the
/// payload by 4 bytes), EtherType, APPID, and the PDU slice bounded by the
/// declared APDU length (captures are often padded to the Ethernet
/// minimum, so the trailing bytes are not part of the PDU).
pub fn classify_frame(frame: &[u8]) -> CodecResult<FrameView<'_>> {
    if frame.len() < 14 {
        return Err(CodecError::truncated(14, frame.len(), 0, "Ethernet header"));
    }

    let dst = MacAddr::new([frame[0], frame[1], frame[2], frame[3], frame[4], frame[5]]);
    let src = MacAddr::new([frame[6], frame[7], frame[8], frame[9], frame[10], frame[11]]);

    let (vlan, ether_off) = if u16::from_be_bytes([frame[12], frame[13]]) == TPID {
        if frame.len() < 18 {
            return Err(CodecError::truncated(18, frame.len(), 12, "802.1Q tag"));
        }
        let tci = u16::from_be_bytes([frame[14], frame[15]]);
        (Some(VlanTag::from_tci(tci)), 16)
    } else {
        (None, 12)
    };

    let ethertype = EtherType::classify(u16::from_be_bytes([frame[ether_off], frame[ether_off + 1]]))?;

    let apdu_start = ether_off + 2;
    if frame.len() < apdu_start + APDU_HEADER_SIZE {
        return Err(CodecError::truncated(
            apdu_start + APDU_HEADER_SIZE,
            frame.len(),
            apdu_start,
            "APDU header",
        ));
    }

    let app_id = u16::from_be_bytes([frame[apdu_start], frame[apdu_start + 1]]);
    let declared = u16::from_be_bytes([frame[apdu_start + 2], frame[apdu_start + 3]]) as usize;
    if declared < APDU_HEADER_SIZE {
        return Err(CodecError::FieldWidthMismatch {
            expected: APDU_HEADER_SIZE,
            got: declared,
            offset: apdu_start + 2,
            context: "APDU length",
        });
    }

    let pdu_start = apdu_start + APDU_HEADER_SIZE;
    let pdu_end = apdu_start + declared;
    if pdu_end > frame.len() {
        return Err(CodecError::truncated(pdu_end, frame.len(), apdu_start + 2, "APDU body"));
    }

    trace!(
        %dst,
        %src,
        ?ethertype,
        app_id,
        pdu_len = pdu_end - pdu_start,
        "classified frame"
    );

    Ok(FrameView {
        dst,
        src,
        vlan,
        ethertype,
        app_id,
        pdu: &frame[pdu_start..pdu_end],
    })
}

/// Decoded GOOSE content, just enough for subscription matching and
/// boolean extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GooseView<'a> {
    /// Control-block reference bytes, compared byte-exact against the
    /// subscription's. `None` when the PDU carries no gocbRef.
    pub gocb_ref: Option<&'a [u8]>,
    /// Dataset booleans by position. Non-boolean entries contribute a
    /// `false` placeholder so positional indices stay aligned with the
    /// published dataset layout.
    pub bools: Vec<bool>,
}

/// Walk a GOOSE PDU for the control-block reference and the dataset's
/// boolean vector. Single pass, O(payload size).
pub fn decode_goose(pdu: &[u8]) -> CodecResult<GooseView<'_>> {
    let mut outer = BerReader::new(pdu);
    let body = outer.expect_tlv(TAG_GOOSE_PDU)?;

    let mut gocb_ref = None;
    let mut bools = Vec::new();

    let mut fields = BerReader::new(body);
    while !fields.at_end() {
        let (tag, value) = fields.read_tlv()?;
        match tag {
            0x80 => gocb_ref = Some(value),
            0xAB => {
                let mut entries = BerReader::new(value);
                while !entries.at_end() {
                    let (entry_tag, entry_value) = entries.read_tlv()?;
                    if entry_tag == TAG_DATA_BOOLEAN && entry_value.len() == 1 {
                        bools.push(entry_value[0] != 0);
                    } else {
                        // Placeholder keeps later indices aligned with the
                        // dataset layout.
                        bools.push(false);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(GooseView { gocb_ref, bools })
}

/// One decoded ASDU: stream id, counter, raw channel values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvAsduView<'a> {
    pub sv_id: &'a [u8],
    pub smp_cnt: Option<u16>,
    /// Raw 32-bit sample values; the 4 quality bytes per channel are
    /// currently ignored.
    pub samples: Vec<i32>,
}

/// Decoded SV content for analysis consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvView<'a> {
    pub asdus: Vec<SvAsduView<'a>>,
}

/// Walk an SV PDU: ASDU count, optional security, then each ASDU's fields
/// until its sample block.
pub fn decode_sv(pdu: &[u8]) -> CodecResult<SvView<'_>> {
    let mut outer = BerReader::new(pdu);
    let body = outer.expect_tlv(TAG_SV_PDU)?;

    let mut fields = BerReader::new(body);
    let mut asdus = Vec::new();

    while !fields.at_end() {
        let (tag, value) = fields.read_tlv()?;
        match tag {
            0x80 | 0x81 => {} // noASDU and security carry no samples
            0xA2 => {
                let mut seq = BerReader::new(value);
                while !seq.at_end() {
                    let asdu_body = seq.expect_tlv(0x30)?;
                    asdus.push(decode_asdu(asdu_body)?);
                }
            }
            _ => {}
        }
    }

    Ok(SvView { asdus })
}

fn decode_asdu(body: &[u8]) -> CodecResult<SvAsduView<'_>> {
    let mut sv_id: &[u8] = &[];
    let mut smp_cnt = None;
    let mut samples = Vec::new();

    let mut fields = BerReader::new(body);
    while !fields.at_end() {
        let offset = fields.pos();
        let (tag, value) = fields.read_tlv()?;
        match tag {
            0x80 => sv_id = value,
            0x82 => {
                if value.len() != 2 {
                    return Err(CodecError::FieldWidthMismatch {
                        expected: 2,
                        got: value.len(),
                        offset,
                        context: "smpCnt",
                    });
                }
                smp_cnt = Some(u16::from_be_bytes([value[0], value[1]]));
            }
            0x87 => {
                if value.len() % 8 != 0 {
                    return Err(CodecError::FieldWidthMismatch {
                        expected: (value.len() / 8 + 1) * 8,
                        got: value.len(),
                        offset,
                        context: "sample block",
                    });
                }
                samples.reserve(value.len() / 8);
                for entry in value.chunks_exact(8) {
                    samples.push(i32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]));
                }
                // Fields after the sample block (smpMod) carry no samples.
                break;
            }
            _ => {}
        }
    }

    Ok(SvAsduView {
        sv_id,
        smp_cnt,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethernet::LinkHeader;
    use crate::goose::encode_goose_frame;
    use crate::sv::encode_sv_frame;
    use types::{GoosePdu, GooseValue, SmpSynch, SvAsdu, SvStreamConfig, UtcTimestamp};

    fn goose_link(vlan: Option<VlanTag>) -> LinkHeader {
        LinkHeader {
            dst: "01:0C:CD:01:00:01".parse().unwrap(),
            src: "00:30:A7:00:00:01".parse().unwrap(),
            vlan,
            ethertype: EtherType::Goose,
            app_id: 0x0001,
        }
    }

    fn goose_pdu() -> GoosePdu {
        GoosePdu {
            gocb_ref: "IED1LD0/LLN0$GO$gcb01".into(),
            time_allowed_to_live: 2000,
            dataset_ref: "IED1LD0/LLN0$Dataset1".into(),
            go_id: None,
            timestamp: UtcTimestamp::new(1_700_000_000, 0),
            st_num: 1,
            sq_num: 0,
            simulation: false,
            conf_rev: 1,
            nds_com: false,
            entries: vec![
                GooseValue::Boolean(true),
                GooseValue::Integer(7),
                GooseValue::Boolean(false),
                GooseValue::Boolean(true),
            ],
        }
    }

    #[test]
    fn goose_round_trip_with_placeholder_alignment() {
        let template = encode_goose_frame(&goose_link(None), &goose_pdu()).unwrap();
        let view = classify_frame(template.frame()).unwrap();
        assert_eq!(view.ethertype, EtherType::Goose);
        assert_eq!(view.app_id, 0x0001);
        assert_eq!(view.vlan, None);

        let goose = decode_goose(view.pdu).unwrap();
        assert_eq!(goose.gocb_ref, Some("IED1LD0/LLN0$GO$gcb01".as_bytes()));
        // Integer entry at position 1 pads the vector with `false`.
        assert_eq!(goose.bools, vec![true, false, false, true]);
    }

    #[test]
    fn vlan_tag_shifts_payload_offset() {
        let vlan = VlanTag::new(4, false, 100).unwrap();
        let template = encode_goose_frame(&goose_link(Some(vlan)), &goose_pdu()).unwrap();
        let view = classify_frame(template.frame()).unwrap();
        assert_eq!(view.vlan, Some(vlan));
        assert!(decode_goose(view.pdu).is_ok());
    }

    #[test]
    fn padded_capture_is_bounded_by_declared_length() {
        let template = encode_goose_frame(&goose_link(None), &goose_pdu()).unwrap();
        let mut padded = template.frame().to_vec();
        padded.resize(padded.len() + 13, 0xEE);
        let view = classify_frame(&padded).unwrap();
        assert!(decode_goose(view.pdu).is_ok());
    }

    #[test]
    fn sv_round_trip_recovers_samples() {
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
            smp_synch: SmpSynch::Global,
            smp_rate: Some(4800),
            channel_count: 4,
            smp_mod: None,
        };
        let mut template = encode_sv_frame(&link, &SvStreamConfig::single(asdu)).unwrap();
        template.set_sample_count(0, 77).unwrap();
        for ch in 0..4 {
            template.set_channel_value(0, ch, -(ch as i32) * 1000).unwrap();
        }

        let view = classify_frame(template.frame()).unwrap();
        assert_eq!(view.ethertype, EtherType::SampledValues);
        let sv = decode_sv(view.pdu).unwrap();
        assert_eq!(sv.asdus.len(), 1);
        assert_eq!(sv.asdus[0].sv_id, b"MU01");
        assert_eq!(sv.asdus[0].smp_cnt, Some(77));
        assert_eq!(sv.asdus[0].samples, vec![0, -1000, -2000, -3000]);
    }

    #[test]
    fn runt_frame_is_a_clean_error() {
        assert!(matches!(
            classify_frame(&[0x01, 0x0C]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn wrong_outer_tag_is_rejected() {
        let template = encode_goose_frame(&goose_link(None), &goose_pdu()).unwrap();
        let view = classify_frame(template.frame()).unwrap();
        assert!(matches!(
            decode_sv(view.pdu),
            Err(CodecError::UnexpectedTag {
                expected: TAG_SV_PDU,
                ..
            })
        ));
    }
}

//! GOOSE frame encoding with field-offset indexing.
//!
//! One encode pass produces both the wire bytes and a [`GooseOffsets`]
//! index. The resulting [`GooseTemplate`] is then patched in place by the
//! heartbeat publisher: the timestamp and boolean dataset entries are
//! fixed-width, so republishing a changed state is two byte-writes, never a
//! re-encode.
//!
//! PDU field order is fixed by tag number:
//!
//! ```text
//! 0x80 gocbRef   0x81 timeAllowedtoLive   0x82 datSet     0x83 goID
//! 0x84 t         0x85 stNum               0x86 sqNum      0x87 simulation
//! 0x88 confRev   0x89 ndsCom              0x8A numDatSetEntries
//! 0xAB allData
//! ```

use crate::ber::{encode_length, encoded_length_size, signed_bytes, unsigned_bytes, write_tlv};
use crate::ethernet::LinkHeader;
use crate::{CodecError, CodecResult, TAG_GOOSE_PDU};
use types::goose::TAG_DATA_BOOLEAN;
use types::{GoosePdu, GooseValue, UtcTimestamp};

/// Location of one dataset entry's value bytes inside the encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOffset {
    pub tag: u8,
    pub offset: usize,
    pub len: usize,
}

/// Byte offsets of the patchable GOOSE fields, recorded during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GooseOffsets {
    /// Offset of the 8-byte timestamp value.
    pub timestamp: usize,
    /// Offset and width of the stNum value. Recorded for completeness; the
    /// emulator does not run a retransmission curve.
    pub st_num: EntryOffset,
    /// Offset and width of the sqNum value.
    pub sq_num: EntryOffset,
    /// One entry per dataset member, in dataset order.
    pub entries: Vec<EntryOffset>,
}

/// An encoded GOOSE frame plus its offset index.
///
/// The buffer length is fixed at build time; patch methods overwrite
/// fixed-width fields only and can never change it.
#[derive(Debug, Clone)]
pub struct GooseTemplate {
    buf: Vec<u8>,
    offsets: GooseOffsets,
}

impl GooseTemplate {
    /// The complete frame, ready to hand to a transport.
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn offsets(&self) -> &GooseOffsets {
        &self.offsets
    }

    /// Overwrite the 8-byte timestamp value.
    #[inline]
    pub fn set_timestamp(&mut self, t: UtcTimestamp) {
        let at = self.offsets.timestamp;
        self.buf[at..at + 4].copy_from_slice(&t.seconds.to_be_bytes());
        self.buf[at + 4..at + 8].copy_from_slice(&t.fraction.to_be_bytes());
    }

    /// Overwrite the boolean dataset entry at `index` (dataset position).
    ///
    /// Errors when `index` is out of range or addresses a non-boolean
    /// entry; the frame is unchanged in either case.
    #[inline]
    pub fn set_bool_entry(&mut self, index: usize, value: bool) -> CodecResult<()> {
        let entry = self.offsets.entries.get(index).ok_or(CodecError::FieldOutOfRange {
            context: "dataset entry",
            index,
            len: self.offsets.entries.len(),
        })?;
        if entry.tag != TAG_DATA_BOOLEAN {
            return Err(CodecError::UnexpectedTag {
                expected: TAG_DATA_BOOLEAN,
                got: entry.tag,
                offset: entry.offset,
            });
        }
        self.buf[entry.offset] = value as u8;
        Ok(())
    }
}

/// Content bytes for one dataset value. Tag and length are written by the
/// caller.
fn value_bytes(value: &GooseValue) -> Vec<u8> {
    match value {
        GooseValue::Boolean(b) => vec![*b as u8],
        GooseValue::BitString { padding, bits } => {
            let mut out = Vec::with_capacity(1 + bits.len());
            out.push(*padding);
            out.extend_from_slice(bits);
            out
        }
        GooseValue::Integer(v) => signed_bytes(*v),
        GooseValue::Unsigned(v) => unsigned_bytes(*v),
        GooseValue::FloatText(s) => s.as_bytes().to_vec(),
        GooseValue::Double(v) => v.to_be_bytes().to_vec(),
        GooseValue::OctetString(b) => b.clone(),
        GooseValue::VisibleString(s) => s.as_bytes().to_vec(),
        GooseValue::Bcd(v) => bcd_bytes(*v),
        GooseValue::BooleanArray(bools) => boolean_array_bytes(bools),
        GooseValue::ObjectId(arcs) => object_id_bytes(arcs),
        GooseValue::MmsString(s) => s.as_bytes().to_vec(),
        GooseValue::UtcTime(t) => {
            let mut out = Vec::with_capacity(8);
            out.extend_from_slice(&t.seconds.to_be_bytes());
            out.extend_from_slice(&t.fraction.to_be_bytes());
            out
        }
    }
}

fn bcd_bytes(value: u64) -> Vec<u8> {
    let digits = value.to_string();
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits
    };
    padded
        .as_bytes()
        .chunks(2)
        .map(|pair| ((pair[0] - b'0') << 4) | (pair[1] - b'0'))
        .collect()
}

fn boolean_array_bytes(bools: &[bool]) -> Vec<u8> {
    let padding = (8 - bools.len() % 8) % 8;
    let mut out = vec![padding as u8];
    let mut acc = 0u8;
    for (i, &b) in bools.iter().enumerate() {
        acc |= (b as u8) << (7 - i % 8);
        if i % 8 == 7 {
            out.push(acc);
            acc = 0;
        }
    }
    if bools.len() % 8 != 0 {
        out.push(acc);
    }
    out
}

fn object_id_bytes(arcs: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    match arcs {
        [] => {}
        [first] => out.push((first * 40) as u8),
        [first, second, rest @ ..] => {
            push_base128(first * 40 + second, &mut out);
            for &arc in rest {
                push_base128(arc, &mut out);
            }
        }
    }
    out
}

fn push_base128(mut arc: u32, out: &mut Vec<u8>) {
    let mut stack = [0u8; 5];
    let mut n = 0;
    loop {
        stack[n] = (arc & 0x7F) as u8;
        arc >>= 7;
        n += 1;
        if arc == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(stack[i] | continuation);
    }
}

/// Encode a complete GOOSE frame, producing the template the heartbeat
/// publisher patches per transmission.
pub fn encode_goose_frame(link: &LinkHeader, pdu: &GoosePdu) -> CodecResult<GooseTemplate> {
    // PDU body first: nested BER lengths mean the outer length is only
    // known once the body exists. Offsets are recorded body-relative and
    // shifted once the final frame prefix size is known.
    let mut body = Vec::with_capacity(128);

    write_tlv(0x80, pdu.gocb_ref.as_bytes(), &mut body)?;
    write_tlv(0x81, &unsigned_bytes(pdu.time_allowed_to_live as u64), &mut body)?;
    write_tlv(0x82, pdu.dataset_ref.as_bytes(), &mut body)?;
    if let Some(go_id) = &pdu.go_id {
        write_tlv(0x83, go_id.as_bytes(), &mut body)?;
    }

    // t: fixed 8-byte value, offset recorded
    body.push(0x84);
    encode_length(8, &mut body)?;
    let timestamp_rel = body.len();
    body.extend_from_slice(&pdu.timestamp.seconds.to_be_bytes());
    body.extend_from_slice(&pdu.timestamp.fraction.to_be_bytes());

    let st_bytes = unsigned_bytes(pdu.st_num as u64);
    body.push(0x85);
    encode_length(st_bytes.len(), &mut body)?;
    let st_rel = EntryOffset {
        tag: 0x85,
        offset: body.len(),
        len: st_bytes.len(),
    };
    body.extend_from_slice(&st_bytes);

    let sq_bytes = unsigned_bytes(pdu.sq_num as u64);
    body.push(0x86);
    encode_length(sq_bytes.len(), &mut body)?;
    let sq_rel = EntryOffset {
        tag: 0x86,
        offset: body.len(),
        len: sq_bytes.len(),
    };
    body.extend_from_slice(&sq_bytes);

    write_tlv(0x87, &[pdu.simulation as u8], &mut body)?;
    write_tlv(0x88, &unsigned_bytes(pdu.conf_rev as u64), &mut body)?;
    write_tlv(0x89, &[pdu.nds_com as u8], &mut body)?;
    write_tlv(0x8A, &unsigned_bytes(pdu.num_entries() as u64), &mut body)?;

    // allData: encode entries into their own buffer so entry offsets can be
    // recorded against a single known base.
    let mut all_data = Vec::with_capacity(pdu.entries.len() * 4);
    let mut entry_rels = Vec::with_capacity(pdu.entries.len());
    for entry in &pdu.entries {
        let content = value_bytes(entry);
        all_data.push(entry.tag());
        encode_length(content.len(), &mut all_data)?;
        entry_rels.push(EntryOffset {
            tag: entry.tag(),
            offset: all_data.len(),
            len: content.len(),
        });
        all_data.extend_from_slice(&content);
    }

    body.push(0xAB);
    encode_length(all_data.len(), &mut body)?;
    let all_data_base = body.len();
    body.extend_from_slice(&all_data);

    // Assemble: link header, outer tag, outer length, body.
    let prefix = link.encoded_size() + 1 + encoded_length_size(body.len())?;
    let mut buf = Vec::with_capacity(prefix + body.len());
    link.encode_into(1 + encoded_length_size(body.len())? + body.len(), &mut buf)?;
    buf.push(TAG_GOOSE_PDU);
    encode_length(body.len(), &mut buf)?;
    debug_assert_eq!(buf.len(), prefix);
    buf.extend_from_slice(&body);

    let shift = |rel: usize| rel + prefix;
    let offsets = GooseOffsets {
        timestamp: shift(timestamp_rel),
        st_num: EntryOffset {
            offset: shift(st_rel.offset),
            ..st_rel
        },
        sq_num: EntryOffset {
            offset: shift(sq_rel.offset),
            ..sq_rel
        },
        entries: entry_rels
            .into_iter()
            .map(|e| EntryOffset {
                offset: shift(all_data_base + e.offset),
                ..e
            })
            .collect(),
    };

    Ok(GooseTemplate { buf, offsets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::EtherType;

    fn link() -> LinkHeader {
        LinkHeader {
            dst: "01:0C:CD:01:00:01".parse().unwrap(),
            src: "00:30:A7:00:00:01".parse().unwrap(),
            vlan: None,
            ethertype: EtherType::Goose,
            app_id: 0x0001,
        }
    }

    fn pdu() -> GoosePdu {
        GoosePdu {
            gocb_ref: "IED1LD0/LLN0$GO$gcb01".into(),
            time_allowed_to_live: 2000,
            dataset_ref: "IED1LD0/LLN0$Dataset1".into(),
            go_id: Some("IED1_GOOSE".into()),
            timestamp: UtcTimestamp::new(1_700_000_000, 0),
            st_num: 1,
            sq_num: 0,
            simulation: false,
            conf_rev: 1,
            nds_com: false,
            entries: vec![
                GooseValue::Boolean(false),
                GooseValue::Integer(42),
                GooseValue::Boolean(true),
            ],
        }
    }

    #[test]
    fn entry_offsets_point_at_encoded_values() {
        let template = encode_goose_frame(&link(), &pdu()).unwrap();
        let frame = template.frame();
        let offsets = template.offsets();

        assert_eq!(offsets.entries.len(), 3);
        assert_eq!(frame[offsets.entries[0].offset], 0x00);
        assert_eq!(frame[offsets.entries[2].offset], 0x01);
        // Tag byte sits immediately before the length byte and value.
        assert_eq!(frame[offsets.entries[0].offset - 2], 0x83);
        assert_eq!(frame[offsets.entries[1].offset - 2], 0x85);
    }

    #[test]
    fn patching_bool_entries_preserves_length() {
        let mut template = encode_goose_frame(&link(), &pdu()).unwrap();
        let len = template.len();
        for _ in 0..1000 {
            template.set_bool_entry(0, true).unwrap();
            template.set_bool_entry(2, false).unwrap();
            template.set_timestamp(UtcTimestamp::new(1_700_000_001, 0x8000_0000));
        }
        assert_eq!(template.len(), len);
        assert_eq!(template.frame()[template.offsets().entries[0].offset], 0x01);
    }

    #[test]
    fn patching_non_boolean_entry_is_rejected() {
        let mut template = encode_goose_frame(&link(), &pdu()).unwrap();
        assert!(matches!(
            template.set_bool_entry(1, true),
            Err(CodecError::UnexpectedTag { expected: 0x83, .. })
        ));
        assert!(matches!(
            template.set_bool_entry(7, true),
            Err(CodecError::FieldOutOfRange { .. })
        ));
    }

    #[test]
    fn goose_ethertype_and_outer_tag_in_place() {
        let template = encode_goose_frame(&link(), &pdu()).unwrap();
        let frame = template.frame();
        assert_eq!(&frame[12..14], &[0x88, 0xB8]);
        assert_eq!(frame[22], TAG_GOOSE_PDU);
    }

    #[test]
    fn timestamp_patch_writes_both_halves() {
        let mut template = encode_goose_frame(&link(), &pdu()).unwrap();
        template.set_timestamp(UtcTimestamp::new(0x0102_0304, 0x0506_0708));
        let at = template.offsets().timestamp;
        assert_eq!(
            &template.frame()[at..at + 8],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn bcd_packs_two_digits_per_octet() {
        assert_eq!(bcd_bytes(1234), [0x12, 0x34]);
        assert_eq!(bcd_bytes(123), [0x01, 0x23]);
        assert_eq!(bcd_bytes(0), [0x00]);
    }

    #[test]
    fn boolean_array_packs_msb_first() {
        assert_eq!(boolean_array_bytes(&[true, false, true]), [5, 0b1010_0000]);
        assert_eq!(
            boolean_array_bytes(&[true; 8]),
            [0, 0xFF],
        );
    }

    #[test]
    fn object_id_combines_first_two_arcs() {
        // 1.3.6.1 → 0x2B 0x06 0x01
        assert_eq!(object_id_bytes(&[1, 3, 6, 1]), [0x2B, 0x06, 0x01]);
        // multi-byte arc: 2.999 → 40*2+999 = 1079 = 0x88 0x37
        assert_eq!(object_id_bytes(&[2, 999]), [0x88, 0x37]);
    }
}

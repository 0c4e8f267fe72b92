use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::pci::{
    pci_type, CONSECUTIVE_FRAME, CONSECUTIVE_FRAME_CAPACITY, FIRST_FRAME, FIRST_FRAME_CAPACITY,
    LINK_FRAME_SIZE, MAX_PAYLOAD, SINGLE_FRAME, SINGLE_FRAME_CAPACITY,
};

/// Header size of a first frame: PCI nibble + 12-bit length.
pub const FIRST_FRAME_HEADER_SIZE: usize = 2;

/// Header size of single and consecutive frames.
pub const SHORT_HEADER_SIZE: usize = 1;

/// Parsed view of one link frame.
///
/// `data` borrows from the decoded frame. For first and consecutive frames it
/// runs to the end of the frame and may include padding; the reassembler
/// takes only the bytes it still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pdu<'a> {
    /// Whole payload of `len` bytes.
    SingleFrame { len: u8, data: &'a [u8] },
    /// Start of a segmented payload of `len` total bytes.
    FirstFrame { len: u16, data: &'a [u8] },
    /// Continuation chunk tagged with sequence number `sn`.
    ConsecutiveFrame { sn: u8, data: &'a [u8] },
}

impl Pdu<'_> {
    /// PCI type nibble for this frame.
    pub fn pci(&self) -> u8 {
        match self {
            Pdu::SingleFrame { .. } => SINGLE_FRAME,
            Pdu::FirstFrame { .. } => FIRST_FRAME,
            Pdu::ConsecutiveFrame { .. } => CONSECUTIVE_FRAME,
        }
    }
}

/// Encode a PDU into link-frame bytes.
///
/// Wire format:
/// ```text
/// SF  │ 0x0 │ len (4b) │ data (len bytes, ≤ 7)            │
/// FF  │ 0x1 │ total length (12b, big-endian) │ data (6B)  │
/// CF  │ 0x2 │ sn (4b)  │ data (≤ 7 bytes)                 │
/// ```
///
/// With `padding = Some(b)` the frame is filled with `b` up to
/// [`LINK_FRAME_SIZE`] bytes.
pub fn encode_pdu(pdu: &Pdu<'_>, padding: Option<u8>, dst: &mut BytesMut) -> Result<()> {
    let start = dst.len();
    dst.reserve(LINK_FRAME_SIZE);

    match *pdu {
        Pdu::SingleFrame { len, data } => {
            let len_usize = len as usize;
            if len_usize > SINGLE_FRAME_CAPACITY || data.len() != len_usize {
                return Err(FrameError::invalid(format!(
                    "single frame cannot carry {} bytes (declared {len})",
                    data.len()
                )));
            }
            dst.put_u8((SINGLE_FRAME << 4) | len);
            dst.put_slice(data);
        }
        Pdu::FirstFrame { len, data } => {
            let total = len as usize;
            if total > MAX_PAYLOAD {
                return Err(FrameError::PayloadTooLarge {
                    size: total,
                    max: MAX_PAYLOAD,
                });
            }
            if total <= SINGLE_FRAME_CAPACITY {
                return Err(FrameError::invalid(format!(
                    "first frame length {total} fits a single frame"
                )));
            }
            if data.len() != FIRST_FRAME_CAPACITY {
                return Err(FrameError::invalid(format!(
                    "first frame must carry {FIRST_FRAME_CAPACITY} bytes, got {}",
                    data.len()
                )));
            }
            dst.put_u8((FIRST_FRAME << 4) | ((len >> 8) as u8 & 0x0F));
            dst.put_u8((len & 0xFF) as u8);
            dst.put_slice(data);
        }
        Pdu::ConsecutiveFrame { sn, data } => {
            if sn > 0x0F {
                return Err(FrameError::invalid(format!(
                    "sequence number {sn} exceeds 4 bits"
                )));
            }
            if data.is_empty() || data.len() > CONSECUTIVE_FRAME_CAPACITY {
                return Err(FrameError::invalid(format!(
                    "consecutive frame cannot carry {} bytes",
                    data.len()
                )));
            }
            dst.put_u8((CONSECUTIVE_FRAME << 4) | sn);
            dst.put_slice(data);
        }
    }

    if let Some(pad) = padding {
        let used = dst.len() - start;
        dst.put_bytes(pad, LINK_FRAME_SIZE.saturating_sub(used));
    }
    Ok(())
}

/// Decode one link frame into a PDU view.
///
/// Every length is checked before slicing, so malformed frames produce
/// [`FrameError::InvalidInput`] instead of out-of-bounds reads.
pub fn decode_pdu(frame: &[u8]) -> Result<Pdu<'_>> {
    let Some(&byte0) = frame.first() else {
        return Err(FrameError::invalid("empty frame"));
    };

    match pci_type(byte0) {
        SINGLE_FRAME => {
            let len = byte0 & 0x0F;
            let end = SHORT_HEADER_SIZE + len as usize;
            if len as usize > SINGLE_FRAME_CAPACITY {
                return Err(FrameError::invalid(format!(
                    "single frame length {len} exceeds {SINGLE_FRAME_CAPACITY}"
                )));
            }
            if frame.len() < end {
                return Err(FrameError::invalid(format!(
                    "single frame declares {len} bytes but carries {}",
                    frame.len() - SHORT_HEADER_SIZE
                )));
            }
            Ok(Pdu::SingleFrame {
                len,
                data: &frame[SHORT_HEADER_SIZE..end],
            })
        }
        FIRST_FRAME => {
            let min_len = FIRST_FRAME_HEADER_SIZE + FIRST_FRAME_CAPACITY;
            if frame.len() < min_len {
                return Err(FrameError::invalid(format!(
                    "first frame is {} bytes, need {min_len}",
                    frame.len()
                )));
            }
            let len = (u16::from(byte0 & 0x0F) << 8) | u16::from(frame[1]);
            if len as usize <= SINGLE_FRAME_CAPACITY {
                return Err(FrameError::invalid(format!(
                    "first frame length {len} fits a single frame"
                )));
            }
            Ok(Pdu::FirstFrame {
                len,
                data: &frame[FIRST_FRAME_HEADER_SIZE..],
            })
        }
        CONSECUTIVE_FRAME => {
            if frame.len() <= SHORT_HEADER_SIZE {
                return Err(FrameError::invalid("consecutive frame carries no data"));
            }
            Ok(Pdu::ConsecutiveFrame {
                sn: byte0 & 0x0F,
                data: &frame[SHORT_HEADER_SIZE..],
            })
        }
        other => Err(FrameError::UnknownPciType(other)),
    }
}

/// Configuration shared by the builder and the reassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default and upper bound: 4095.
    pub max_payload_size: usize,
    /// Fill byte used to pad built frames to 8 bytes. Default: no padding.
    pub padding: Option<u8>,
}

impl FrameConfig {
    /// Effective payload limit, never above the 12-bit length field.
    pub fn payload_limit(&self) -> usize {
        self.max_payload_size.min(MAX_PAYLOAD)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            padding: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(pdu: Pdu<'_>, padding: Option<u8>) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_pdu(&pdu, padding, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn single_frame_wire_bytes() {
        let wire = encode(
            Pdu::SingleFrame {
                len: 3,
                data: &[0x22, 0xF1, 0x90],
            },
            None,
        );
        assert_eq!(wire, vec![0x03, 0x22, 0xF1, 0x90]);

        match decode_pdu(&wire).unwrap() {
            Pdu::SingleFrame { len, data } => {
                assert_eq!(len, 3);
                assert_eq!(data, &[0x22, 0xF1, 0x90]);
            }
            other => panic!("unexpected PDU: {other:?}"),
        }
    }

    #[test]
    fn first_frame_splits_length_across_nibble_and_byte() {
        let wire = encode(
            Pdu::FirstFrame {
                len: 0x0ABC,
                data: &[1, 2, 3, 4, 5, 6],
            },
            None,
        );
        assert_eq!(wire, vec![0x1A, 0xBC, 1, 2, 3, 4, 5, 6]);

        match decode_pdu(&wire).unwrap() {
            Pdu::FirstFrame { len, data } => {
                assert_eq!(len, 0x0ABC);
                assert_eq!(data, &[1, 2, 3, 4, 5, 6]);
            }
            other => panic!("unexpected PDU: {other:?}"),
        }
    }

    #[test]
    fn consecutive_frame_padding_fills_to_link_size() {
        let wire = encode(
            Pdu::ConsecutiveFrame {
                sn: 0xF,
                data: &[0xAA, 0xBB],
            },
            Some(0xCC),
        );
        assert_eq!(wire, vec![0x2F, 0xAA, 0xBB, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC]);
    }

    #[test]
    fn padded_single_frame_decodes_declared_length_only() {
        let wire = encode(
            Pdu::SingleFrame {
                len: 2,
                data: &[0x10, 0x01],
            },
            Some(0x55),
        );
        assert_eq!(wire.len(), LINK_FRAME_SIZE);
        assert_eq!(
            decode_pdu(&wire).unwrap(),
            Pdu::SingleFrame {
                len: 2,
                data: &[0x10, 0x01]
            }
        );
    }

    #[test]
    fn decode_rejects_empty_frame() {
        assert!(matches!(decode_pdu(&[]), Err(FrameError::InvalidInput(_))));
    }

    #[test]
    fn decode_rejects_truncated_single_frame() {
        let err = decode_pdu(&[0x05, b'H', b'i']).unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
    }

    #[test]
    fn decode_rejects_single_frame_length_above_seven() {
        let err = decode_pdu(&[0x08, 1, 2, 3, 4, 5, 6, 7, 8]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
    }

    #[test]
    fn decode_accepts_zero_length_single_frame() {
        assert_eq!(
            decode_pdu(&[0x00]).unwrap(),
            Pdu::SingleFrame { len: 0, data: &[] }
        );
    }

    #[test]
    fn decode_rejects_short_first_frame() {
        let err = decode_pdu(&[0x10, 0x14, b'T', b'h']).unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
    }

    #[test]
    fn decode_rejects_first_frame_that_fits_single_frame() {
        let err = decode_pdu(&[0x10, 0x07, 1, 2, 3, 4, 5, 6]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
    }

    #[test]
    fn decode_rejects_bare_consecutive_header() {
        let err = decode_pdu(&[0x21]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
    }

    #[test]
    fn decode_reports_unknown_pci() {
        assert_eq!(
            decode_pdu(&[0x30, 0x00, 0x00]).unwrap_err(),
            FrameError::UnknownPciType(3)
        );
        assert_eq!(
            decode_pdu(&[0xF2, 0x00]).unwrap_err(),
            FrameError::UnknownPciType(0xF)
        );
    }

    #[test]
    fn encode_rejects_mismatched_single_frame() {
        let mut buf = BytesMut::new();
        let err = encode_pdu(
            &Pdu::SingleFrame {
                len: 8,
                data: &[0; 8],
            },
            None,
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::InvalidInput(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_oversized_first_frame_length() {
        let mut buf = BytesMut::new();
        let err = encode_pdu(
            &Pdu::FirstFrame {
                len: 0x1000,
                data: &[0; 6],
            },
            None,
            &mut buf,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 4096, .. }));
    }

    #[test]
    fn config_limit_is_clamped_to_twelve_bits() {
        let cfg = FrameConfig {
            max_payload_size: usize::MAX,
            ..FrameConfig::default()
        };
        assert_eq!(cfg.payload_limit(), MAX_PAYLOAD);
        assert_eq!(FrameConfig::default().payload_limit(), 4095);
    }
}

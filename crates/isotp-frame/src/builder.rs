use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::{encode_pdu, FrameConfig, Pdu};
use crate::error::{FrameError, Result};
use crate::pci::{
    fits_single_frame, next_sequence, CONSECUTIVE_FRAME_CAPACITY, FIRST_FRAME_CAPACITY,
    FIRST_SEQUENCE, LINK_FRAME_SIZE,
};

/// Splits payloads into ISO-TP link frames.
///
/// Building is a pure function of the payload and the configuration; no state
/// is carried between calls.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    config: FrameConfig,
}

impl FrameBuilder {
    /// Create a builder with default configuration (no padding, 4095-byte limit).
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a builder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Segment `payload` into an ordered sequence of frames.
    ///
    /// Payloads of up to 7 bytes become one single frame. Longer payloads
    /// become a first frame carrying 6 bytes followed by consecutive frames of
    /// up to 7 bytes each, numbered 1, 2, …, 15, 0, 1, …
    pub fn build(&self, payload: &[u8]) -> Result<Vec<Bytes>> {
        if payload.is_empty() {
            return Err(FrameError::invalid("payload must not be empty"));
        }
        let max = self.config.payload_limit();
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let padding = self.config.padding;
        let mut frames = Vec::with_capacity(Self::frame_count(payload.len()));

        if fits_single_frame(payload.len()) {
            frames.push(encode_one(
                &Pdu::SingleFrame {
                    len: payload.len() as u8,
                    data: payload,
                },
                padding,
            )?);
        } else {
            let (head, rest) = payload.split_at(FIRST_FRAME_CAPACITY);
            frames.push(encode_one(
                &Pdu::FirstFrame {
                    len: payload.len() as u16,
                    data: head,
                },
                padding,
            )?);

            let mut sn = FIRST_SEQUENCE;
            for chunk in rest.chunks(CONSECUTIVE_FRAME_CAPACITY) {
                frames.push(encode_one(&Pdu::ConsecutiveFrame { sn, data: chunk }, padding)?);
                sn = next_sequence(sn);
            }
        }

        debug!(len = payload.len(), frames = frames.len(), "segmented payload");
        Ok(frames)
    }

    /// Number of frames a payload of `len` bytes segments into.
    pub fn frame_count(len: usize) -> usize {
        if fits_single_frame(len) {
            1
        } else {
            1 + (len - FIRST_FRAME_CAPACITY).div_ceil(CONSECUTIVE_FRAME_CAPACITY)
        }
    }

    /// Current builder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Segment `payload` with the default configuration.
pub fn build_frames(payload: &[u8]) -> Result<Vec<Bytes>> {
    FrameBuilder::new().build(payload)
}

fn encode_one(pdu: &Pdu<'_>, padding: Option<u8>) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(LINK_FRAME_SIZE);
    encode_pdu(pdu, padding, &mut buf)?;
    Ok(buf.freeze())
}

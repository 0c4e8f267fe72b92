use std::cmp::min;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{decode_pdu, FrameConfig, Pdu};
use crate::error::{FrameError, Result};
use crate::pci::{
    next_sequence, pci_name, pci_type, CONSECUTIVE_FRAME_CAPACITY, FIRST_FRAME_CAPACITY,
    FIRST_SEQUENCE, SINGLE_FRAME,
};

/// Reassembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    /// No first frame seen.
    Idle,
    /// First frame seen, waiting for consecutive frames.
    Accumulating,
}

/// Result of feeding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// More frames are needed.
    Pending,
    /// A payload has been fully reassembled.
    Complete(Bytes),
}

/// Receives reassembly events.
///
/// Both methods are called synchronously from within
/// [`FrameReassembler::feed_with`].
pub trait ReassemblyHandler {
    /// A payload has been fully reassembled.
    fn on_complete(&mut self, payload: Bytes);

    /// A frame was rejected.
    fn on_error(&mut self, error: &FrameError);
}

/// [`ReassemblyHandler`] built from two closures. See [`handler`].
pub struct FnHandler<C, E> {
    on_complete: C,
    on_error: E,
}

/// Adapt a pair of closures into a [`ReassemblyHandler`].
pub fn handler<C, E>(on_complete: C, on_error: E) -> FnHandler<C, E>
where
    C: FnMut(Bytes),
    E: FnMut(&FrameError),
{
    FnHandler {
        on_complete,
        on_error,
    }
}

impl<C, E> ReassemblyHandler for FnHandler<C, E>
where
    C: FnMut(Bytes),
    E: FnMut(&FrameError),
{
    fn on_complete(&mut self, payload: Bytes) {
        (self.on_complete)(payload)
    }

    fn on_error(&mut self, error: &FrameError) {
        (self.on_error)(error)
    }
}

/// Reassembles ISO-TP frames of one session back into payloads.
///
/// Frames must be fed serially in arrival order. Protocol errors on first and
/// consecutive frames reset the reassembler to [`ReassemblyState::Idle`]; it
/// stays usable and accepts the next first frame without caller intervention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReassembler {
    buf: BytesMut,
    expected_len: Option<usize>,
    next_sn: u8,
    config: FrameConfig,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    /// Create an idle reassembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an idle reassembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            expected_len: None,
            next_sn: FIRST_SEQUENCE,
            config,
        }
    }

    /// Consume one frame.
    ///
    /// Returns [`FeedOutcome::Complete`] when a payload is finished and
    /// [`FeedOutcome::Pending`] while a segmented payload is still open.
    ///
    /// A rejected first, consecutive or unknown frame discards the
    /// in-progress reassembly. A rejected single frame, or an empty frame
    /// with no PCI byte, is reported without touching it.
    pub fn feed(&mut self, frame: &[u8]) -> Result<FeedOutcome> {
        let result = decode_pdu(frame).and_then(|pdu| self.on_pdu(pdu));
        if let Err(err) = &result {
            match frame.first().map(|&b| pci_type(b)) {
                None | Some(SINGLE_FRAME) => {
                    warn!(
                        error = %err,
                        received = self.buf.len(),
                        "frame rejected, reassembly kept"
                    );
                }
                Some(pci) => {
                    warn!(
                        error = %err,
                        pci = pci_name(pci),
                        discarded = self.buf.len(),
                        "frame rejected, reassembly reset"
                    );
                    self.reset();
                }
            }
        }
        result
    }

    /// Consume one frame and report the outcome to `handler`.
    ///
    /// Nothing is reported while more frames are needed.
    pub fn feed_with<H>(&mut self, frame: &[u8], handler: &mut H)
    where
        H: ReassemblyHandler + ?Sized,
    {
        match self.feed(frame) {
            Ok(FeedOutcome::Complete(payload)) => handler.on_complete(payload),
            Ok(FeedOutcome::Pending) => {}
            Err(err) => handler.on_error(&err),
        }
    }

    /// Discard any in-progress reassembly. Idempotent.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.expected_len = None;
        self.next_sn = FIRST_SEQUENCE;
    }

    fn on_pdu(&mut self, pdu: Pdu<'_>) -> Result<FeedOutcome> {
        match pdu {
            Pdu::SingleFrame { data, .. } => {
                let max = self.config.payload_limit();
                if data.len() > max {
                    return Err(FrameError::PayloadTooLarge {
                        size: data.len(),
                        max,
                    });
                }
                Ok(FeedOutcome::Complete(Bytes::copy_from_slice(data)))
            }
            Pdu::FirstFrame { len, data } => self.handle_first(len as usize, data),
            Pdu::ConsecutiveFrame { sn, data } => self.handle_consecutive(sn, data),
        }
    }

    fn handle_first(&mut self, len: usize, data: &[u8]) -> Result<FeedOutcome> {
        let max = self.config.payload_limit();
        if len > max {
            return Err(FrameError::PayloadTooLarge { size: len, max });
        }
        if self.expected_len.is_some() {
            debug!(
                discarded = self.buf.len(),
                "first frame interrupted in-progress reassembly"
            );
        }

        self.reset();
        self.buf.reserve(len);
        self.buf.extend_from_slice(&data[..FIRST_FRAME_CAPACITY]);
        self.expected_len = Some(len);
        debug!(len, "reassembly started");
        Ok(FeedOutcome::Pending)
    }

    fn handle_consecutive(&mut self, sn: u8, data: &[u8]) -> Result<FeedOutcome> {
        let Some(expected_len) = self.expected_len else {
            return Err(FrameError::ConsecutiveWithoutFirst);
        };
        if sn != self.next_sn {
            return Err(FrameError::SequenceMismatch {
                expected: self.next_sn,
                actual: sn,
            });
        }

        let needed = min(CONSECUTIVE_FRAME_CAPACITY, expected_len - self.buf.len());
        if data.len() < needed {
            return Err(FrameError::invalid(format!(
                "consecutive frame {sn} carries {} bytes, expected {needed}",
                data.len()
            )));
        }

        self.buf.extend_from_slice(&data[..needed]);
        self.next_sn = next_sequence(self.next_sn);
        trace!(sn, received = self.buf.len(), expected_len, "consecutive frame accepted");

        if self.buf.len() < expected_len {
            return Ok(FeedOutcome::Pending);
        }

        let payload = self.buf.split().freeze();
        self.reset();
        debug!(len = payload.len(), "reassembly complete");
        Ok(FeedOutcome::Complete(payload))
    }

    /// Current state.
    pub fn state(&self) -> ReassemblyState {
        if self.expected_len.is_some() {
            ReassemblyState::Accumulating
        } else {
            ReassemblyState::Idle
        }
    }

    /// Returns true if no reassembly is in progress.
    pub fn is_idle(&self) -> bool {
        self.state() == ReassemblyState::Idle
    }

    /// Total length announced by the current first frame.
    pub fn expected_len(&self) -> Option<usize> {
        self.expected_len
    }

    /// Bytes received so far for the current payload.
    pub fn received_len(&self) -> usize {
        self.buf.len()
    }

    /// Sequence number the next consecutive frame must carry.
    pub fn next_sequence(&self) -> u8 {
        self.next_sn
    }

    /// Current reassembler configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

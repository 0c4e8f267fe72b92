//! ISO 15765-2 (ISO-TP) segmentation and reassembly.
//!
//! Carries diagnostic (UDS) payloads of up to 4095 bytes over 8-byte CAN
//! frames. Every link frame starts with a PCI nibble:
//! - `0x0` single frame: length nibble + up to 7 payload bytes
//! - `0x1` first frame: 12-bit total length + the first 6 payload bytes
//! - `0x2` consecutive frame: 4-bit sequence number + up to 7 payload bytes
//!
//! [`FrameBuilder`] splits a payload into frames; [`FrameReassembler`] puts
//! them back together one frame at a time. Flow control, timers and the CAN
//! bus itself are left to the caller.

pub mod builder;
pub mod codec;
pub mod error;
pub mod pci;
pub mod reassembler;
pub mod session;

pub use builder::{build_frames, FrameBuilder};
pub use codec::{decode_pdu, encode_pdu, FrameConfig, Pdu};
pub use error::{FrameError, Result};
pub use pci::{CONSECUTIVE_FRAME, FIRST_FRAME, LINK_FRAME_SIZE, MAX_PAYLOAD, SINGLE_FRAME};
pub use reassembler::{
    handler, FeedOutcome, FnHandler, FrameReassembler, ReassemblyHandler, ReassemblyState,
};
pub use session::SessionMap;

//! ISO-TP (ISO 15765-2) segmentation and reassembly.
//!
//! # Crate Structure
//!
//! - [`frame`]: frame builder, reassembler and session-keyed reassembly
//!
//! The `isotp` binary (behind the `cli` feature) segments payloads into
//! frames and reassembles hex-encoded frames from the command line.

/// Re-export frame types.
pub mod frame {
    pub use isotp_frame::*;
}

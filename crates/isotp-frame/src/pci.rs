//! Protocol Control Information (PCI) constants.
//!
//! The high nibble of byte 0 of every link frame selects the frame type.
//! Frame types 0x3 (flow control) and above are not handled by this crate.

/// Single frame: whole payload of up to 7 bytes.
pub const SINGLE_FRAME: u8 = 0x0;

/// First frame of a segmented payload, carries the 12-bit total length.
pub const FIRST_FRAME: u8 = 0x1;

/// Consecutive frame of a segmented payload, carries a 4-bit sequence number.
pub const CONSECUTIVE_FRAME: u8 = 0x2;

/// Classic CAN link frame size.
pub const LINK_FRAME_SIZE: usize = 8;

/// Payload bytes carried by a single frame.
pub const SINGLE_FRAME_CAPACITY: usize = 7;

/// Payload bytes carried by a first frame.
pub const FIRST_FRAME_CAPACITY: usize = 6;

/// Payload bytes carried by a consecutive frame.
pub const CONSECUTIVE_FRAME_CAPACITY: usize = 7;

/// Largest total length expressible in the 12-bit first-frame length field.
pub const MAX_PAYLOAD: usize = 0x0FFF;

/// Sequence number of the first consecutive frame after a first frame.
pub const FIRST_SEQUENCE: u8 = 1;

/// Extracts the PCI type nibble from byte 0 of a frame.
pub fn pci_type(byte0: u8) -> u8 {
    byte0 >> 4
}

/// Returns the sequence number following `sn`, wrapping modulo 16.
pub fn next_sequence(sn: u8) -> u8 {
    sn.wrapping_add(1) & 0x0F
}

/// Returns a human-readable name for a PCI type nibble.
pub fn pci_name(pci: u8) -> &'static str {
    match pci {
        SINGLE_FRAME => "SF",
        FIRST_FRAME => "FF",
        CONSECUTIVE_FRAME => "CF",
        0x3 => "FC",
        _ => "UNKNOWN",
    }
}

/// Returns true if `len` fits in a single frame.
pub fn fits_single_frame(len: usize) -> bool {
    len <= SINGLE_FRAME_CAPACITY
}

use clap::{Args, Subcommand};
use isotp_frame::{FrameConfig, MAX_PAYLOAD};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::hex::parse_byte;
use crate::output::OutputFormat;

pub mod reassemble;
pub mod segment;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a payload into ISO-TP frames.
    Segment(SegmentArgs),
    /// Reassemble hex-encoded frames into payloads.
    Reassemble(ReassembleArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Segment(args) => segment::run(args, format),
        Command::Reassemble(args) => reassemble::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct LimitArgs {
    /// Maximum payload size in bytes (capped at 4095).
    #[arg(long, value_name = "BYTES", default_value_t = MAX_PAYLOAD, env = "ISOTP_MAX_PAYLOAD")]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Payload as hex bytes (e.g. "22 F1 90").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Payload as a raw string.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["hex", "data"])]
    pub file: Option<PathBuf>,
    /// Pad every frame to 8 bytes with this byte (e.g. AA, 0x55).
    #[arg(long, value_name = "BYTE", value_parser = parse_byte, env = "ISOTP_PADDING")]
    pub padding: Option<u8>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

impl SegmentArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.limits.max_payload,
            padding: self.padding,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReassembleArgs {
    /// Frames as hex, one per argument. Prefix with `<session>:` to
    /// reassemble interleaved sessions. Reads stdin when no frames or file
    /// are given.
    pub frames: Vec<String>,
    /// Read frames from file, one per line (`#` starts a comment).
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

impl ReassembleArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.limits.max_payload,
            ..FrameConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use isotp_frame::pci::{pci_name, pci_type};
use serde::Serialize;

use crate::hex::to_hex;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    index: usize,
    pci: &'a str,
    len: usize,
    frame: String,
}

pub fn print_frames<F: AsRef<[u8]>>(frames: &[F], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (index, frame) in frames.iter().enumerate() {
                let frame = frame.as_ref();
                let out = FrameOutput {
                    index,
                    pci: frame_pci(frame),
                    len: frame.len(),
                    frame: to_hex(frame),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "LEN", "FRAME"]);
            for (index, frame) in frames.iter().enumerate() {
                let frame = frame.as_ref();
                table.add_row(vec![
                    index.to_string(),
                    frame_pci(frame).to_string(),
                    frame.len().to_string(),
                    to_hex(frame),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} frame(s)", frames.len());
            for (index, frame) in frames.iter().enumerate() {
                let frame = frame.as_ref();
                println!("  [{index}] {}: {}", frame_pci(frame), to_hex(frame));
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                println!("{}", to_hex(frame.as_ref()));
            }
        }
    }
}

/// One Complete or Error event observed while reassembling.
#[derive(Debug, Serialize)]
pub struct EventOutput {
    pub line: usize,
    pub session: String,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl EventOutput {
    pub fn complete(line: usize, session: &str, payload: &[u8]) -> Self {
        Self {
            line,
            session: session.to_string(),
            event: "complete",
            payload_size: Some(payload.len()),
            payload: Some(to_hex(payload)),
            text: Some(payload_preview(payload)),
            error: None,
            raw: payload.to_vec(),
        }
    }

    pub fn error(line: usize, session: &str, reason: String) -> Self {
        Self {
            line,
            session: session.to_string(),
            event: "error",
            payload_size: None,
            payload: None,
            text: None,
            error: Some(reason),
            raw: Vec::new(),
        }
    }

    fn detail(&self) -> String {
        match (&self.payload, &self.error) {
            (Some(payload), _) => format!(
                "{} bytes: {} ({})",
                self.payload_size.unwrap_or_default(),
                payload,
                self.text.as_deref().unwrap_or_default()
            ),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        }
    }
}

pub fn print_events(events: &[EventOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for event in events {
                println!(
                    "{}",
                    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINE", "SESSION", "EVENT", "DETAIL"]);
            for event in events {
                table.add_row(vec![
                    event.line.to_string(),
                    event.session.clone(),
                    event.event.to_string(),
                    event.detail(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for event in events {
                println!(
                    "line={} session={} {}: {}",
                    event.line,
                    event.session,
                    event.event,
                    event.detail()
                );
            }
        }
        OutputFormat::Raw => {
            for event in events.iter().filter(|e| e.error.is_none()) {
                print_raw(&event.raw);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn frame_pci(frame: &[u8]) -> &'static str {
    frame
        .first()
        .map_or("EMPTY", |&byte0| pci_name(pci_type(byte0)))
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_shows_printable_text_only() {
        assert_eq!(payload_preview(b"This a long m"), "This a long m");
        assert_eq!(payload_preview(&[0x22, 0xF1, 0x90]), "<binary 3 bytes>");
        assert_eq!(payload_preview(&[0x10, 0x03]), "<binary 2 bytes>");
    }

    #[test]
    fn event_json_omits_absent_fields() {
        let event = EventOutput::error(4, "default", "unknown PCI type: 3".to_string());
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["line"], 4);
        assert!(json.get("payload").is_none());
        assert!(json.get("raw").is_none());
    }

    #[test]
    fn frame_pci_names() {
        assert_eq!(frame_pci(&[0x03, 0x22]), "SF");
        assert_eq!(frame_pci(&[0x10, 0x08]), "FF");
        assert_eq!(frame_pci(&[]), "EMPTY");
    }
}

use std::fs;
use std::io::Read;

use bytes::Bytes;
use isotp_frame::{FrameError, ReassemblyHandler, SessionMap};

use crate::cmd::ReassembleArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::hex::parse_hex;
use crate::output::{print_events, EventOutput, OutputFormat};

/// Session key used for lines without a `<session>:` prefix.
const DEFAULT_SESSION: &str = "default";

pub fn run(args: ReassembleArgs, format: OutputFormat) -> CliResult<i32> {
    let input = collect_input(&args)?;
    let mut sessions: SessionMap<String> = SessionMap::with_config(args.frame_config());
    let mut recorder = EventRecorder::default();

    for (index, line) in input.lines().enumerate() {
        recorder.line = index + 1;
        let entry = match parse_line(line) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(err) => {
                recorder.reject_line(split_session(line.trim()).0, &err.message);
                continue;
            }
        };
        recorder.session.clone_from(&entry.session);
        sessions.feed_with(entry.session, &entry.frame, &mut recorder);
    }

    for (session, rx) in sessions.in_progress() {
        tracing::warn!(
            session = %session,
            expected = rx.expected_len(),
            received = rx.received_len(),
            "reassembly incomplete at end of input"
        );
    }

    print_events(&recorder.events, format);

    if recorder.errors > 0 {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

#[derive(Default)]
struct EventRecorder {
    line: usize,
    session: String,
    errors: usize,
    events: Vec<EventOutput>,
}

impl EventRecorder {
    fn reject_line(&mut self, session: &str, reason: &str) {
        tracing::warn!(line = self.line, session, reason, "frame line skipped");
        self.errors += 1;
        self.events
            .push(EventOutput::error(self.line, session, reason.to_string()));
    }
}

impl ReassemblyHandler for EventRecorder {
    fn on_complete(&mut self, payload: Bytes) {
        tracing::info!(
            session = %self.session,
            line = self.line,
            payload_size = payload.len(),
            "payload reassembled"
        );
        self.events
            .push(EventOutput::complete(self.line, &self.session, &payload));
    }

    fn on_error(&mut self, error: &FrameError) {
        self.errors += 1;
        self.events
            .push(EventOutput::error(self.line, &self.session, error.to_string()));
    }
}

#[derive(Debug, PartialEq, Eq)]
struct FrameLine {
    session: String,
    frame: Vec<u8>,
}

fn parse_line(line: &str) -> CliResult<Option<FrameLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (session, hex) = split_session(line);
    Ok(Some(FrameLine {
        session: session.to_string(),
        frame: parse_hex(hex)?,
    }))
}

fn split_session(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((session, hex)) => (session.trim(), hex),
        None => (DEFAULT_SESSION, line),
    }
}

fn collect_input(args: &ReassembleArgs) -> CliResult<String> {
    let mut input = args.frames.join("\n");

    if let Some(path) = &args.file {
        let contents = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        if !input.is_empty() {
            input.push('\n');
        }
        input.push_str(&contents);
    }

    if args.frames.is_empty() && args.file.is_none() {
        std::io::stdin()
            .read_to_string(&mut input)
            .map_err(|err| io_error("failed reading stdin", err))?;
    }

    Ok(input)
}

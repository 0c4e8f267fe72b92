use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::codec::FrameConfig;
use crate::error::Result;
use crate::reassembler::{FeedOutcome, FrameReassembler, ReassemblyHandler};

/// Session-keyed reassembly for interleaved diagnostic conversations.
///
/// Owned by the caller; there is no shared registry. A session holds a
/// [`FrameReassembler`] only while a segmented payload is in flight: the entry
/// is created by a first frame and dropped again on completion or on an
/// error that resets the reassembler.
#[derive(Debug)]
pub struct SessionMap<K> {
    sessions: HashMap<K, FrameReassembler>,
    config: FrameConfig,
}

impl<K: Eq + Hash> Default for SessionMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> SessionMap<K> {
    /// Create an empty map whose reassemblers use default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an empty map whose reassemblers use `config`.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Feed one frame to the reassembler of session `key`.
    pub fn feed(&mut self, key: K, frame: &[u8]) -> Result<FeedOutcome> {
        match self.sessions.entry(key) {
            Entry::Occupied(mut entry) => {
                let result = entry.get_mut().feed(frame);
                if entry.get().is_idle() {
                    entry.remove();
                    debug!(sessions = self.sessions.len(), "session closed");
                }
                result
            }
            Entry::Vacant(entry) => {
                let mut reassembler = FrameReassembler::with_config(self.config.clone());
                let result = reassembler.feed(frame);
                if !reassembler.is_idle() {
                    entry.insert(reassembler);
                    debug!(sessions = self.sessions.len(), "session opened");
                }
                result
            }
        }
    }

    /// Feed one frame to session `key` and report the outcome to `handler`.
    pub fn feed_with<H>(&mut self, key: K, frame: &[u8], handler: &mut H)
    where
        H: ReassemblyHandler + ?Sized,
    {
        match self.feed(key, frame) {
            Ok(FeedOutcome::Complete(payload)) => handler.on_complete(payload),
            Ok(FeedOutcome::Pending) => {}
            Err(err) => handler.on_error(&err),
        }
    }

    /// Reassembler of an in-flight session.
    pub fn get(&self, key: &K) -> Option<&FrameReassembler> {
        self.sessions.get(key)
    }

    /// Discard the in-flight payload of `key`. Returns true if one existed.
    pub fn reset(&mut self, key: &K) -> bool {
        self.sessions.remove(key).is_some()
    }

    /// Remove and return the reassembler of `key`.
    pub fn remove(&mut self, key: &K) -> Option<FrameReassembler> {
        self.sessions.remove(key)
    }

    /// Sessions with a segmented payload in flight.
    pub fn in_progress(&self) -> impl Iterator<Item = (&K, &FrameReassembler)> {
        self.sessions.iter()
    }

    /// Number of in-flight sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is in flight.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Discard every in-flight session.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Configuration applied to new sessions.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::builder::build_frames;
    use crate::error::FrameError;

    #[test]
    fn interleaved_sessions_reassemble_independently() {
        let a: Vec<u8> = (0..30).collect();
        let b: Vec<u8> = (100..125).collect();
        let frames_a = build_frames(&a).unwrap();
        let frames_b = build_frames(&b).unwrap();

        let mut sessions = SessionMap::new();
        let mut done = Vec::new();

        let longest = frames_a.len().max(frames_b.len());
        for i in 0..longest {
            if let Some(frame) = frames_a.get(i) {
                if let FeedOutcome::Complete(p) = sessions.feed(0x7E8u32, frame).unwrap() {
                    done.push((0x7E8u32, p));
                }
            }
            if let Some(frame) = frames_b.get(i) {
                if let FeedOutcome::Complete(p) = sessions.feed(0x7E9u32, frame).unwrap() {
                    done.push((0x7E9u32, p));
                }
            }
        }

        assert_eq!(
            done,
            vec![(0x7E9, Bytes::from(b)), (0x7E8, Bytes::from(a))]
        );
        assert!(sessions.is_empty());
    }

    #[test]
    fn entries_exist_only_while_accumulating() {
        let mut sessions = SessionMap::new();

        sessions.feed("ecu", &[0x02, 0x10, 0x03]).unwrap();
        assert!(sessions.is_empty());

        sessions.feed("ecu", &[0x10, 0x09, 1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(sessions.len(), 1);
        let rx = sessions.get(&"ecu").unwrap();
        assert_eq!(rx.expected_len(), Some(9));
        assert_eq!(rx.received_len(), 6);
        assert_eq!(sessions.in_progress().count(), 1);

        sessions.feed("ecu", &[0x21, 7, 8, 9]).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn stray_consecutive_frame_does_not_create_session() {
        let mut sessions: SessionMap<u8> = SessionMap::new();
        let err = sessions.feed(1, &[0x21, 0xAA]).unwrap_err();
        assert_eq!(err, FrameError::ConsecutiveWithoutFirst);
        assert!(sessions.is_empty());
    }

    #[test]
    fn error_closes_only_the_affected_session() {
        let mut sessions = SessionMap::new();
        sessions.feed(1u8, &[0x10, 0x10, 0, 0, 0, 0, 0, 0]).unwrap();
        sessions.feed(2u8, &[0x10, 0x10, 0, 0, 0, 0, 0, 0]).unwrap();

        let err = sessions.feed(1, &[0x22, 0, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::SequenceMismatch { .. }));
        assert!(sessions.get(&1).is_none());
        assert!(sessions.get(&2).is_some());
    }

    #[test]
    fn malformed_single_frame_keeps_session_open() {
        let mut sessions = SessionMap::new();
        sessions.feed(7u8, &[0x10, 0x09, 1, 2, 3, 4, 5, 6]).unwrap();

        assert!(sessions.feed(7, &[0x06, 0xAA]).is_err());
        assert_eq!(sessions.len(), 1);

        assert_eq!(
            sessions.feed(7, &[0x21, 7, 8, 9]).unwrap(),
            FeedOutcome::Complete(Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8, 9]))
        );
        assert!(sessions.is_empty());
    }

    #[test]
    fn reset_and_remove() {
        let mut sessions = SessionMap::new();
        sessions.feed('a', &[0x10, 0x10, 0, 0, 0, 0, 0, 0]).unwrap();
        sessions.feed('b', &[0x10, 0x10, 0, 0, 0, 0, 0, 0]).unwrap();

        assert!(sessions.reset(&'a'));
        assert!(!sessions.reset(&'a'));
        assert!(sessions.remove(&'b').is_some());
        assert!(sessions.is_empty());

        sessions.feed('c', &[0x10, 0x10, 0, 0, 0, 0, 0, 0]).unwrap();
        sessions.clear();
        assert!(sessions.is_empty());
    }

    #[test]
    fn feed_with_routes_events() {
        let mut sessions = SessionMap::new();
        let mut completed = Vec::new();
        let mut errors = Vec::new();
        let mut events = crate::reassembler::handler(
            |payload: Bytes| completed.push(payload),
            |err: &FrameError| errors.push(err.clone()),
        );

        sessions.feed_with(5u16, &[0x01, 0x51], &mut events);
        sessions.feed_with(5u16, &[0x40], &mut events);
        drop(events);

        assert_eq!(completed, vec![Bytes::from_static(&[0x51])]);
        assert_eq!(errors, vec![FrameError::UnknownPciType(4)]);
    }

    #[test]
    fn sessions_inherit_config() {
        let config = FrameConfig {
            max_payload_size: 32,
            ..FrameConfig::default()
        };
        let mut sessions = SessionMap::with_config(config.clone());
        assert_eq!(sessions.config(), &config);

        let err = sessions.feed(0u8, &[0x10, 0x40, 0, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 64, max: 32 }));
    }
}

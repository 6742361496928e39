//! Exit-status sentinel protocol for streamed output
//!
//! A streamed command runs under a PTY, which merges its exit status into the
//! terminal close instead of a usable channel message, so the wrapper appends
//! a sentinel line `EXIT_CODE:<n>` to the output. [`StreamAssembler`] forwards
//! incoming frames to the consumer while guaranteeing the sentinel itself is
//! never surfaced as content, then recovers the numeric status from the
//! retained trailing text once the stream ends.

use std::sync::OnceLock;

use regex::Regex;

/// Marker emitted after a streamed command completes, followed by its status.
///
/// A command whose legitimate output contains this exact substring will be
/// misparsed; the contract accepts that rather than paying for a randomized
/// per-invocation marker.
pub const SENTINEL: &str = "EXIT_CODE:";

/// Status reported when a stream ends without its sentinel, e.g. when the
/// session died mid-stream
pub const MISSING_STATUS_CODE: i32 = -1;

fn sentinel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"EXIT_CODE:(\d+)").expect("static pattern compiles"))
}

/// Incremental reassembly of a streamed command's output.
///
/// Feed each received frame through [`push`](Self::push) and forward whatever
/// it returns; call [`finish`](Self::finish) when the stream ends. The
/// assembler withholds the last `SENTINEL.len() - 1` bytes of pending text
/// until more input arrives, so a sentinel straddling a frame boundary is
/// still caught before any of it reaches the consumer.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    /// Received text not yet forwarded
    pending: String,
    /// Trailing text retained for the status scan once the sentinel is seen
    tail: String,
    sentinel_seen: bool,
}

impl StreamAssembler {
    /// Creates an assembler with no buffered text
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received frame and returns the text safe to forward, if any.
    ///
    /// Returns `None` once the sentinel has been seen, or while all pending
    /// text could still be the start of a sentinel.
    pub fn push(&mut self, frame: &str) -> Option<String> {
        if self.sentinel_seen {
            self.tail.push_str(frame);
            return None;
        }

        self.pending.push_str(frame);

        if let Some(idx) = self.pending.find(SENTINEL) {
            self.sentinel_seen = true;
            self.tail = self.pending.split_off(idx);
            let chunk = std::mem::take(&mut self.pending);
            return (!chunk.is_empty()).then_some(chunk);
        }

        // Hold back a potential sentinel prefix at the end of pending text
        let holdback = SENTINEL.len() - 1;
        if self.pending.len() <= holdback {
            return None;
        }
        let mut cut = self.pending.len() - holdback;
        while !self.pending.is_char_boundary(cut) {
            cut += 1;
        }
        let rest = self.pending.split_off(cut);
        let chunk = std::mem::replace(&mut self.pending, rest);
        (!chunk.is_empty()).then_some(chunk)
    }

    /// Ends the stream and extracts the exit status from the retained text.
    ///
    /// Returns [`MISSING_STATUS_CODE`] when no sentinel was received.
    #[must_use]
    pub fn finish(self) -> i32 {
        let scan = if self.sentinel_seen {
            &self.tail
        } else {
            &self.pending
        };
        sentinel_pattern()
            .captures_iter(scan)
            .last()
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(MISSING_STATUS_CODE)
    }
}

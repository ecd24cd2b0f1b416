//! Buffers raw upstream text chunks and decides when to flush them on to
//! the SSE client: enough characters accumulated, optionally sitting on a
//! natural word/sentence boundary, and enough wall-clock time since the
//! last flush to avoid a chunk-per-token firehose.

use tokio::time::Instant;

const DEFAULT_MIN_CHARS_BEFORE_EMIT: usize = 8;
const DEFAULT_EMIT_ON_BOUNDARY: bool = true;
const DEFAULT_THROTTLE_MS: u64 = 40;

fn is_boundary_char(c: char) -> bool {
    c.is_whitespace() || ".,;:!?)]}\"'".contains(c)
}

pub struct StreamEmitter {
    min_chars_before_emit: usize,
    emit_on_boundary: bool,
    throttle: std::time::Duration,
    buffer: String,
    /// `None` until the first emit — there's nothing to throttle against yet,
    /// so the first emit is never held back waiting for `throttle` to pass.
    last_emit: Option<Instant>,
}

impl StreamEmitter {
    pub fn new(min_chars_before_emit: usize, emit_on_boundary: bool, throttle_ms: u64) -> Self {
        Self {
            min_chars_before_emit,
            emit_on_boundary,
            throttle: std::time::Duration::from_millis(throttle_ms),
            buffer: String::new(),
            last_emit: None,
        }
    }

    /// Appends `chunk` to the internal buffer and, if all flush conditions
    /// now hold, drains and returns the buffer. Returns `None` otherwise.
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        self.buffer.push_str(chunk);
        if self.should_emit() {
            Some(self.drain())
        } else {
            None
        }
    }

    fn should_emit(&self) -> bool {
        if self.buffer.chars().count() < self.min_chars_before_emit {
            return false;
        }
        if self.emit_on_boundary {
            let last_char = self.buffer.chars().next_back();
            if !last_char.is_some_and(is_boundary_char) {
                return false;
            }
        }
        self.last_emit.is_none_or(|t| t.elapsed() >= self.throttle)
    }

    fn drain(&mut self) -> String {
        self.last_emit = Some(Instant::now());
        std::mem::take(&mut self.buffer)
    }

    /// Unconditional final flush on upstream termination. Returns `None`
    /// when there's nothing left to send.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.drain())
        }
    }
}

impl Default for StreamEmitter {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_CHARS_BEFORE_EMIT,
            DEFAULT_EMIT_ON_BOUNDARY,
            DEFAULT_THROTTLE_MS,
        )
    }
}

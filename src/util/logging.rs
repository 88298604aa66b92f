//! # Receive Path Logging Utilities
//!
//! Logging helpers shared by the decoders and the receiver loop.
//!
//! ## Features
//!
//! - Rate-limited logging, since a noisy band produces a steady stream of
//!   messages that fail every integrity check
//! - Hex dumps of raw messages at debug level
//! - Optional tracing spans around decoding (`tracing` feature)
//!
//! ## Usage
//!
//! ```rust
//! use bresser_rs::util::logging::{log_message_hex, LogThrottle};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("No free sensor slot");
//! }
//! log_message_hex("RX", &[0xD4, 0xEA, 0xEC]);
//! ```

use std::time::Instant;

/// Windowed rate limiter for log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Window length in milliseconds
    window_ms: u64,
    /// Messages allowed per window
    cap: u32,
    count: u32,
    suppressed: u64,
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle allowing `cap` messages per `window_ms`
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Returns `true` if the message should be logged.
    ///
    /// The count restarts once the window has elapsed.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0).as_millis() as u64 > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Total number of messages suppressed since creation
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Start a new window immediately
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log a raw message in hex at debug level
///
/// Output is capped at 64 bytes.
pub fn log_message_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    if data.len() > MAX_LOG_BYTES {
        log::debug!("{prefix}: {hex_str} ... ({} bytes total)", data.len());
    } else {
        log::debug!("{prefix}: {hex_str}");
    }
}

/// Log the outcome of an integrity check
pub fn log_integrity_result(format: &str, expected: u16, calculated: u16) {
    if expected == calculated {
        log::debug!("[{format}] integrity ok: {expected:04X}");
    } else {
        log::debug!("[{format}] integrity mismatch: expected {expected:04X}, calculated {calculated:04X}");
    }
}

/// Create a tracing span for one decoder attempt
#[cfg(feature = "tracing")]
pub fn span_decode(format: &'static str) -> tracing::span::EnteredSpan {
    tracing::debug_span!("decode", format = format).entered()
}

/// No-op when tracing is disabled
#[cfg(not(feature = "tracing"))]
pub fn span_decode(_format: &'static str) {}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

/// Log a debug message with throttling
#[macro_export]
macro_rules! log_debug_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::debug!($($arg)*);
        }
    };
}

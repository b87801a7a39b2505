//! Session configuration (spec §4.G "Settings").

use crate::frame::Frame;
use std::time::Duration;

/// Diagnostic/log sink. No backend is bundled; by default `Session`
/// routes these through the `log` crate instead of calling anything
/// here, matching the teacher crate's split between the library (no
/// logging backend) and its examples (`env_logger`, dev-only).
pub type LogCallback = Box<dyn Fn(&str) + Send>;

/// Per-frame diagnostic hook (spec §4.G), fired for every accepted
/// frame in addition to the ordinary message delivery.
pub type FrameCallback = Box<dyn Fn(&Frame) + Send>;

/// Polled during potentially-blocking transport operations; returning
/// `false` aborts the operation with `CancelledOperation`.
pub type CancelCallback = Box<dyn Fn() -> bool + Send>;

/// Tunables and injectable collaborators for a [`crate::session::Session`].
pub struct Settings {
    /// Caps both a single frame's payload and a fragmented message's
    /// total reassembled size (spec §4.C: "the reassembly buffer,
    /// sized to max_frame_size"). Default 65536; Autobahn-style
    /// testing needs this configurable up to ~32 MiB.
    pub max_frame_size: usize,
    /// Outgoing payloads are masked and written in chunks of this
    /// size (spec §4.G `send_frame` algorithm). Default 65536.
    pub write_chunk_size: usize,
    /// Fixed budget from sending a local Close frame to force-closing
    /// if the peer never replies (spec §5). Exposed here (rather than
    /// hardcoded) purely so tests don't have to wait out the real 2s.
    pub close_handshake_timeout: Duration,
    pub log_callback: Option<LogCallback>,
    pub frame_callback: Option<FrameCallback>,
    pub cancel_callback: Option<CancelCallback>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}

#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.settings.max_frame_size = size;
        self
    }

    pub fn write_chunk_size(mut self, size: usize) -> Self {
        self.settings.write_chunk_size = size;
        self
    }

    pub fn close_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.settings.close_handshake_timeout = timeout;
        self
    }

    pub fn log_callback(mut self, callback: LogCallback) -> Self {
        self.settings.log_callback = Some(callback);
        self
    }

    pub fn frame_callback(mut self, callback: FrameCallback) -> Self {
        self.settings.frame_callback = Some(callback);
        self
    }

    pub fn cancel_callback(mut self, callback: CancelCallback) -> Self {
        self.settings.cancel_callback = Some(callback);
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_frame_size: crate::parser::DEFAULT_MAX_FRAME_SIZE,
            write_chunk_size: 65536,
            close_handshake_timeout: Duration::from_secs(2),
            log_callback: None,
            frame_callback: None,
            cancel_callback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_spec_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_frame_size, 65536);
        assert_eq!(settings.write_chunk_size, 65536);
        assert_eq!(settings.close_handshake_timeout, Duration::from_secs(2));
    }

    #[test]
    fn builder_overrides_defaults() {
        let settings = Settings::builder()
            .max_frame_size(32 << 20)
            .close_handshake_timeout(Duration::from_millis(50))
            .build();
        assert_eq!(settings.max_frame_size, 32 << 20);
        assert_eq!(settings.close_handshake_timeout, Duration::from_millis(50));
    }
}

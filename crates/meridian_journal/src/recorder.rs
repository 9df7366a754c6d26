//! Frame recording during a live room run.

use meridian_core::StateHash;
use serde_json::Value;

use crate::frame::{FrameLog, RecordedInput, RecordedServerEvent, TickFrame};

/// What a recorder captures beyond the inputs themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    /// Seal each frame with the post-tick state hash
    pub state_hashes: bool,
    /// Seal each frame with a full snapshot side-channel (heavy; enables
    /// field-level mismatch localization during reevaluation)
    pub snapshots: bool,
    /// Capture server-emitted events
    pub server_events: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            state_hashes: true,
            snapshots: false,
            server_events: true,
        }
    }
}

/// Accumulates inputs into the open frame and seals one frame per tick
///
/// Inputs arriving between ticks are recorded under the frame the next
/// `seal_frame` closes, preserving arrival order within the frame.
#[derive(Debug)]
pub struct Recorder {
    options: RecordOptions,
    log: FrameLog,
    open: TickFrame,
}

impl Recorder {
    /// Start recording; the open frame is tick 0
    #[must_use]
    pub fn new(options: RecordOptions) -> Self {
        Self {
            options,
            log: FrameLog::new(),
            open: TickFrame::new(0),
        }
    }

    /// The capture options
    #[must_use]
    pub fn options(&self) -> &RecordOptions {
        &self.options
    }

    /// Tick number of the open frame
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.open.tick
    }

    /// Record an input under the open frame
    pub fn record_input(&mut self, input: RecordedInput) {
        self.open.inputs.push(input);
    }

    /// Record a server-emitted event, if the options capture them
    pub fn record_server_event(&mut self, event: RecordedServerEvent) {
        if self.options.server_events {
            self.open.server_events.push(event);
        }
    }

    /// Seal the open frame with post-tick verification data and open the
    /// next one
    ///
    /// The hash and snapshot are kept only when the options ask for them.
    pub fn seal_frame(&mut self, state_hash: StateHash, snapshot: Option<Value>) {
        let next = TickFrame::new(self.open.tick + 1);
        let mut sealed = std::mem::replace(&mut self.open, next);
        if self.options.state_hashes {
            sealed.state_hash = Some(state_hash);
        }
        if self.options.snapshots {
            sealed.snapshot = snapshot;
        }
        self.log.push(sealed);
    }

    /// Stop recording and yield the log
    ///
    /// An open frame with recorded content is kept unsealed (no hash); an
    /// empty open frame is dropped.
    #[must_use]
    pub fn finish(mut self) -> FrameLog {
        if !self.open.is_empty() {
            let tick = self.open.tick;
            self.log.push(std::mem::replace(&mut self.open, TickFrame::new(tick)));
        }
        self.log
    }

    /// The frames sealed so far
    #[must_use]
    pub fn log(&self) -> &FrameLog {
        &self.log
    }
}

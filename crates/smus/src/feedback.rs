//! Conversion feedback (errors, warnings, notes).
//!
//! Decoding is generous: anomalies inside a score (unknown events, dangling
//! ties, notes without an instrument) are recorded here and the conversion
//! carries on. Every entry is also sent to `tracing` as it is recorded.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// A single diagnostic, anchored at a byte offset in the input buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
    pub offset: usize,
}

impl Feedback {
    pub fn error(message: impl Into<String>, offset: usize) -> Self {
        Feedback {
            level: FeedbackLevel::Error,
            message: message.into(),
            offset,
        }
    }

    pub fn warning(message: impl Into<String>, offset: usize) -> Self {
        Feedback {
            level: FeedbackLevel::Warning,
            message: message.into(),
            offset,
        }
    }

    pub fn info(message: impl Into<String>, offset: usize) -> Self {
        Feedback {
            level: FeedbackLevel::Info,
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackLevel {
    /// Something was dropped from the output
    Error,
    /// Converted with a substitution the score did not ask for
    Warning,
    /// Informational only
    Info,
}

/// Collector for feedback during a conversion
#[derive(Debug, Default)]
pub struct FeedbackCollector {
    feedback: Vec<Feedback>,
    offset: usize,
}

impl FeedbackCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the byte offset new entries are anchored at
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(offset = self.offset, "{}", message);
        self.feedback.push(Feedback::error(message, self.offset));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(offset = self.offset, "{}", message);
        self.feedback.push(Feedback::warning(message, self.offset));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(offset = self.offset, "{}", message);
        self.feedback.push(Feedback::info(message, self.offset));
    }

    pub fn has_errors(&self) -> bool {
        self.feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Error)
    }

    pub fn into_feedback(self) -> Vec<Feedback> {
        self.feedback
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }
}

//! Side-channel notifications (toasts) for dashboard consumers

use serde::{Deserialize, Serialize};
use vantage_core::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Which part of the engine raised the notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSource {
    Refresh,
    Action,
}

/// A non-blocking, user-visible message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub source: NoticeSource,
    pub message: String,
    pub timestamp: Timestamp,
}

impl Notice {
    pub fn new(
        level: NoticeLevel,
        source: NoticeSource,
        message: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            level,
            source,
            message: message.into(),
            timestamp,
        }
    }

    /// A refresh pass failed and the last good state was kept
    pub fn refresh_failed(message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(NoticeLevel::Error, NoticeSource::Refresh, message, timestamp)
    }

    /// An action was rejected before anything was written
    pub fn action_rejected(message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(NoticeLevel::Warning, NoticeSource::Action, message, timestamp)
    }

    /// An action reached a collaborator and failed there
    pub fn action_failed(message: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(NoticeLevel::Error, NoticeSource::Action, message, timestamp)
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

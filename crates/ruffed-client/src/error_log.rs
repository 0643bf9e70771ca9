//! Bounded log of request failures.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One recorded failure, in the shape `POST /logs/error` accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            operation: None,
            message: message.into(),
            status: None,
            url: None,
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(operation: Option<&str>, error: &Error) -> Self {
        let url = match error {
            Error::Http { url, .. } => Some(url.clone()),
            Error::Transport(e) => e.url().map(|u| u.to_string()),
            _ => None,
        };
        Self {
            operation: operation.map(str::to_string),
            message: error.user_message(),
            status: error.status(),
            url,
            timestamp: Utc::now(),
        }
    }
}

/// In-memory ring of the most recent [`ErrorEvent`]s; the oldest entry is
/// dropped once `max_errors` is reached.
#[derive(Debug)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ErrorEvent>>,
    max_errors: usize,
    forward: bool,
}

impl ErrorLog {
    pub fn new(max_errors: usize, forward_to_server: bool) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_errors.min(1024))),
            max_errors,
            forward: forward_to_server,
        }
    }

    pub fn record(&self, event: ErrorEvent) {
        tracing::error!(
            operation = event.operation.as_deref().unwrap_or("-"),
            status = event.status,
            url = event.url.as_deref().unwrap_or("-"),
            "{}",
            event.message
        );

        if self.max_errors == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.max_errors {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    /// Entries from oldest to newest.
    pub fn recent(&self) -> Vec<ErrorEvent> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    pub fn forwards_to_server(&self) -> bool {
        self.forward
    }
}

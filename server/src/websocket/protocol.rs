//! WebSocket message protocol definitions.
//!
//! All messages are JSON objects tagged by `type`, with snake_case names.

use jobsync_engine::{JobFilter, JobPage, NotificationView, Pagination, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

use crate::live::JobView;
use crate::notifications::AlertCue;
use crate::sync::SyncEvent;

/// A live feed a connection can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Jobs,
    Notifications,
}

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Follow a filtered job page. Replaces any previous job subscription.
    SubscribeJobs {
        #[serde(default)]
        filter: JobFilter,
        /// 1-based page number
        #[serde(default)]
        page: Option<usize>,
        #[serde(default)]
        page_size: Option<usize>,
        /// Every matching job on one page
        #[serde(default)]
        all: bool,
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Follow the current user's notification view.
    SubscribeNotifications {
        #[serde(default)]
        request_id: Option<String>,
    },

    Unsubscribe { topic: Topic },

    /// Keep-alive ping.
    Ping,
}

impl ClientMessage {
    /// Build the job view a `subscribe_jobs` message asks for.
    pub fn job_view(
        filter: JobFilter,
        page: Option<usize>,
        page_size: Option<usize>,
        all: bool,
    ) -> JobView {
        JobView {
            filter,
            pagination: Pagination {
                page: page.unwrap_or(1),
                page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
                all,
            },
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current page of a job subscription; sent on subscribe and on change.
    JobsPage {
        page: JobPage,
        /// Request ID of the subscribe message, on the first page only
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Current notification view; sent on subscribe and on change.
    Notifications {
        view: NotificationView,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Play the high-priority cue. Sent to every connection.
    AlertCue { cue: AlertCue },

    /// Sync pass progress. Sent to every connection.
    SyncEvent { event: SyncEvent },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }
}

//! Job state model for progress tracking and polling.
//!
//! A [`Job`] tracks one render's lifecycle from creation to a terminal
//! state. Within a single attempt the status is monotonic:
//! `initializing -> rendering -> {completed | error}`; nothing transitions
//! back out of a terminal state and there is no retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job created, duration probing / plan compilation in progress.
    #[default]
    Initializing,
    /// Engine process running, progress updates flowing.
    Rendering,
    /// Engine exited zero; output artifact available.
    Completed,
    /// Engine exited non-zero or could not be launched.
    Error,
    /// Registry sentinel for an unknown job id. Never stored.
    NotFound,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::Rendering => "rendering",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::NotFound => "not_found",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracked state for one render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier, issued at request time.
    pub job_id: String,
    /// Current job status.
    pub status: JobStatus,
    /// Progress percentage (0-100).
    pub progress: u8,
    /// Estimated seconds remaining.
    pub eta: u64,
    /// Output locator, populated only once completed.
    pub url: Option<String>,
    /// When the job was created.
    pub started_at: DateTime<Utc>,
    /// When the state was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the initializing state.
    pub fn new(job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Initializing,
            progress: 0,
            eta: 0,
            url: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a progress update. Ignored once terminal; progress implies the
    /// engine is running, so the status moves to rendering.
    pub fn set_progress(&mut self, progress: u8, eta: u64) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Rendering;
        self.progress = progress.min(100);
        self.eta = eta;
        self.updated_at = Utc::now();
    }

    /// Mark the job as successfully completed with its output locator.
    pub fn complete(&mut self, url: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.eta = 0;
        self.url = Some(url.into());
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed. No output locator is retained.
    pub fn fail(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Error;
        self.eta = 0;
        self.updated_at = Utc::now();
    }

    /// Point-in-time view for pollers.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            progress: self.progress,
            eta: self.eta,
            url: self.url.clone(),
        }
    }
}

/// What a polling client sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: u8,
    pub eta: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl JobSnapshot {
    /// Snapshot returned for an unknown job id.
    pub fn not_found() -> Self {
        Self {
            status: JobStatus::NotFound,
            progress: 0,
            eta: 0,
            url: None,
        }
    }
}

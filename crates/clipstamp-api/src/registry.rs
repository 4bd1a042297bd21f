//! In-memory job registry.
//!
//! Process-lifetime, injectable single source of truth for status polling.
//! Each job is mutated only by the one supervisor task that owns it; pollers
//! read racing point-in-time snapshots, which is safe because there is
//! exactly one writer per key.

use std::collections::HashMap;

use tokio::sync::RwLock;

use clipstamp_models::{Job, JobSnapshot};

/// Concurrent map from job identifier to job state.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a job in the `initializing` state.
    pub async fn create(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job_id.to_string(), Job::new(job_id));
    }

    /// Apply a progress update. No-op for unknown ids or terminal jobs.
    pub async fn update_progress(&self, job_id: &str, progress: u8, eta: u64) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.set_progress(progress, eta);
        }
    }

    /// Transition a job to terminal success with its output locator.
    pub async fn complete(&self, job_id: &str, url: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.complete(url);
        }
    }

    /// Transition a job to terminal error.
    pub async fn fail(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.fail();
        }
    }

    /// Current snapshot, or `None` for an unknown identifier (the handler
    /// surfaces the `not_found` sentinel).
    pub async fn get(&self, job_id: &str) -> Option<JobSnapshot> {
        let jobs = self.jobs.read().await;
        jobs.get(job_id).map(|job| job.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstamp_models::JobStatus;

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = JobRegistry::new();
        registry.create("j1").await;

        let snap = registry.get("j1").await.unwrap();
        assert_eq!(snap.status, JobStatus::Initializing);
        assert_eq!(snap.progress, 0);
        assert!(snap.url.is_none());

        assert!(registry.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_progress_then_complete() {
        let registry = JobRegistry::new();
        registry.create("j1").await;

        registry.update_progress("j1", 30, 14).await;
        let snap = registry.get("j1").await.unwrap();
        assert_eq!(snap.status, JobStatus::Rendering);
        assert_eq!(snap.progress, 30);
        assert_eq!(snap.eta, 14);

        registry.complete("j1", "/stream/final_j1.mp4").await;
        let snap = registry.get("j1").await.unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.progress, 100);
        assert_eq!(snap.url.as_deref(), Some("/stream/final_j1.mp4"));
    }

    #[tokio::test]
    async fn test_terminal_jobs_ignore_updates() {
        let registry = JobRegistry::new();
        registry.create("j1").await;
        registry.fail("j1").await;

        registry.update_progress("j1", 80, 3).await;
        registry.complete("j1", "/stream/final_j1.mp4").await;

        let snap = registry.get("j1").await.unwrap();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(snap.url.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_updates_are_noops() {
        let registry = JobRegistry::new();
        registry.update_progress("ghost", 50, 1).await;
        registry.complete("ghost", "/x").await;
        assert!(registry.get("ghost").await.is_none());
    }
}

//! Render supervisor.
//!
//! Owns the subprocess lifecycle for one job: probe, plan compilation,
//! engine launch, progress forwarding, terminal transition, and deferred
//! cleanup of transient inputs. Per job state machine:
//! `initializing -> rendering -> {completed | error}`.
//!
//! Progress and exit events flow through a per-job channel with a single
//! consumer applying them to the registry, so there is exactly one writer
//! per registry key by construction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use clipstamp_media::{
    probe_duration, render_duration, EngineCommand, EngineRunner, ProgressTracker, ProgressUpdate,
    RenderPlan, TextLayers,
};
use clipstamp_models::{RenderMode, RenderRequest, DEFAULT_WATERMARK_TEXT};
use clipstamp_storage::LocalStore;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::registry::JobRegistry;

/// Events posted by the engine-facing tasks, applied by one consumer.
enum RenderEvent {
    Progress(ProgressUpdate),
    Exited(clipstamp_media::MediaResult<()>),
}

/// Spawns and supervises render jobs.
#[derive(Clone)]
pub struct RenderService {
    config: ApiConfig,
    store: Arc<LocalStore>,
    registry: Arc<JobRegistry>,
}

impl RenderService {
    pub fn new(config: ApiConfig, store: Arc<LocalStore>, registry: Arc<JobRegistry>) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }

    /// Accept a render request: validate, issue a job id, create the
    /// registry entry, and hand off to a supervising task. Returns before
    /// rendering begins in earnest.
    ///
    /// Missing or incomplete uploads are reported synchronously and no job
    /// is created.
    pub async fn submit(&self, req: RenderRequest) -> ApiResult<String> {
        req.validate()?;

        let visual = req.visual_file()?.to_string();
        for name in [visual.as_str(), req.audio_file.as_str()] {
            if !self.store.upload_exists(name).await {
                return Err(ApiError::bad_request(format!("Missing upload: {name}")));
            }
        }

        let job_id = Uuid::new_v4().simple().to_string();
        self.registry.create(&job_id).await;

        info!(job_id = %job_id, mode = ?req.mode, "Render job accepted");

        let service = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            service.supervise(id, req).await;
        });

        Ok(job_id)
    }

    /// Drive one job to a terminal state, then clean up its inputs. The
    /// cleanup runs on every path, including a staging failure that never
    /// launched the engine.
    async fn supervise(&self, job_id: String, req: RenderRequest) {
        match self.stage_inputs(&job_id, &req).await {
            Ok(inputs) => {
                let output_name = format!("final_{job_id}.mp4");
                match self.run_engine(&job_id, &inputs, &output_name).await {
                    Ok(()) => {
                        let url = format!("/stream/{output_name}");
                        self.registry.complete(&job_id, &url).await;
                        info!(job_id = %job_id, url = %url, "Render completed");
                    }
                    Err(e) => {
                        error!(job_id = %job_id, error = %e, "Render failed");
                        self.registry.fail(&job_id).await;
                    }
                }
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to stage render inputs");
                self.registry.fail(&job_id).await;
            }
        }

        self.cleanup_inputs(&job_id, &req).await;
    }

    /// Probe the audio, write text side-files, and compile the plan.
    async fn stage_inputs(&self, job_id: &str, req: &RenderRequest) -> ApiResult<StagedInputs> {
        let visual_path = self.store.upload_path(req.visual_file()?)?;
        let audio_path = self.store.upload_path(&req.audio_file)?;

        // Audio is authoritative for timing. Probe failure is non-fatal: a
        // conservative default keeps the job available at the cost of a
        // wrong trim/progress denominator.
        let audio_duration = match probe_duration(&self.config.ffprobe_bin, &audio_path).await {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    error = %e,
                    fallback = self.config.default_duration_secs,
                    "Audio probe failed, using default duration"
                );
                self.config.default_duration_secs
            }
        };
        let duration = render_duration(audio_duration, req.trim_start, req.trim_end);

        let text = self.write_text_layers(job_id, req).await?;

        let plan = RenderPlan::compile(
            req,
            duration,
            &visual_path,
            &audio_path,
            &text,
            self.config.ffmpeg_threads,
        );

        Ok(StagedInputs { plan, duration })
    }

    /// Write watermark (and, in music mode, title) text to side-files the
    /// engine reads via `textfile=`, keeping arbitrary user text off the
    /// command line.
    async fn write_text_layers(&self, job_id: &str, req: &RenderRequest) -> ApiResult<TextLayers> {
        let wm_text = if req.watermark.text.trim().is_empty() {
            DEFAULT_WATERMARK_TEXT
        } else {
            req.watermark.text.as_str()
        };
        let watermark_file = self.store.upload_path(&format!("wm_{job_id}.txt"))?;
        tokio::fs::write(&watermark_file, wm_text).await?;

        let title_file = match (&req.title, req.mode) {
            (Some(title), RenderMode::Music) => {
                let path = self.store.upload_path(&format!("title_{job_id}.txt"))?;
                tokio::fs::write(&path, &title.text).await?;
                Some(path)
            }
            _ => None,
        };

        Ok(TextLayers {
            watermark_file,
            title_file,
        })
    }

    /// Launch the engine and apply its event stream to the registry.
    async fn run_engine(
        &self,
        job_id: &str,
        inputs: &StagedInputs,
        output_name: &str,
    ) -> ApiResult<()> {
        let output_path = self.store.public_path(output_name)?;
        let cmd = EngineCommand::new(&self.config.ffmpeg_bin, inputs.plan.clone(), &output_path);
        let runner = EngineRunner::new().with_timeout(self.config.render_timeout_secs);

        let (tx, mut rx) = mpsc::unbounded_channel();

        // Engine launched: the job is rendering even before the first
        // progress marker arrives.
        self.registry.update_progress(job_id, 0, 0).await;

        let tracker = ProgressTracker::new(inputs.duration);
        let progress_tx = tx.clone();
        let engine = tokio::spawn(async move {
            let result = runner
                .run_with_progress(&cmd, move |out_time_us| {
                    let _ = progress_tx.send(RenderEvent::Progress(tracker.update(out_time_us)));
                })
                .await;
            let _ = tx.send(RenderEvent::Exited(result));
        });

        // Single consumer per job: updates hit the registry in emission
        // order, last write wins.
        let mut outcome = Ok(());
        while let Some(event) = rx.recv().await {
            match event {
                RenderEvent::Progress(update) => {
                    self.registry
                        .update_progress(job_id, update.progress, update.eta)
                        .await;
                }
                RenderEvent::Exited(result) => {
                    outcome = result;
                    break;
                }
            }
        }
        let _ = engine.await;

        outcome.map_err(ApiError::from)
    }

    /// Delete all per-job transient inputs after a grace period.
    ///
    /// Names are derived from the request so the same set is removed no
    /// matter how far staging got; deleting a file that was never written
    /// is a no-op. The grace period covers lingering handles on just-exited
    /// processes and OS-level caching; the output artifact is never part of
    /// this set.
    async fn cleanup_inputs(&self, job_id: &str, req: &RenderRequest) {
        if self.config.cleanup_grace_secs > 0 {
            tokio::time::sleep(Duration::from_secs(self.config.cleanup_grace_secs)).await;
        }

        let mut names = vec![req.audio_file.clone(), format!("wm_{job_id}.txt")];
        if let Ok(visual) = req.visual_file() {
            names.push(visual.to_string());
        }
        if req.title.is_some() && req.mode == RenderMode::Music {
            names.push(format!("title_{job_id}.txt"));
        }

        for name in names {
            if let Err(e) = self.store.delete_upload(&name).await {
                warn!(job_id = %job_id, name = %name, error = %e, "Input cleanup failed");
            }
        }

        info!(job_id = %job_id, "Transient inputs cleaned up");
    }
}

/// Everything staged for one engine run.
struct StagedInputs {
    plan: RenderPlan,
    duration: f64,
}

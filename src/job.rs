//! Sequential job execution with progress tracking
//!
//! A job walks its domain list one entry at a time, publishing progress into a
//! shared store after every step. Cancellation is cooperative: callers flag the
//! job and the loop observes the flag at the top of each iteration, so the
//! in-flight probe always completes but no new one starts.
//!
//! Finished jobs stay in the store for later inspection and are removed by a
//! periodic retention sweep.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::detect::Checker;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Stopped,
    Error,
}

/// One positive finding with its full evidence trail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub domain: String,
    pub evidence: Vec<String>,
    pub company_name: Option<String>,
}

/// Point-in-time view of a job's progress
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub status: JobStatus,
    pub total: usize,
    pub checked: usize,
    pub success_count: usize,
    pub successful_domains: Vec<String>,
    pub successful_domains_with_evidence: Vec<DomainRecord>,
    /// Domain currently being probed, cleared once the job ends
    pub current_domain: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    stop_requested: bool,
}

impl JobProgress {
    pub(crate) fn new(total: usize) -> Self {
        JobProgress {
            status: JobStatus::Running,
            total,
            checked: 0,
            success_count: 0,
            successful_domains: Vec::new(),
            successful_domains_with_evidence: Vec::new(),
            current_domain: None,
            started_at: Utc::now(),
            error: None,
            stop_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != JobStatus::Running
    }
}

/// Shared registry of jobs, cheap to clone across tasks
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, JobProgress>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job and return its identifier.
    pub async fn create_job(&self, total: usize) -> String {
        let mut jobs = self.jobs.write().await;
        let base = Utc::now().timestamp_millis().to_string();
        let mut id = base.clone();
        let mut suffix = 1;
        while jobs.contains_key(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        jobs.insert(id.clone(), JobProgress::new(total));
        id
    }

    /// Snapshot a job's progress, if it still exists.
    pub async fn snapshot(&self, job_id: &str) -> Option<JobProgress> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Flag a running job for cancellation. Returns false when the job is
    /// missing or already finished.
    pub async fn request_stop(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.stop_requested = true;
                info!("Stop requested for job {}", job_id);
                true
            }
            _ => false,
        }
    }

    async fn is_stop_requested(&self, job_id: &str) -> bool {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|job| job.stop_requested)
            .unwrap_or(true)
    }

    async fn update<F>(&self, job_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut JobProgress),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) => {
                mutate(job);
                Ok(())
            }
            None => bail!("Job {} no longer exists", job_id),
        }
    }

    /// Drop jobs that started longer than `max_age` ago. Returns the number
    /// removed.
    pub async fn remove_expired(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.started_at > cutoff);
        before - jobs.len()
    }
}

/// Run a job to completion, checking each domain in order.
///
/// Per-domain failures are recorded and skipped; only losing the job's store
/// entry mid-run ends the job with an error status.
pub async fn run_job(
    store: JobStore,
    job_id: String,
    domains: Vec<String>,
    checker: Checker,
    delay: Duration,
) {
    info!("Job {} started: {} domains", job_id, domains.len());

    let outcome = drive(&store, &job_id, &domains, &checker, delay).await;

    let result = match outcome {
        Ok(stopped) => {
            store
                .update(&job_id, |job| {
                    // A stop raised during the final probe never reaches
                    // another iteration top; honor the flag here as well
                    job.status = if stopped || job.stop_requested {
                        JobStatus::Stopped
                    } else {
                        JobStatus::Completed
                    };
                    job.current_domain = None;
                })
                .await
        }
        Err(e) => {
            error!("Job {} failed: {:#}", job_id, e);
            store
                .update(&job_id, |job| {
                    job.status = JobStatus::Error;
                    job.error = Some(format!("{:#}", e));
                    job.current_domain = None;
                })
                .await
        }
    };

    if let Err(e) = result {
        warn!("Could not record final state for job {}: {:#}", job_id, e);
    } else if let Some(job) = store.snapshot(&job_id).await {
        info!(
            "Job {} {:?}: {}/{} checked, {} matches",
            job_id, job.status, job.checked, job.total, job.success_count
        );
    }
}

/// Inner loop. Returns `Ok(true)` when the job was cancelled.
async fn drive(
    store: &JobStore,
    job_id: &str,
    domains: &[String],
    checker: &Checker,
    delay: Duration,
) -> Result<bool> {
    for (i, domain) in domains.iter().enumerate() {
        if store.is_stop_requested(job_id).await {
            return Ok(true);
        }

        store
            .update(job_id, |job| {
                job.current_domain = Some(domain.clone());
                job.checked = i + 1;
            })
            .await?;

        debug!("Job {}: checking {} ({}/{})", job_id, domain, i + 1, domains.len());
        let detection = checker.check_domain(domain).await;

        if detection.is_match {
            info!(
                "Job {}: {} matched (score {}, {})",
                job_id, domain, detection.score, detection.confidence
            );
            store
                .update(job_id, |job| {
                    job.success_count += 1;
                    job.successful_domains.push(detection.domain.clone());
                    job.successful_domains_with_evidence.push(DomainRecord {
                        domain: detection.domain.clone(),
                        evidence: detection.evidence.clone(),
                        company_name: detection.company_name.clone(),
                    });
                })
                .await?;
        }

        if i + 1 < domains.len() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(false)
}

/// Delete files in `dir` whose modification time is older than `max_age`.
pub fn sweep_stale_files(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut removed = 0;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = modified.elapsed().unwrap_or_default();
        if age >= max_age {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Swept stale file {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
    Ok(removed)
}

/// Spawn the periodic retention sweep for jobs and stale upload files.
pub fn spawn_sweeper(
    store: JobStore,
    upload_dir: Option<std::path::PathBuf>,
    retention: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh start never
        // sweeps before anything could age out
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.remove_expired(retention).await;
            if removed > 0 {
                info!("Retention sweep removed {} expired jobs", removed);
            }
            if let Some(dir) = &upload_dir {
                match sweep_stale_files(dir, retention) {
                    Ok(n) if n > 0 => info!("Retention sweep removed {} stale files", n),
                    Ok(_) => {}
                    Err(e) => warn!("File sweep failed: {}", e),
                }
            }
        }
    })
}

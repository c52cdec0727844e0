// BookBinder - Chaptered audiobook assembly
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Encode job pool
//!
//! Jobs run on tokio's blocking pool, at most `num_threads` at a time. A
//! cancelled runner skips jobs that have not started yet; running jobs finish.

use super::job::{EncodeJob, JobReport, JobState};
use crate::binder::BookBinder;
use crate::config::Settings;
use crate::encoder::EncoderKind;
use crate::error::{BinderError, Result};
use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Report callback, invoked once per finished job
pub type ReportCallback = Arc<dyn Fn(&JobReport) + Send + Sync>;

/// Runs encode jobs concurrently with a fixed pool size
pub struct JobRunner {
    num_threads: usize,
    encoder: EncoderKind,
    cancelled: Arc<AtomicBool>,
    on_report: Option<ReportCallback>,
}

/// Cancels the runner it was taken from
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl JobRunner {
    pub fn new(settings: &Settings, encoder: EncoderKind) -> Self {
        Self {
            num_threads: settings.num_threads.max(1),
            encoder,
            cancelled: Arc::new(AtomicBool::new(false)),
            on_report: None,
        }
    }

    pub fn with_callback(mut self, callback: ReportCallback) -> Self {
        self.on_report = Some(callback);
        self
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Run every job and return the reports ordered by chapter position
    pub async fn run(&self, jobs: Vec<EncodeJob>) -> Vec<JobReport> {
        tracing::info!("Encoding {} chapters with {} threads", jobs.len(), self.num_threads);
        let semaphore = Arc::new(Semaphore::new(self.num_threads));

        let tasks = jobs.into_iter().map(|job| {
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&self.cancelled);
            let callback = self.on_report.clone();
            let encoder = self.encoder;

            async move {
                let report = match semaphore.acquire_owned().await {
                    Ok(_) if cancelled.load(Ordering::SeqCst) => JobReport::cancelled(&job),
                    Err(_) => JobReport::cancelled(&job),
                    Ok(permit) => {
                        let position = job.position;
                        let title = job.title.clone();
                        let encoded = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            job.execute(encoder)
                        })
                        .await;
                        encoded.unwrap_or_else(|e| {
                            JobReport::failed(position, title, format!("Encode job aborted: {}", e))
                        })
                    }
                };
                if let Some(callback) = callback {
                    callback(&report);
                }
                report
            }
        });

        let mut reports = join_all(tasks).await;
        reports.sort_by_key(|report| report.position);

        let failed = reports.iter().filter(|r| r.state == JobState::Failed).count();
        let cancelled = reports.iter().filter(|r| r.state == JobState::Cancelled).count();
        if failed > 0 || cancelled > 0 {
            tracing::warn!(
                "{} of {} jobs failed, {} cancelled",
                failed,
                reports.len(),
                cancelled
            );
        }
        reports
    }
}

/// Chapter list for the assembler, only when every job completed
///
/// A cancelled pool yields [`BinderError::Cancelled`] even if some jobs failed.
pub fn binder_from_reports(reports: &[JobReport]) -> Result<BookBinder> {
    if reports.iter().any(|r| r.state == JobState::Cancelled) {
        return Err(BinderError::Cancelled);
    }
    let mut binder = BookBinder::default();
    for report in reports {
        let chapter = report.chapter().ok_or_else(|| {
            BinderError::invalid_input(format!(
                "Chapter #{} \"{}\" was not encoded ({:?})",
                report.position, report.title, report.state
            ))
        })?;
        binder.push(chapter);
    }
    if binder.is_empty() {
        return Err(BinderError::EmptyBook("no encoded chapters".to_string()));
    }
    Ok(binder)
}

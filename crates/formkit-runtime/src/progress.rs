//! Background progress saves for a respondent session
//!
//! Saves are fire-and-forget from the session's point of view. A single
//! worker task sends them one at a time. If several are queued while one is
//! in flight, only the newest is sent next. Each payload carries the full
//! answer set, so skipping older ones loses nothing and the service always
//! ends with the latest answers.

use crate::error::SessionError;
use formkit_client::{FormService, SubmitPayload};
use formkit_core::Answers;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Queued {
    generation: u64,
    payload: SubmitPayload,
}

/// Single-flight, latest-wins progress saver
#[derive(Debug)]
pub struct ProgressSaver {
    form_id: String,
    queue: watch::Sender<Option<Queued>>,
    done: watch::Receiver<u64>,
    generation: AtomicU64,
    worker: JoinHandle<()>,
}

impl ProgressSaver {
    /// Start the worker for one form
    ///
    /// # Errors
    /// - `SessionError::NoRuntime` outside a tokio runtime
    pub fn spawn(service: Arc<dyn FormService>, form_id: impl Into<String>) -> Result<Self, SessionError> {
        let handle = Handle::try_current().map_err(|e| SessionError::NoRuntime(e.to_string()))?;
        let form_id = form_id.into();
        let (queue, mut pending) = watch::channel::<Option<Queued>>(None);
        let (done_tx, done) = watch::channel(0_u64);

        let worker_form_id = form_id.clone();
        let worker = handle.spawn(async move {
            while pending.changed().await.is_ok() {
                let next = pending.borrow_and_update().clone();
                let Some(Queued { generation, payload }) = next else {
                    continue;
                };
                match service.submit(&worker_form_id, &payload).await {
                    Ok(()) => tracing::debug!(
                        form_id = %worker_form_id,
                        submission_id = %payload.submission_id,
                        generation,
                        "progress saved"
                    ),
                    Err(e) => tracing::warn!(
                        form_id = %worker_form_id,
                        submission_id = %payload.submission_id,
                        error = %e,
                        "progress save failed"
                    ),
                }
                done_tx.send_replace(generation);
            }
            tracing::trace!(form_id = %worker_form_id, "progress worker stopped");
        });

        Ok(Self {
            form_id,
            queue,
            done,
            generation: AtomicU64::new(0),
            worker,
        })
    }

    /// Form this saver writes to
    #[inline]
    #[must_use]
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Queue a save of the full answer set; replaces any save not yet sent
    ///
    /// Returns the generation number of the queued save.
    pub fn queue(&self, submission_id: &str, answers: &Answers) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.queue.send_replace(Some(Queued {
            generation,
            payload: SubmitPayload::new(submission_id, answers.clone()),
        }));
        generation
    }

    /// Number of saves queued so far
    #[inline]
    #[must_use]
    pub fn queued(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Generation of the newest finished save, 0 if none
    #[inline]
    #[must_use]
    pub fn completed(&self) -> u64 {
        *self.done.borrow()
    }

    /// Wait until every save queued so far has finished, successfully or not
    pub async fn settled(&self) {
        let target = self.queued();
        if target == 0 {
            return;
        }
        let mut done = self.done.clone();
        let finished = done.wait_for(|completed| *completed >= target).await.is_ok();
        if !finished {
            tracing::warn!(form_id = %self.form_id, "progress worker ended before settling");
        }
    }

    /// Let queued saves finish, then stop the worker
    pub async fn shutdown(self) {
        let Self { queue, worker, form_id, .. } = self;
        drop(queue);
        if let Err(e) = worker.await {
            tracing::warn!(%form_id, error = %e, "progress worker did not stop cleanly");
        }
    }
}

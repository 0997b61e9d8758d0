//! Submission identity and resume decisions
//!
//! The first visit to a form mints a submission id and keeps it in the
//! client store; later visits reuse it, which is what lets a respondent
//! resume. Prior answers come from the service, or from the local cache
//! when the service cannot be reached, laid over the form's blank answers.
//!
//! When a returning respondent already has answers and the form allows
//! multiple submissions, they choose between continuing and starting over.

use crate::storage::{
    answers_key, load_cached_answers, store_cached_answers, submission_key, ClientStore,
};
use formkit_client::FormService;
use formkit_core::{Answers, Form, IdGenerator};
use std::sync::Arc;

/// How a session's answers were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// New submission id with blank answers
    Fresh,
    /// Existing submission id with its prior answers
    Resumed,
}

/// Everything a session needs to start
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStart {
    /// Submission id the session writes to
    pub submission_id: String,
    /// Initial answers, one entry per answerable field
    pub answers: Answers,
    /// Whether answers were resumed
    pub origin: SessionOrigin,
}

/// Returning respondent must pick continue or start over
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChoice {
    /// Form being filled
    pub form_id: String,
    /// Submission id found in the store
    pub previous_submission_id: String,
    /// Answers found for it, merged over blanks
    pub previous_answers: Answers,
    /// Blank answers for a fresh start
    pub blank_answers: Answers,
}

/// Respondent's pick for a `PendingChoice`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    /// Keep the previous submission and its answers
    ContinuePrevious,
    /// Mint a new submission id and start blank
    StartNew,
}

/// Outcome of opening a form for filling
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeDecision {
    /// Session can start right away
    Ready(SessionStart),
    /// Respondent must choose first
    ChoiceRequired(PendingChoice),
}

/// Resolves submission ids and prior answers for a respondent
#[derive(Debug, Clone)]
pub struct SubmissionResolver {
    service: Arc<dyn FormService>,
    store: Arc<dyn ClientStore>,
    ids: Arc<dyn IdGenerator>,
}

impl SubmissionResolver {
    /// Create resolver
    #[must_use]
    pub fn new(
        service: Arc<dyn FormService>,
        store: Arc<dyn ClientStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { service, store, ids }
    }

    /// Store this resolver reads and writes
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ClientStore> {
        &self.store
    }

    /// Stored submission id for a form, or a newly minted and stored one
    #[must_use]
    pub fn resolve_submission_id(&self, form_id: &str) -> String {
        self.resolve(form_id).0
    }

    /// Resolve and report whether the id was minted just now
    fn resolve(&self, form_id: &str) -> (String, bool) {
        match self.store.get(&submission_key(form_id)) {
            Ok(Some(existing)) if !existing.is_empty() => (existing, false),
            Ok(_) => (self.mint(form_id), true),
            Err(e) => {
                tracing::warn!(form_id, error = %e, "client store unreadable; using a new submission id");
                (self.mint(form_id), true)
            }
        }
    }

    fn mint(&self, form_id: &str) -> String {
        let submission_id = self.ids.generate();
        if let Err(e) = self.store.set(&submission_key(form_id), &submission_id) {
            tracing::warn!(form_id, error = %e, "failed to persist submission id");
        }
        tracing::debug!(form_id, %submission_id, "minted submission id");
        submission_id
    }

    /// Prior answers for a submission, merged over the form's blanks
    ///
    /// Remote answers are taken first, then the local cache is laid over
    /// them. The cache is rewritten on every change while the service only
    /// hears about advanced cards, so a cached value is never older than the
    /// remote one. With neither available the blanks are returned.
    pub async fn load_prior_answers(&self, form: &Form, submission_id: &str) -> Answers {
        let blank = form.blank_answers();
        let form_id = form.form_id.as_str();

        let base = match self.service.get_submission(form_id, submission_id).await {
            Ok(remote) => Answers::merged_over(&blank, remote),
            Err(e) if e.is_not_found() => {
                tracing::debug!(form_id, submission_id, "no saved submission on the service");
                blank
            }
            Err(e) => {
                tracing::warn!(form_id, submission_id, error = %e, "failed to load saved answers; trying local cache");
                blank
            }
        };

        match load_cached_answers(self.store.as_ref(), form_id, submission_id) {
            Ok(Some(cached)) => Answers::merged_over(&base, cached),
            Ok(None) => base,
            Err(e) => {
                tracing::warn!(form_id, submission_id, error = %e, "answer cache unreadable");
                base
            }
        }
    }

    /// Decide how a respondent opening `form` starts
    pub async fn begin(&self, form: &Form) -> ResumeDecision {
        let (submission_id, minted) = self.resolve(&form.form_id);
        if minted {
            tracing::info!(form_id = %form.form_id, %submission_id, "starting new submission");
            return ResumeDecision::Ready(SessionStart {
                submission_id,
                answers: form.blank_answers(),
                origin: SessionOrigin::Fresh,
            });
        }

        let answers = self.load_prior_answers(form, &submission_id).await;
        if answers.has_content() && form.allows_multiple_submissions() {
            return ResumeDecision::ChoiceRequired(PendingChoice {
                form_id: form.form_id.clone(),
                previous_submission_id: submission_id,
                previous_answers: answers,
                blank_answers: form.blank_answers(),
            });
        }

        tracing::info!(form_id = %form.form_id, %submission_id, "resuming submission");
        ResumeDecision::Ready(SessionStart {
            submission_id,
            answers,
            origin: SessionOrigin::Resumed,
        })
    }

    /// Settle a pending choice
    #[must_use]
    pub fn choose(&self, pending: PendingChoice, choice: ResumeChoice) -> SessionStart {
        match choice {
            ResumeChoice::ContinuePrevious => {
                tracing::info!(
                    form_id = %pending.form_id,
                    submission_id = %pending.previous_submission_id,
                    "continuing previous submission"
                );
                if let Err(e) = store_cached_answers(
                    self.store.as_ref(),
                    &pending.form_id,
                    &pending.previous_submission_id,
                    &pending.previous_answers,
                ) {
                    tracing::warn!(form_id = %pending.form_id, error = %e, "failed to cache resumed answers");
                }
                SessionStart {
                    submission_id: pending.previous_submission_id,
                    answers: pending.previous_answers,
                    origin: SessionOrigin::Resumed,
                }
            }
            ResumeChoice::StartNew => self.start_new(
                &pending.form_id,
                Some(&pending.previous_submission_id),
                pending.blank_answers,
            ),
        }
    }

    /// Abandon any stored submission and start blank
    #[must_use]
    pub fn start_over(&self, form: &Form) -> SessionStart {
        let previous = self.store.get(&submission_key(&form.form_id)).ok().flatten();
        self.start_new(&form.form_id, previous.as_deref(), form.blank_answers())
    }

    fn start_new(&self, form_id: &str, previous: Option<&str>, blank: Answers) -> SessionStart {
        if let Some(previous) = previous {
            if let Err(e) = self.store.remove(&answers_key(form_id, previous)) {
                tracing::warn!(form_id, error = %e, "failed to drop cached answers");
            }
        }
        let submission_id = self.mint(form_id);
        tracing::info!(form_id, %submission_id, "starting new submission");
        SessionStart {
            submission_id,
            answers: blank,
            origin: SessionOrigin::Fresh,
        }
    }
}

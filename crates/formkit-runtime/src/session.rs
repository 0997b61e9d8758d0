//! Respondent session over one form
//!
//! Walks the respondent through the form card by card. Moving forward
//! validates the current card and saves progress in the background; moving
//! back does neither. `submit` validates everything, waits for background
//! saves, then sends the final save. A successful submit closes the
//! session and forgets the local answer cache.

use crate::error::{SessionError, SubmitError};
use crate::progress::ProgressSaver;
use crate::resume::{SessionOrigin, SessionStart};
use crate::storage::{answers_key, store_cached_answers, ClientStore};
use formkit_client::{FormService, SubmitPayload};
use formkit_core::{validate_all, validate_card, Answers, Card, FieldErrors, Form};
use std::sync::Arc;
use tokio::sync::watch;

/// Direction of the last card transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Towards later cards
    #[default]
    Forward,
    /// Towards earlier cards
    Backward,
}

impl Direction {
    /// Signed step, used for slide animations
    #[inline]
    #[must_use]
    pub fn step(self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting answers
    Filling,
    /// Final save in flight
    Submitting,
    /// Submitted; closed
    Submitted,
}

/// Result of trying to move to the next card
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Moved (or stayed on the last card); progress save queued
    Advanced {
        /// Index of the card now shown
        index: usize,
    },
    /// Required fields on the current card are empty
    Blocked {
        /// Error message per field id
        errors: FieldErrors,
    },
}

/// Where the respondent goes after submitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Thank-you page of a form
    ThankYou {
        /// Submitted form
        form_id: String,
    },
}

impl Navigation {
    /// Route path
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::ThankYou { form_id } => format!("/to/{form_id}/thankyou"),
        }
    }
}

/// Successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Submission that was finalized
    pub submission_id: String,
    /// Navigation to perform
    pub redirect: Navigation,
}

/// One respondent filling one form
#[derive(Debug)]
pub struct SubmissionSession {
    form: Arc<Form>,
    submission_id: String,
    origin: SessionOrigin,
    answers: Answers,
    errors: FieldErrors,
    current: usize,
    direction: Direction,
    closed: bool,
    phase: watch::Sender<SessionPhase>,
    service: Arc<dyn FormService>,
    store: Arc<dyn ClientStore>,
    progress: Option<ProgressSaver>,
}

impl SubmissionSession {
    /// Start a session from a resume decision
    ///
    /// # Errors
    /// - `SessionError::EmptyForm` if the form has no cards
    /// - `SessionError::NoRuntime` outside a tokio runtime
    pub fn start(
        form: Arc<Form>,
        start: SessionStart,
        service: Arc<dyn FormService>,
        store: Arc<dyn ClientStore>,
    ) -> Result<Self, SessionError> {
        if form.cards.is_empty() {
            return Err(SessionError::EmptyForm(form.form_id.clone()));
        }
        let progress = ProgressSaver::spawn(Arc::clone(&service), form.form_id.clone())?;
        let answers = Answers::merged_over(&form.blank_answers(), start.answers);

        tracing::info!(
            form_id = %form.form_id,
            submission_id = %start.submission_id,
            origin = ?start.origin,
            "session started"
        );
        Ok(Self {
            form,
            submission_id: start.submission_id,
            origin: start.origin,
            answers,
            errors: FieldErrors::new(),
            current: 0,
            direction: Direction::Forward,
            closed: false,
            phase: watch::Sender::new(SessionPhase::Filling),
            service,
            store,
            progress: Some(progress),
        })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_field(&self, field_id: &str) -> Result<(), SessionError> {
        match self.form.field(field_id) {
            Some(field) if field.collects_answer() => Ok(()),
            _ => Err(SessionError::UnknownField(field_id.to_string())),
        }
    }

    fn cache_answers(&self) {
        if let Err(e) = store_cached_answers(
            self.store.as_ref(),
            &self.form.form_id,
            &self.submission_id,
            &self.answers,
        ) {
            tracing::warn!(form_id = %self.form.form_id, error = %e, "failed to cache answers locally");
        }
    }

    /// Record an answer and clear the field's error
    ///
    /// # Errors
    /// - `SessionError::Closed` after submit or close
    /// - `SessionError::UnknownField` if the form does not collect this field
    pub fn handle_change(&mut self, field_id: &str, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_field(field_id)?;
        self.answers.set(field_id, value);
        self.errors.shift_remove(field_id);
        self.cache_answers();
        Ok(())
    }

    /// Record a multi-select answer and clear the field's error
    ///
    /// # Errors
    /// - `SessionError::Closed` after submit or close
    /// - `SessionError::UnknownField` if the form does not collect this field
    pub fn set_selection<S: AsRef<str>>(&mut self, field_id: &str, selected: &[S]) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_field(field_id)?;
        self.answers.set_selection(field_id, selected);
        self.errors.shift_remove(field_id);
        self.cache_answers();
        Ok(())
    }

    /// Validate the current card and move forward
    ///
    /// # Errors
    /// - `SessionError::Closed` after submit or close
    pub fn advance_card(&mut self) -> Result<AdvanceOutcome, SessionError> {
        self.ensure_open()?;
        let errors = validate_card(self.current_card(), &self.answers);
        if !errors.is_empty() {
            tracing::debug!(card = self.current, missing = errors.len(), "advance blocked");
            self.errors = errors.clone();
            return Ok(AdvanceOutcome::Blocked { errors });
        }

        self.errors.clear();
        self.current = (self.current + 1).min(self.last_index());
        self.direction = Direction::Forward;
        if let Some(progress) = &self.progress {
            progress.queue(&self.submission_id, &self.answers);
        }
        Ok(AdvanceOutcome::Advanced { index: self.current })
    }

    /// Move back one card; no validation, no save
    ///
    /// # Errors
    /// - `SessionError::Closed` after submit or close
    pub fn retreat_card(&mut self) -> Result<usize, SessionError> {
        self.ensure_open()?;
        self.current = self.current.saturating_sub(1);
        self.direction = Direction::Backward;
        Ok(self.current)
    }

    /// Validate everything and send the final save
    ///
    /// # Errors
    /// - `SubmitError::Validation` if any required field is empty
    /// - `SubmitError::Service` if the final save fails; the session stays open
    /// - `SubmitError::Closed` if already submitted
    pub async fn submit(&mut self) -> Result<Completion, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        let errors = validate_all(&self.form, &self.answers);
        if !errors.is_empty() {
            tracing::debug!(missing = errors.len(), "submit blocked by validation");
            self.errors = errors.clone();
            return Err(SubmitError::Validation { errors });
        }

        self.phase.send_replace(SessionPhase::Submitting);
        if let Some(progress) = &self.progress {
            progress.settled().await;
        }

        let form_id = self.form.form_id.clone();
        let payload = SubmitPayload::new(self.submission_id.clone(), self.answers.clone());
        if let Err(e) = self.service.submit(&form_id, &payload).await {
            tracing::error!(%form_id, submission_id = %self.submission_id, error = %e, "submission failed");
            self.phase.send_replace(SessionPhase::Filling);
            return Err(SubmitError::Service(e));
        }

        self.closed = true;
        if let Err(e) = self.store.remove(&answers_key(&form_id, &self.submission_id)) {
            tracing::warn!(%form_id, error = %e, "failed to clear cached answers");
        }
        if let Some(progress) = self.progress.take() {
            progress.shutdown().await;
        }
        self.phase.send_replace(SessionPhase::Submitted);
        tracing::info!(%form_id, submission_id = %self.submission_id, "form submitted");

        Ok(Completion {
            submission_id: self.submission_id.clone(),
            redirect: Navigation::ThankYou { form_id },
        })
    }

    /// Stop accepting input without submitting
    ///
    /// Returns once queued progress saves have been sent.
    pub async fn close(&mut self) {
        self.closed = true;
        if let Some(progress) = self.progress.take() {
            progress.shutdown().await;
        }
    }

    /// Form being filled
    #[inline]
    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Submission id answers are saved under
    #[inline]
    #[must_use]
    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// Whether the session started from prior answers
    #[inline]
    #[must_use]
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Current answers
    #[inline]
    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Current validation errors
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Error for one field
    #[must_use]
    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    /// Index of the card shown
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Card shown
    #[must_use]
    pub fn current_card(&self) -> &Card {
        &self.form.cards[self.current]
    }

    /// Number of cards
    #[inline]
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.form.cards.len()
    }

    fn last_index(&self) -> usize {
        self.total_cards().saturating_sub(1)
    }

    /// Whether the last card is shown
    #[inline]
    #[must_use]
    pub fn is_last_card(&self) -> bool {
        self.current == self.last_index()
    }

    /// Direction of the last transition
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the final save is in flight
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        *self.phase.borrow() == SessionPhase::Submitting
    }

    /// Whether the session accepts no more input
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Watch the session lifecycle
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }
}

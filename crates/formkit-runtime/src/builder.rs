//! Builder autosave controller
//!
//! Holds the author's working copy of a form next to the last snapshot the
//! service accepted. Every local edit marks the draft dirty and re-arms a
//! debounced save; the save sends the full definition and, on success,
//! makes the sent snapshot the new baseline.
//!
//! Guarantees:
//! - at most one save request is in flight per controller
//! - a failed save keeps the working copy and its unsaved status
//! - edits made while a save is in flight are saved afterwards
//! - after `close`, responses no longer touch controller state

use crate::debounce::Debouncer;
use formkit_client::{ClientConfig, FormService, ServiceError};
use formkit_core::{forms_equal, EditError, FieldType, Form, IdGenerator};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Autosave status shown to the author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveStatus {
    /// Working copy matches the last saved snapshot
    Saved,
    /// Working copy has edits the service has not accepted
    Unsaved,
    /// A save request is in flight
    Saving,
}

impl SaveStatus {
    /// Indicator text
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Saved => "Saved",
            Self::Unsaved => "Unsaved changes",
            Self::Saving => "Saving...",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one save attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Service accepted the snapshot
    Saved,
    /// Nothing to save
    Clean,
    /// Another save is in flight; nothing was sent
    InFlight,
    /// Controller was closed; nothing was sent
    Closed,
    /// Service rejected the snapshot; the draft stays dirty
    Failed(ServiceError),
}

impl SaveOutcome {
    /// Whether the draft is known to be persisted after this attempt
    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Saved | Self::Clean)
    }
}

/// Autosave settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before saving
    pub delay: Duration,
}

impl AutosaveConfig {
    /// With quiet period
    #[inline]
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(formkit_client::DEFAULT_AUTOSAVE_MS),
        }
    }
}

impl From<&ClientConfig> for AutosaveConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            delay: config.autosave_delay(),
        }
    }
}

#[derive(Debug)]
struct DraftState {
    working: Form,
    saved: Form,
    current_card_id: String,
    current_field_id: Option<String>,
}

impl DraftState {
    fn is_dirty(&self) -> bool {
        !forms_equal(&self.working, &self.saved)
    }

    /// Keep the selection pointing at something that exists
    fn repair_selection(&mut self) {
        if self.working.card(&self.current_card_id).is_none() {
            self.current_card_id = self
                .working
                .cards
                .first()
                .map(|card| card.card_id.clone())
                .unwrap_or_default();
        }
        if let Some(field_id) = &self.current_field_id {
            if self.working.field(field_id).is_none() {
                self.current_field_id = None;
            }
        }
    }
}

/// Clears the in-flight flag when the save ends, however it ends
struct SaveGuard<'a>(&'a AtomicBool);

impl<'a> SaveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct BuilderInner {
    service: Arc<dyn FormService>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<DraftState>,
    saving: AtomicBool,
    closed: AtomicBool,
    status: watch::Sender<SaveStatus>,
    debouncer: Debouncer,
}

impl BuilderInner {
    fn refresh_status(&self) {
        let status = if self.saving.load(Ordering::Acquire) {
            SaveStatus::Saving
        } else if self.state.lock().is_dirty() {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        };
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    async fn save(&self) -> SaveOutcome {
        if self.closed.load(Ordering::Acquire) {
            return SaveOutcome::Closed;
        }
        let Some(guard) = SaveGuard::acquire(&self.saving) else {
            tracing::debug!("save already in flight; skipping");
            return SaveOutcome::InFlight;
        };

        let snapshot = {
            let state = self.state.lock();
            if !state.is_dirty() {
                drop(state);
                drop(guard);
                return SaveOutcome::Clean;
            }
            state.working.clone()
        };
        self.refresh_status();

        let form_id = snapshot.form_id.clone();
        let result = self.service.update_form(&snapshot).await;

        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(%form_id, "builder closed; discarding save response");
            drop(guard);
            self.refresh_status();
            return match result {
                Ok(_) => SaveOutcome::Saved,
                Err(e) => SaveOutcome::Failed(e),
            };
        }

        match result {
            Ok(_) => {
                let still_dirty = {
                    let mut state = self.state.lock();
                    state.saved = snapshot;
                    state.is_dirty()
                };
                drop(guard);
                tracing::info!(%form_id, "form saved");
                self.refresh_status();
                if still_dirty {
                    tracing::debug!(%form_id, "edits arrived during save; rescheduling");
                    self.debouncer.schedule();
                }
                SaveOutcome::Saved
            }
            Err(e) => {
                drop(guard);
                tracing::error!(%form_id, error = %e, "failed to save form; draft kept");
                self.refresh_status();
                SaveOutcome::Failed(e)
            }
        }
    }
}

/// Autosaving controller over one form draft
///
/// Cheap to clone; clones share the same draft.
#[derive(Debug, Clone)]
pub struct BuilderController {
    inner: Arc<BuilderInner>,
}

impl BuilderController {
    /// Create a controller over a loaded form
    ///
    /// The loaded form becomes both the working copy and the saved snapshot.
    /// A form without cards gets one, which leaves the draft dirty.
    #[must_use]
    pub fn new(
        form: Form,
        service: Arc<dyn FormService>,
        ids: Arc<dyn IdGenerator>,
        config: AutosaveConfig,
    ) -> Self {
        let saved = form.clone();
        let mut working = form;
        if working.cards.is_empty() {
            working.add_card(ids.as_ref(), "Untitled card");
        }
        let current_card_id = working
            .cards
            .first()
            .map(|card| card.card_id.clone())
            .unwrap_or_default();

        let state = DraftState {
            working,
            saved,
            current_card_id,
            current_field_id: None,
        };
        let initial = if state.is_dirty() {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        };

        let inner = Arc::new_cyclic(|weak: &Weak<BuilderInner>| {
            let weak = weak.clone();
            let debouncer = Debouncer::new(config.delay, move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.save().await;
                    }
                }
            });
            BuilderInner {
                service,
                ids,
                state: Mutex::new(state),
                saving: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                status: watch::Sender::new(initial),
                debouncer,
            }
        });

        if initial == SaveStatus::Unsaved {
            inner.debouncer.schedule();
        }
        Self { inner }
    }

    /// Load a form from the service and wrap it
    ///
    /// # Errors
    /// - `ServiceError` if the form cannot be fetched
    pub async fn load(
        form_id: &str,
        service: Arc<dyn FormService>,
        ids: Arc<dyn IdGenerator>,
        config: AutosaveConfig,
    ) -> Result<Self, ServiceError> {
        let form = service.get_form(form_id, true).await?;
        tracing::info!(form_id, cards = form.cards.len(), "loaded form into builder");
        Ok(Self::new(form, service, ids, config))
    }

    /// Apply an edit under the draft lock
    ///
    /// The edit runs on a copy; on error the working copy is untouched.
    fn commit<T, E>(&self, edit: impl FnOnce(&mut Form) -> Result<T, E>) -> Result<T, E> {
        let (out, dirty) = {
            let mut state = self.inner.state.lock();
            let mut draft = state.working.clone();
            let out = edit(&mut draft)?;
            state.working = draft;
            state.repair_selection();
            (out, state.is_dirty())
        };

        if self.inner.closed.load(Ordering::Acquire) {
            tracing::warn!("edit applied to a closed builder; it will not be saved");
            return Ok(out);
        }
        self.inner.refresh_status();
        if dirty {
            self.inner.debouncer.schedule();
        } else {
            self.inner.debouncer.cancel();
        }
        Ok(out)
    }

    /// Replace the working copy with `updater(current)`
    ///
    /// The updater runs under the draft lock and must not call back into
    /// this controller.
    pub fn update_local_form(&self, updater: impl FnOnce(Form) -> Form) {
        let result: Result<(), Infallible> = self.commit(|form| {
            *form = updater(form.clone());
            Ok(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Apply a fallible edit to the working copy
    ///
    /// # Errors
    /// - `EditError` from the edit; the working copy is left unchanged
    pub fn edit<T>(&self, edit: impl FnOnce(&mut Form) -> Result<T, EditError>) -> Result<T, EditError> {
        self.commit(edit)
    }

    /// Append a card and select it
    pub fn add_card(&self, title: impl Into<String>) -> String {
        let ids = Arc::clone(&self.inner.ids);
        let title = title.into();
        let result: Result<String, Infallible> =
            self.commit(|form| Ok(form.add_card(ids.as_ref(), title)));
        let card_id = match result {
            Ok(card_id) => card_id,
            Err(never) => match never {},
        };
        let mut state = self.inner.state.lock();
        state.current_card_id = card_id.clone();
        state.current_field_id = None;
        card_id
    }

    /// Append a default field of `field_type` to a card and select it
    ///
    /// # Errors
    /// - `EditError::CardNotFound` if the card does not exist
    pub fn add_field(&self, card_id: &str, field_type: FieldType) -> Result<String, EditError> {
        let ids = Arc::clone(&self.inner.ids);
        let field_id = self.commit(|form| form.add_field(card_id, ids.as_ref(), field_type))?;
        let mut state = self.inner.state.lock();
        state.current_card_id = card_id.to_string();
        state.current_field_id = Some(field_id.clone());
        Ok(field_id)
    }

    /// Whether the working copy differs from the saved snapshot
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.inner.state.lock().is_dirty()
    }

    /// Save now if dirty and no save is in flight
    pub async fn save_form(&self) -> SaveOutcome {
        self.inner.save().await
    }

    /// Cancel the pending timer and save until the draft is persisted
    ///
    /// Waits out a save already in flight, then saves whatever it left
    /// behind. Returns the outcome of the last attempt.
    pub async fn flush(&self) -> SaveOutcome {
        self.inner.debouncer.cancel();
        loop {
            match self.inner.save().await {
                SaveOutcome::InFlight => {
                    let mut status = self.inner.status.subscribe();
                    let closed = status.wait_for(|s| *s != SaveStatus::Saving).await.is_err();
                    if closed {
                        return SaveOutcome::InFlight;
                    }
                    tokio::task::yield_now().await;
                }
                outcome => {
                    self.inner.debouncer.cancel();
                    return outcome;
                }
            }
        }
    }

    /// Current autosave status
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.inner.status.borrow()
    }

    /// Watch autosave status changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Whether a save timer is armed
    #[must_use]
    pub fn save_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Clone of the working copy
    #[must_use]
    pub fn form(&self) -> Form {
        self.inner.state.lock().working.clone()
    }

    /// Clone of the last saved snapshot
    #[must_use]
    pub fn saved_form(&self) -> Form {
        self.inner.state.lock().saved.clone()
    }

    /// Id of the form being edited
    #[must_use]
    pub fn form_id(&self) -> String {
        self.inner.state.lock().working.form_id.clone()
    }

    /// Selected card
    #[must_use]
    pub fn current_card_id(&self) -> String {
        self.inner.state.lock().current_card_id.clone()
    }

    /// Selected field, if any
    #[must_use]
    pub fn current_field_id(&self) -> Option<String> {
        self.inner.state.lock().current_field_id.clone()
    }

    /// Select a card; clears the field selection
    ///
    /// # Errors
    /// - `EditError::CardNotFound` if the card does not exist
    pub fn select_card(&self, card_id: &str) -> Result<(), EditError> {
        let mut state = self.inner.state.lock();
        if state.working.card(card_id).is_none() {
            return Err(EditError::CardNotFound(card_id.to_string()));
        }
        state.current_card_id = card_id.to_string();
        state.current_field_id = None;
        Ok(())
    }

    /// Select a field and the card holding it, or clear the field selection
    ///
    /// # Errors
    /// - `EditError::FieldNotFound` if the field does not exist
    pub fn select_field(&self, field_id: Option<&str>) -> Result<(), EditError> {
        let mut state = self.inner.state.lock();
        let Some(field_id) = field_id else {
            state.current_field_id = None;
            return Ok(());
        };
        let card_id = state
            .working
            .cards
            .iter()
            .find(|card| card.field(field_id).is_some())
            .map(|card| card.card_id.clone())
            .ok_or_else(|| EditError::FieldNotFound(field_id.to_string()))?;
        state.current_card_id = card_id;
        state.current_field_id = Some(field_id.to_string());
        Ok(())
    }

    /// Stop autosaving; later responses are ignored
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.debouncer.cancel();
            tracing::debug!(form_id = %self.form_id(), "builder closed");
        }
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::{Card, Field, SequentialIds};

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait::async_trait]
    impl FormService for Unreachable {
        async fn get_form(&self, id: &str, _: bool) -> Result<Form, ServiceError> {
            Err(ServiceError::NotFound(id.to_string()))
        }
        async fn create_form(&self, _: &Form) -> Result<String, ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn update_form(&self, _: &Form) -> Result<Form, ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn delete_form(&self, _: &str) -> Result<(), ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn list_forms(
            &self,
            _: formkit_client::PageRequest,
        ) -> Result<Vec<formkit_core::FormSummary>, ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn submit(&self, _: &str, _: &formkit_client::SubmitPayload) -> Result<(), ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn get_submission(&self, _: &str, _: &str) -> Result<formkit_core::Answers, ServiceError> {
            Err(ServiceError::Timeout)
        }
        async fn list_submissions(
            &self,
            _: &str,
            _: formkit_client::PageRequest,
        ) -> Result<Vec<formkit_client::SubmissionRecord>, ServiceError> {
            Err(ServiceError::Timeout)
        }
    }

    fn controller() -> BuilderController {
        let mut form = Form::new("f1", "Survey", &SequentialIds::new("c"));
        form.cards[0] = Card::new("c1", "Intro")
            .with_field(Field::with_defaults("q1", FieldType::ShortText).with_label("Name"));
        BuilderController::new(
            form,
            Arc::new(Unreachable),
            Arc::new(SequentialIds::new("x")),
            AutosaveConfig::default(),
        )
    }

    #[test]
    fn starts_clean_with_first_card_selected() {
        let builder = controller();
        assert!(!builder.has_changes());
        assert_eq!(builder.status(), SaveStatus::Saved);
        assert_eq!(builder.current_card_id(), "c1");
        assert_eq!(builder.current_field_id(), None);
    }

    #[test]
    fn failed_edit_leaves_draft_untouched() {
        let builder = controller();
        let err = builder.edit(|form| form.set_label("missing", "x")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!builder.has_changes());
    }

    #[test]
    fn selection_follows_fields() {
        let builder = controller();
        builder.select_field(Some("q1")).unwrap();
        assert_eq!(builder.current_field_id().as_deref(), Some("q1"));
        assert!(builder.select_field(Some("nope")).is_err());
        assert!(builder.select_card("nope").is_err());
        builder.select_field(None).unwrap();
        assert_eq!(builder.current_field_id(), None);
    }

    #[test]
    fn status_labels() {
        assert_eq!(SaveStatus::Saving.to_string(), "Saving...");
        assert!(SaveOutcome::Clean.is_persisted());
        assert!(!SaveOutcome::InFlight.is_persisted());
    }
}

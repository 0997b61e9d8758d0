//! In-memory `FormService` with failure injection, gating and recording

use async_trait::async_trait;
use formkit_client::{FormService, PageRequest, ServiceError, SubmissionRecord, SubmitPayload};
use formkit_core::{Answers, Form, FormSummary};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Service operations, for counting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetForm,
    CreateForm,
    UpdateForm,
    DeleteForm,
    ListForms,
    Submit,
    GetSubmission,
    ListSubmissions,
}

#[derive(Debug, Clone)]
struct Failure {
    error: ServiceError,
    /// `None` fails every call
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct Records {
    forms: Vec<Form>,
    submissions: HashMap<(String, String), Answers>,
    submits: Vec<(String, SubmitPayload)>,
    updates: Vec<Form>,
}

/// In-memory service fake
#[derive(Debug, Default)]
pub struct FakeFormService {
    records: Mutex<Records>,
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<HashMap<Operation, Failure>>,
    gates: Mutex<HashMap<Operation, Arc<Semaphore>>>,
    latency: Mutex<HashMap<Operation, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_form: AtomicUsize,
}

impl FakeFormService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(self, form: Form) -> Self {
        self.insert_form(form);
        self
    }

    pub fn insert_form(&self, form: Form) {
        let mut records = self.records.lock();
        records.forms.retain(|f| f.form_id != form.form_id);
        records.forms.push(form);
    }

    pub fn insert_submission(&self, form_id: &str, submission_id: &str, answers: Answers) {
        self.records
            .lock()
            .submissions
            .insert((form_id.to_string(), submission_id.to_string()), answers);
    }

    pub fn stored_form(&self, form_id: &str) -> Option<Form> {
        self.records.lock().forms.iter().find(|f| f.form_id == form_id).cloned()
    }

    pub fn stored_submission(&self, form_id: &str, submission_id: &str) -> Option<Answers> {
        self.records
            .lock()
            .submissions
            .get(&(form_id.to_string(), submission_id.to_string()))
            .cloned()
    }

    /// Every submit payload, in arrival order
    pub fn submits(&self) -> Vec<SubmitPayload> {
        self.records.lock().submits.iter().map(|(_, p)| p.clone()).collect()
    }

    /// Every form sent to `update_form`, in arrival order
    pub fn updates(&self) -> Vec<Form> {
        self.records.lock().updates.clone()
    }

    /// Calls made to one operation, including failed and gated ones
    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Highest number of requests observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Fail the next `times` calls of `op`
    pub fn fail_next(&self, op: Operation, times: usize, error: ServiceError) {
        self.failures.lock().insert(op, Failure { error, remaining: Some(times) });
    }

    /// Fail every call of `op` until `recover`
    pub fn fail_always(&self, op: Operation, error: ServiceError) {
        self.failures.lock().insert(op, Failure { error, remaining: None });
    }

    pub fn recover(&self, op: Operation) {
        self.failures.lock().remove(&op);
    }

    /// Make `op` sleep before answering
    pub fn set_latency(&self, op: Operation, latency: Duration) {
        self.latency.lock().insert(op, latency);
    }

    /// Hold calls of `op` until released
    pub fn hold(&self, op: Operation) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held calls of `op` proceed
    pub fn release(&self, op: Operation, count: usize) {
        if let Some(gate) = self.gates.lock().get(&op) {
            gate.add_permits(count);
        }
    }

    /// Stop holding `op`; waiting calls proceed
    pub fn open(&self, op: Operation) {
        if let Some(gate) = self.gates.lock().remove(&op) {
            gate.close();
        }
    }

    async fn enter(&self, op: Operation) -> Result<InFlight<'_>, ServiceError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let latency = self.latency.lock().get(&op).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut failures = self.failures.lock();
        let Some(failure) = failures.get_mut(&op) else {
            return Ok(guard);
        };
        let outcome = match failure.remaining {
            None => Some(failure.error.clone()),
            Some(0) => None,
            Some(n) => {
                failure.remaining = Some(n - 1);
                Some(failure.error.clone())
            }
        };
        if failure.remaining == Some(0) {
            failures.remove(&op);
        }
        match outcome {
            Some(error) => Err(error),
            None => Ok(guard),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn page<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    let start = (page.page as usize).saturating_sub(1) * page.limit as usize;
    items.iter().skip(start).take(page.limit as usize).cloned().collect()
}

#[async_trait]
impl FormService for FakeFormService {
    async fn get_form(&self, form_id: &str, _custom: bool) -> Result<Form, ServiceError> {
        let _guard = self.enter(Operation::GetForm).await?;
        self.stored_form(form_id)
            .ok_or_else(|| ServiceError::NotFound(format!("form {form_id}")))
    }

    async fn create_form(&self, form: &Form) -> Result<String, ServiceError> {
        let _guard = self.enter(Operation::CreateForm).await?;
        let mut form = form.clone();
        if form.form_id.is_empty() {
            form.form_id = format!("form-{}", self.next_form.fetch_add(1, Ordering::SeqCst) + 1);
        }
        let form_id = form.form_id.clone();
        self.insert_form(form);
        Ok(form_id)
    }

    async fn update_form(&self, form: &Form) -> Result<Form, ServiceError> {
        let _guard = self.enter(Operation::UpdateForm).await?;
        let mut records = self.records.lock();
        records.updates.push(form.clone());
        match records.forms.iter_mut().find(|f| f.form_id == form.form_id) {
            Some(stored) => *stored = form.clone(),
            None => return Err(ServiceError::NotFound(format!("form {}", form.form_id))),
        }
        Ok(form.clone())
    }

    async fn delete_form(&self, form_id: &str) -> Result<(), ServiceError> {
        let _guard = self.enter(Operation::DeleteForm).await?;
        let mut records = self.records.lock();
        let before = records.forms.len();
        records.forms.retain(|f| f.form_id != form_id);
        if records.forms.len() == before {
            return Err(ServiceError::NotFound(format!("form {form_id}")));
        }
        Ok(())
    }

    async fn list_forms(&self, request: PageRequest) -> Result<Vec<FormSummary>, ServiceError> {
        let _guard = self.enter(Operation::ListForms).await?;
        let summaries: Vec<FormSummary> = self.records.lock().forms.iter().map(FormSummary::from).collect();
        Ok(page(&summaries, request))
    }

    async fn submit(&self, form_id: &str, payload: &SubmitPayload) -> Result<(), ServiceError> {
        let _guard = self.enter(Operation::Submit).await?;
        let mut records = self.records.lock();
        records.submits.push((form_id.to_string(), payload.clone()));
        records.submissions.insert(
            (form_id.to_string(), payload.submission_id.clone()),
            payload.values.clone(),
        );
        Ok(())
    }

    async fn get_submission(&self, form_id: &str, submission_id: &str) -> Result<Answers, ServiceError> {
        let _guard = self.enter(Operation::GetSubmission).await?;
        self.stored_submission(form_id, submission_id)
            .ok_or_else(|| ServiceError::NotFound(format!("submission {submission_id}")))
    }

    async fn list_submissions(
        &self,
        form_id: &str,
        request: PageRequest,
    ) -> Result<Vec<SubmissionRecord>, ServiceError> {
        let _guard = self.enter(Operation::ListSubmissions).await?;
        let mut records: Vec<SubmissionRecord> = self
            .records
            .lock()
            .submissions
            .iter()
            .filter(|((f, _), _)| f == form_id)
            .map(|((_, s), values)| SubmissionRecord {
                submission_id: Some(s.clone()),
                created_at: None,
                values: values.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));
        Ok(page(&records, request))
    }
}

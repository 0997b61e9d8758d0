//! Form/Submission Service interface
//!
//! The remote service is an external collaborator. Controllers only see this
//! trait, so tests substitute an in-memory fake or a mock.

use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use formkit_core::{Answers, Form, FormSummary};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Page selector for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl PageRequest {
    /// Create page request
    #[inline]
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Body of a progress save or final submit
///
/// Serializes as the answer mapping with `submissionId` alongside it. Every
/// payload carries the complete mapping, so the service can treat each one
/// as a full replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    /// Full current answers
    #[serde(flatten)]
    pub values: Answers,
    /// Respondent's submission id
    pub submission_id: String,
}

impl SubmitPayload {
    /// Create payload
    #[inline]
    #[must_use]
    pub fn new(submission_id: impl Into<String>, values: Answers) -> Self {
        Self {
            values,
            submission_id: submission_id.into(),
        }
    }
}

/// One stored submission, as listed on the responses page
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    /// Submission id, when the service reports it
    pub submission_id: Option<String>,
    /// When the submission was created
    pub created_at: Option<DateTime<Utc>>,
    /// Submitted answers
    pub values: Answers,
}

/// Operations consumed from the Form/Submission Service
#[async_trait]
pub trait FormService: Send + Sync + Debug {
    /// Fetch a form definition
    ///
    /// # Errors
    /// - `ServiceError::NotFound` when no form has this id
    async fn get_form(&self, form_id: &str, custom: bool) -> Result<Form, ServiceError>;

    /// Create a form and return its id
    async fn create_form(&self, form: &Form) -> Result<String, ServiceError>;

    /// Replace a form definition
    async fn update_form(&self, form: &Form) -> Result<Form, ServiceError>;

    /// Delete a form
    async fn delete_form(&self, form_id: &str) -> Result<(), ServiceError>;

    /// List form summaries
    async fn list_forms(&self, page: PageRequest) -> Result<Vec<FormSummary>, ServiceError>;

    /// Save progress or submit; replaces the full answer set of the submission
    async fn submit(&self, form_id: &str, payload: &SubmitPayload) -> Result<(), ServiceError>;

    /// Fetch the saved answers of a submission
    async fn get_submission(
        &self,
        form_id: &str,
        submission_id: &str,
    ) -> Result<Answers, ServiceError>;

    /// List stored submissions
    async fn list_submissions(
        &self,
        form_id: &str,
        page: PageRequest,
    ) -> Result<Vec<SubmissionRecord>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn submit_payload_is_flat() {
        let values: Answers = [("name", "Alice"), ("notes", "")].into_iter().collect();
        let payload = SubmitPayload::new("sub-1", values);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "Alice", "notes": "", "submissionId": "sub-1" })
        );
    }

    #[test]
    fn page_request_is_clamped() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page, PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::default().limit, 20);
    }
}

//! HTTP implementation of the Form/Submission Service
//!
//! JSON over HTTP against a single base URL:
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | get form | GET | `/{formId}?custom={bool}` |
//! | create form | POST | `/` |
//! | update form | PUT | `/{formId}` |
//! | delete form | DELETE | `/{formId}` |
//! | list forms | GET | `/?page=&limit=` |
//! | save/submit | POST | `/{formId}/submit` |
//! | get submission | GET | `/{formId}/submit/{submissionId}` |
//! | list submissions | GET | `/{formId}/submit?page=&limit=` |

use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::service::{FormService, PageRequest, SubmissionRecord, SubmitPayload};
use crate::wire::{answers_from_body, record_from_value, CreatedEnvelope};
use async_trait::async_trait;
use formkit_core::{Answers, Form, FormSummary};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Form/Submission Service over HTTP
#[derive(Debug, Clone)]
pub struct HttpFormService {
    client: Client,
    base_url: Url,
}

impl HttpFormService {
    /// Create a client for the configured API
    ///
    /// # Errors
    /// - `ServiceError::Transport` if the API URL does not parse or the
    ///   HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self, ServiceError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ServiceError::Transport(format!("invalid API URL {:?}: {e}", config.api_url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing reqwest client
    #[must_use]
    pub fn with_client(client: Client, mut base_url: Url) -> Self {
        if let Ok(mut segments) = base_url.path_segments_mut() {
            segments.pop_if_empty();
        }
        Self { client, base_url }
    }

    /// Base URL requests are made against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and check its status
    async fn execute(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %what, "service returned error status");
            return Err(ServiceError::status(status.as_u16(), body));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ServiceError> {
        let response = self.execute(request, what).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(format!("{what}: {e}")))
    }
}

#[async_trait]
impl FormService for HttpFormService {
    async fn get_form(&self, form_id: &str, custom: bool) -> Result<Form, ServiceError> {
        let request = self
            .client
            .get(self.url(&[form_id]))
            .query(&[("custom", custom)]);
        self.fetch_json(request, &format!("form {form_id}")).await
    }

    async fn create_form(&self, form: &Form) -> Result<String, ServiceError> {
        let request = self.client.post(self.url(&[""])).json(form);
        let created: CreatedEnvelope = self.fetch_json(request, "create form").await?;
        tracing::info!(form_id = %created.form.id, "form created");
        Ok(created.form.id)
    }

    async fn update_form(&self, form: &Form) -> Result<Form, ServiceError> {
        let request = self.client.put(self.url(&[&form.form_id])).json(form);
        self.fetch_json(request, &format!("form {}", form.form_id))
            .await
    }

    async fn delete_form(&self, form_id: &str) -> Result<(), ServiceError> {
        let request = self.client.delete(self.url(&[form_id]));
        self.execute(request, &format!("form {form_id}")).await?;
        Ok(())
    }

    async fn list_forms(&self, page: PageRequest) -> Result<Vec<FormSummary>, ServiceError> {
        let request = self
            .client
            .get(self.url(&[""]))
            .query(&[("page", page.page), ("limit", page.limit)]);
        self.fetch_json(request, "form list").await
    }

    async fn submit(&self, form_id: &str, payload: &SubmitPayload) -> Result<(), ServiceError> {
        let request = self
            .client
            .post(self.url(&[form_id, "submit"]))
            .json(payload);
        self.execute(request, &format!("form {form_id}")).await?;
        Ok(())
    }

    async fn get_submission(
        &self,
        form_id: &str,
        submission_id: &str,
    ) -> Result<Answers, ServiceError> {
        let request = self
            .client
            .get(self.url(&[form_id, "submit", submission_id]));
        let body: Value = self
            .fetch_json(request, &format!("submission {submission_id}"))
            .await?;
        Ok(answers_from_body(&body))
    }

    async fn list_submissions(
        &self,
        form_id: &str,
        page: PageRequest,
    ) -> Result<Vec<SubmissionRecord>, ServiceError> {
        let request = self
            .client
            .get(self.url(&[form_id, "submit"]))
            .query(&[("page", page.page), ("limit", page.limit)]);
        let body: Value = self
            .fetch_json(request, &format!("submissions of {form_id}"))
            .await?;

        let items = match &body {
            Value::Array(items) => items.as_slice(),
            Value::Object(object) => object
                .get("submissions")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => &[][..],
        };
        Ok(items.iter().filter_map(record_from_value).collect())
    }
}

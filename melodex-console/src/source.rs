//! Record sources
//!
//! [`RecordSource`] is the seam between a list controller and wherever its
//! records live. [`HttpSource`] maps each operation onto the endpoints a
//! screen declares.

use async_trait::async_trait;
use melodex_common::{Error, Payload, Record, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiClient, ApiRequest, Endpoint, ProgressFn};
use crate::filter::Criteria;
use crate::form::EditForm;
use crate::screens::ScreenSpec;

/// Outcome of a song review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Review {
    Approve,
    Reject,
}

/// What to fetch for one list read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Forwarded as query parameters (server-side filtering only)
    pub criteria: Option<Criteria>,
    /// `(page_number, page_size)` for server-paginated screens
    pub page: Option<(u64, u64)>,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Payload>;

    async fn get(&self, id: i64) -> Result<Record>;

    /// Create when the form has no id, update otherwise
    async fn save(&self, form: &EditForm) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn delete_many(&self, ids: &[i64]) -> Result<()>;

    async fn review(&self, id: i64, review: Review) -> Result<()>;

    async fn upload(&self, file: &Path, progress: ProgressFn) -> Result<()>;

    /// Playable URL for a stored media path
    fn media_url(&self, path: &str) -> String;
}

/// Source backed by the catalog REST API
pub struct HttpSource {
    client: Arc<ApiClient>,
    screen: &'static ScreenSpec,
    scope: Option<String>,
}

impl HttpSource {
    pub fn new(client: Arc<ApiClient>, screen: &'static ScreenSpec, scope: Option<String>) -> Self {
        Self { client, screen, scope }
    }

    fn endpoint(&self, endpoint: Option<Endpoint>, operation: &str) -> Result<Endpoint> {
        endpoint.ok_or_else(|| {
            Error::Validation(format!(
                "{} does not support {}",
                self.screen.title, operation
            ))
        })
    }

    fn request(&self, endpoint: &Endpoint, id: Option<i64>) -> Result<ApiRequest> {
        let needs_scope = self.screen.scope_param.is_some();
        let scope = self.scope.as_deref();
        if needs_scope && scope.is_none() {
            return Err(Error::Validation(format!(
                "{} needs a parent id ({})",
                self.screen.title,
                self.screen.scope_param.unwrap_or("scope")
            )));
        }

        let mut request = ApiRequest::for_endpoint(endpoint, id, scope);
        if let (Some(param), Some(scope)) = (self.screen.scope_param, scope) {
            if !endpoint.path.contains("{scope}") {
                request = request.param(param, scope);
            }
        }
        Ok(request)
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn list(&self, query: &ListQuery) -> Result<Payload> {
        let endpoint = self.endpoint(self.screen.endpoints.list, "listing")?;
        let mut request = self.request(&endpoint, None)?;
        if let Some((page_num, page_size)) = query.page {
            request = request
                .param("pageNum", page_num)
                .param("pageSize", page_size);
        }
        if let Some(criteria) = &query.criteria {
            request = request.params(
                criteria
                    .query_params()
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v))),
            );
        }
        self.client.send(request).await
    }

    async fn get(&self, id: i64) -> Result<Record> {
        let endpoint = self.endpoint(self.screen.endpoints.get, "loading one record")?;
        let request = self.request(&endpoint, Some(id))?;
        self.client
            .send(request)
            .await?
            .into_single()
            .ok_or_else(|| Error::Application {
                code: "404".to_string(),
                message: Some(format!("{} #{} not found", self.screen.title, id)),
            })
    }

    async fn save(&self, form: &EditForm) -> Result<()> {
        let endpoint = match form.id {
            Some(_) => self.endpoint(self.screen.endpoints.update, "editing")?,
            None => self.endpoint(self.screen.endpoints.create, "creating")?,
        };
        // The id travels in the form params, never in the path
        let request = self
            .request(&endpoint, None)?
            .params(form.to_params(self.screen.form));
        self.client.send(request).await.map(|_| ())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let endpoint = self.endpoint(self.screen.endpoints.delete, "deleting")?;
        let request = self.request(&endpoint, Some(id))?;
        self.client.send(request).await.map(|_| ())
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<()> {
        let endpoint = self.endpoint(self.screen.endpoints.delete_batch, "batch delete")?;
        let request = self
            .request(&endpoint, None)?
            .param("ids", ids.to_vec());
        debug!(screen = self.screen.name, count = ids.len(), "Batch delete");
        self.client.send(request).await.map(|_| ())
    }

    async fn review(&self, id: i64, review: Review) -> Result<()> {
        let endpoint = match review {
            Review::Approve => self.endpoint(self.screen.endpoints.approve, "approval")?,
            Review::Reject => self.endpoint(self.screen.endpoints.reject, "rejection")?,
        };
        let request = self.request(&endpoint, Some(id))?;
        self.client.send(request).await.map(|_| ())
    }

    async fn upload(&self, file: &Path, progress: ProgressFn) -> Result<()> {
        let (endpoint, rules) = self
            .screen
            .endpoints
            .upload
            .ok_or_else(|| Error::Validation(format!("{} does not accept uploads", self.screen.title)))?;
        let mut extra = Vec::new();
        if let (Some(param), Some(scope)) = (self.screen.scope_param, &self.scope) {
            extra.push((param.to_string(), scope.clone()));
        }
        self.client
            .upload(&endpoint, file, &rules, extra, progress)
            .await
            .map(|_| ())
    }

    fn media_url(&self, path: &str) -> String {
        self.client.resolve_url(path)
    }
}

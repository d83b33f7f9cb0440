//! Migration session client
//!
//! [`MigrationClient`] is built once from an immutable [`SessionConfig`] and
//! passed by reference to everything that talks to either upstream. It owns
//! the transports, the retry executor, the authentication headers and the
//! project cache.

use std::sync::Arc;

use log::debug;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::auth::{ado_auth_headers, ado_url, encode_segment, gitlab_auth_headers, gitlab_url};
use super::envelope::ListEnvelope;
use super::models::{GitLabProject, OperationReference, Project, Repository};
use super::operation::{OperationPoller, OperationState, PollOptions};
use super::retry::{RetryPolicy, RetryingExecutor, Sleeper, TokioSleeper};
use super::transport::HttpTransport;
use super::{ApiRequest, Side, TlsPolicy, Transport};
use crate::cache::{CacheTtl, Clock, SystemClock, TtlCache, cache_key};
use crate::error::{ApiError, ApiResult};
use crate::mask::SecretMasker;

/// Default Azure DevOps REST API version
pub const DEFAULT_API_VERSION: &str = "7.1";

/// Projects fetched per list request
const PROJECT_PAGE_SIZE: u32 = 1000;

/// Response header carrying the cursor for the next page of a list
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Azure DevOps organization or collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdoEndpoint {
    /// e.g. `https://dev.azure.com/fabrikam` or `https://tfs.local/DefaultCollection`
    pub base_url: String,
    pub pat: String,
    pub api_version: String,
}

/// GitLab instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabEndpoint {
    pub base_url: String,
    pub token: String,
}

/// Everything the client needs, fixed for the life of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub ado: Option<AdoEndpoint>,
    pub gitlab: Option<GitLabEndpoint>,
    pub tls: TlsPolicy,
    pub retry: RetryPolicy,
    pub mask_secrets: bool,
    pub log_calls: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ado: None,
            gitlab: None,
            tls: TlsPolicy::Strict,
            retry: RetryPolicy::default(),
            mask_secrets: true,
            log_calls: false,
        }
    }
}

/// Authenticated client for both upstreams
pub struct MigrationClient {
    config: SessionConfig,
    executor: RetryingExecutor,
    sleeper: Arc<dyn Sleeper>,
    ado_headers: Option<HeaderMap>,
    gitlab_headers: Option<HeaderMap>,
    projects: TtlCache<Vec<Project>>,
}

impl MigrationClient {
    /// Build a client with real transports. The fallback transport is only
    /// created under the permissive certificate policy.
    pub fn new(config: SessionConfig) -> ApiResult<Self> {
        let primary: Arc<dyn Transport> = Arc::new(HttpTransport::primary(config.tls)?);
        let fallback: Option<Arc<dyn Transport>> = match config.tls {
            TlsPolicy::Permissive => Some(Arc::new(HttpTransport::insecure_fallback()?)),
            TlsPolicy::Strict => None,
        };
        Self::with_parts(
            config,
            primary,
            fallback,
            Arc::new(TokioSleeper),
            Arc::new(SystemClock),
        )
    }

    /// Build a client from explicit parts
    pub fn with_parts(
        config: SessionConfig,
        primary: Arc<dyn Transport>,
        fallback: Option<Arc<dyn Transport>>,
        sleeper: Arc<dyn Sleeper>,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        let ado_headers = config
            .ado
            .as_ref()
            .map(|ado| ado_auth_headers(&ado.pat))
            .transpose()?;
        let gitlab_headers = config
            .gitlab
            .as_ref()
            .map(|gitlab| gitlab_auth_headers(&gitlab.token))
            .transpose()?;

        let mut executor = RetryingExecutor::new(
            primary,
            sleeper.clone(),
            SecretMasker::new(config.mask_secrets),
        )
        .with_call_logging(config.log_calls);
        if let Some(fallback) = fallback {
            executor = executor.with_fallback(fallback);
        }

        Ok(Self {
            config,
            executor,
            sleeper,
            ado_headers,
            gitlab_headers,
            projects: TtlCache::new(clock),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn ado(&self) -> ApiResult<(&AdoEndpoint, &HeaderMap)> {
        match (&self.config.ado, &self.ado_headers) {
            (Some(endpoint), Some(headers)) => Ok((endpoint, headers)),
            _ => Err(ApiError::NotConfigured(Side::AzureDevOps)),
        }
    }

    fn gitlab(&self) -> ApiResult<(&GitLabEndpoint, &HeaderMap)> {
        match (&self.config.gitlab, &self.gitlab_headers) {
            (Some(endpoint), Some(headers)) => Ok((endpoint, headers)),
            _ => Err(ApiError::NotConfigured(Side::GitLab)),
        }
    }

    // ========================================================================
    // Raw requests
    // ========================================================================

    /// Send a request to Azure DevOps. `path` is relative to the
    /// organization/collection URL, or an absolute URL from a previous response.
    pub async fn ado_send(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<Value> {
        self.ado_send_with_headers(method, path, body)
            .await
            .map(|(body, _)| body)
    }

    async fn ado_send_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<(Value, HeaderMap)> {
        let (endpoint, headers) = self.ado()?;
        let url = ado_url(&endpoint.base_url, path, &endpoint.api_version);
        let mut request = ApiRequest::new(method, url, headers.clone());
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.executor
            .execute_with_headers(&request, Side::AzureDevOps, &self.config.retry)
            .await
    }

    /// GET from Azure DevOps and decode the body
    pub async fn ado_get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let body = self.ado_send(Method::GET, path, None).await?;
        decode(body)
    }

    /// POST a JSON body to Azure DevOps and decode the response
    pub async fn ado_post<T: DeserializeOwned>(&self, path: &str, body: Value) -> ApiResult<T> {
        let body = self.ado_send(Method::POST, path, Some(body)).await?;
        decode(body)
    }

    /// GET from the GitLab v4 API and decode the body
    pub async fn gitlab_get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let (endpoint, headers) = self.gitlab()?;
        let url = gitlab_url(&endpoint.base_url, path);
        let request = ApiRequest::new(Method::GET, url, headers.clone());
        let body = self
            .executor
            .execute(&request, Side::GitLab, &self.config.retry)
            .await?;
        decode(body)
    }

    // ========================================================================
    // Azure DevOps lookups
    // ========================================================================

    /// All projects in the collection, served from the cache for 15 minutes
    /// unless `refresh` is set
    pub async fn list_projects(&self, refresh: bool) -> ApiResult<Vec<Project>> {
        let key = cache_key(Side::AzureDevOps, "projects", None);
        self.projects
            .get_or_fetch(&key, CacheTtl::PROJECTS, refresh, || self.fetch_projects())
            .await
    }

    /// Every page of the project list, following the continuation header
    async fn fetch_projects(&self) -> ApiResult<Vec<Project>> {
        let mut projects = Vec::new();
        let mut continuation: Option<String> = None;
        let mut page_number = 1;

        loop {
            let mut path = format!("_apis/projects?$top={}", PROJECT_PAGE_SIZE);
            if let Some(token) = &continuation {
                path.push_str("&continuationToken=");
                path.push_str(&urlencoding::encode(token));
            }

            let (body, headers) = self.ado_send_with_headers(Method::GET, &path, None).await?;
            let page = ListEnvelope::<Project>::decode(body).into_items()?;
            debug!("Fetched {} project(s) on page {}", page.len(), page_number);
            projects.extend(page);

            continuation = headers
                .get(CONTINUATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string);
            if continuation.is_none() {
                return Ok(projects);
            }
            page_number += 1;
        }
    }

    /// Forget the cached project list
    pub async fn invalidate_projects(&self) {
        self.projects
            .invalidate(&cache_key(Side::AzureDevOps, "projects", None))
            .await;
    }

    /// Look up a project by name or id; `None` when it does not exist
    pub async fn find_project(&self, name: &str) -> ApiResult<Option<Project>> {
        let path = format!("_apis/projects/{}", encode_segment(name));
        found(self.ado_get(&path).await)
    }

    /// Look up a repository in a project; `None` when it does not exist
    pub async fn find_repository(&self, project: &str, name: &str) -> ApiResult<Option<Repository>> {
        let path = format!(
            "{}/_apis/git/repositories/{}",
            encode_segment(project),
            encode_segment(name)
        );
        found(self.ado_get(&path).await)
    }

    /// Repositories in a project
    pub async fn list_repositories(&self, project: &str) -> ApiResult<Vec<Repository>> {
        let path = format!("{}/_apis/git/repositories", encode_segment(project));
        let body = self.ado_send(Method::GET, &path, None).await?;
        ListEnvelope::<Repository>::decode(body).into_items()
    }

    // ========================================================================
    // Long-running operations
    // ========================================================================

    /// Current state of an operation
    pub async fn operation_status(&self, id: &str) -> ApiResult<OperationReference> {
        self.ado_get(&format!("_apis/operations/{}", encode_segment(id)))
            .await
    }

    /// Poll an operation until it settles or the budget runs out
    pub async fn wait_for_operation(
        &self,
        id: &str,
        options: PollOptions,
    ) -> ApiResult<OperationState> {
        OperationPoller::new(self.sleeper.clone(), options)
            .await_completion(id, || self.operation_status(id))
            .await
    }

    // ========================================================================
    // GitLab
    // ========================================================================

    /// Fetch a GitLab project by numeric id or `namespace/path`
    pub async fn gitlab_project(&self, id_or_path: &str) -> ApiResult<GitLabProject> {
        self.gitlab_get(&format!("projects/{}", encode_segment(id_or_path)))
            .await
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Turn a 404 into `None`
fn found<T>(result: ApiResult<T>) -> ApiResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

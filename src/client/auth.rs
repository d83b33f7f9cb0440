//! Authentication headers and URI construction for both upstreams

use base64::{Engine as _, engine::general_purpose};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::{ApiError, ApiResult};

/// GitLab's token header
pub const PRIVATE_TOKEN: HeaderName = HeaderName::from_static("private-token");

/// GitLab REST API root
const GITLAB_API_ROOT: &str = "/api/v4";

/// Headers for Azure DevOps: Basic auth with an empty user and the PAT as password
pub fn ado_auth_headers(pat: &str) -> ApiResult<HeaderMap> {
    let encoded = general_purpose::STANDARD.encode(format!(":{}", pat));
    let mut auth = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|_| ApiError::InvalidHeader("Authorization"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Headers for GitLab: the token verbatim in `PRIVATE-TOKEN`
pub fn gitlab_auth_headers(token: &str) -> ApiResult<HeaderMap> {
    let mut value =
        HeaderValue::from_str(token).map_err(|_| ApiError::InvalidHeader("PRIVATE-TOKEN"))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(PRIVATE_TOKEN, value);
    Ok(headers)
}

/// Build an Azure DevOps URL with an `api-version` parameter.
///
/// `path` may be relative to the collection/organization URL or an absolute
/// URL returned by the server (operation links). A path that already names
/// an `api-version` is left alone.
pub fn ado_url(base_url: &str, path: &str, api_version: &str) -> String {
    let url = if is_absolute(path) {
        path.to_string()
    } else {
        join(base_url, path)
    };
    with_api_version(&url, api_version)
}

/// Append `api-version` using `?` or `&` as the URL requires
pub fn with_api_version(url: &str, api_version: &str) -> String {
    if api_version.is_empty() || has_query_param(url, "api-version") {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}api-version={}", url, separator, api_version)
}

/// Build a GitLab v4 URL; GitLab versions by path, not by query parameter
pub fn gitlab_url(base_url: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    let path = format!("/{}", path.trim_start_matches('/'));
    if path.starts_with(GITLAB_API_ROOT) {
        join(base_url, &path)
    } else {
        join(base_url, &format!("{}{}", GITLAB_API_ROOT, path))
    }
}

/// Percent-encode a single path segment (project names, GitLab namespaces)
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("https://") || path.starts_with("http://")
}

fn has_query_param(url: &str, name: &str) -> bool {
    let Some((_, query)) = url.split_once('?') else {
        return false;
    };
    query
        .split('&')
        .any(|pair| pair.split('=').next().is_some_and(|key| key.eq_ignore_ascii_case(name)))
}

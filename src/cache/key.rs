//! Cache key generation

use crate::client::Side;

/// Build a cache key from the upstream, the resource kind and an optional scope.
///
/// Keys are readable strings such as `ado:projects` or
/// `ado:repositories:Fabrikam`; the scope is lowercased so lookups are
/// case-insensitive like the upstream names they mirror.
pub fn cache_key(side: Side, resource: &str, scope: Option<&str>) -> String {
    let prefix = match side {
        Side::AzureDevOps => "ado",
        Side::GitLab => "gitlab",
    };
    match scope {
        Some(scope) => format!("{}:{}:{}", prefix, resource, scope.to_lowercase()),
        None => format!("{}:{}", prefix, resource),
    }
}

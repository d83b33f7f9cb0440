//! GitLab command implementations

use crate::cli::{CommandContext, GlobalOptions};
use crate::client::GitLabProject;
use crate::error::Result;
use crate::output;

/// Run the gitlab project command
pub async fn project(opts: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = CommandContext::gitlab(opts)?;
    let project = ctx.client.gitlab_project(id).await?;

    output::print_detail(&project, ctx.format, &detail_fields(&project))
}

fn detail_fields(project: &GitLabProject) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("ID", Some(project.id.to_string())),
        ("Name", Some(project.name.clone())),
        ("Path", Some(project.path_with_namespace.clone())),
        ("Description", project.description.clone()),
        ("Default branch", project.default_branch.clone()),
        ("Visibility", project.visibility.clone()),
        ("Web URL", project.web_url.clone()),
        ("Clone URL", project.http_url_to_repo.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_fields() {
        let project = GitLabProject {
            id: 42,
            name: "app".to_string(),
            path_with_namespace: "group/app".to_string(),
            description: None,
            default_branch: Some("main".to_string()),
            visibility: None,
            web_url: None,
            http_url_to_repo: None,
        };
        let fields = detail_fields(&project);
        assert_eq!(fields[0], ("ID", Some("42".to_string())));
        assert_eq!(fields[2].1.as_deref(), Some("group/app"));
        assert!(fields[3].1.is_none());
    }
}

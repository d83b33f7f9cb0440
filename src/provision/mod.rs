//! Idempotent provisioning of Azure DevOps resources
//!
//! Each `ensure_*` looks the resource up first and only creates it when the
//! lookup comes back empty. A 409 from the create call means someone else got
//! there first and is treated as "already exists".

use log::{debug, info};
use serde::Serialize;
use serde_json::json;

use crate::client::auth::encode_segment;
use crate::client::{MigrationClient, OperationReference, PollOptions, Project, Repository};
use crate::error::{ApiError, ApiResult};

/// Outcome of an ensure call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "resource", rename_all = "lowercase")]
pub enum Ensured<T> {
    /// The resource was already there
    Existing(T),
    /// The resource was created by this call
    Created(T),
}

impl<T> Ensured<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Ensured::Existing(value) | Ensured::Created(value) => value,
        }
    }
}

/// Built-in Azure DevOps process templates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProcessTemplate {
    #[default]
    Agile,
    Scrum,
    Basic,
    Cmmi,
}

impl ProcessTemplate {
    /// The well-known template id
    pub fn type_id(&self) -> &'static str {
        match self {
            ProcessTemplate::Agile => "adcc42ab-9882-485e-a3ed-7678f01f66bc",
            ProcessTemplate::Scrum => "6b724908-ef14-45cf-84f8-768b5384da45",
            ProcessTemplate::Basic => "b8a3a935-7e91-48b8-a94c-606d37c3e9f2",
            ProcessTemplate::Cmmi => "27450541-8e31-4150-9947-dc59f998fc01",
        }
    }
}

/// What to create when a project is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    pub name: String,
    pub description: Option<String>,
    pub process: ProcessTemplate,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            process: ProcessTemplate::default(),
        }
    }

    fn body(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
            "visibility": "private",
            "capabilities": {
                "versioncontrol": { "sourceControlType": "Git" },
                "processTemplate": { "templateTypeId": self.process.type_id() }
            }
        })
    }
}

/// Make sure a project exists, creating it and waiting for the creation
/// operation when it does not
pub async fn ensure_project(
    client: &MigrationClient,
    spec: &ProjectSpec,
    poll: PollOptions,
) -> ApiResult<Ensured<Project>> {
    if let Some(project) = client.find_project(&spec.name).await? {
        debug!("Project '{}' already exists", spec.name);
        return Ok(Ensured::Existing(project));
    }

    info!("Creating project '{}'", spec.name);
    let operation: OperationReference = match client.ado_post("_apis/projects", spec.body()).await {
        Ok(operation) => operation,
        Err(err) if err.is_conflict() => {
            debug!("Project '{}' was created concurrently", spec.name);
            return refind_project(client, &spec.name).await.map(Ensured::Existing);
        }
        Err(err) => return Err(err),
    };

    let state = client.wait_for_operation(&operation.id, poll).await?;
    state.into_result()?;

    client.invalidate_projects().await;
    refind_project(client, &spec.name).await.map(Ensured::Created)
}

async fn refind_project(client: &MigrationClient, name: &str) -> ApiResult<Project> {
    client
        .find_project(name)
        .await?
        .ok_or_else(|| ApiError::MissingResource {
            kind: "Project",
            name: name.to_string(),
        })
}

/// Make sure a Git repository exists in `project`
pub async fn ensure_repository(
    client: &MigrationClient,
    project: &str,
    name: &str,
) -> ApiResult<Ensured<Repository>> {
    if let Some(repo) = client.find_repository(project, name).await? {
        debug!("Repository '{}/{}' already exists", project, name);
        return Ok(Ensured::Existing(repo));
    }

    let owner = client
        .find_project(project)
        .await?
        .ok_or_else(|| ApiError::MissingResource {
            kind: "Project",
            name: project.to_string(),
        })?;

    info!("Creating repository '{}/{}'", project, name);
    let path = format!("{}/_apis/git/repositories", encode_segment(project));
    let body = json!({ "name": name, "project": { "id": owner.id } });
    match client.ado_post::<Repository>(&path, body).await {
        Ok(repo) => Ok(Ensured::Created(repo)),
        Err(err) if err.is_conflict() => {
            debug!("Repository '{}/{}' was created concurrently", project, name);
            client
                .find_repository(project, name)
                .await?
                .map(Ensured::Existing)
                .ok_or_else(|| ApiError::MissingResource {
                    kind: "Repository",
                    name: format!("{}/{}", project, name),
                })
        }
        Err(err) => Err(err),
    }
}

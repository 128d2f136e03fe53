use async_trait::async_trait;

use crate::{
    errors::{ActionError, FetchError},
    models::{MergeRequest, MergeRequestId, Project, ProjectId, SyncReport},
};

#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, FetchError>;
    async fn get_project(&self, project_id: ProjectId) -> Result<Project, FetchError>;
    async fn list_merge_requests(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<MergeRequest>, FetchError>;
    async fn get_merge_request(&self, mr_id: MergeRequestId) -> Result<MergeRequest, FetchError>;
}

/// Requests that mutate backend state. Their effects only become visible
/// through a later fetch.
#[async_trait]
pub trait ReviewActions: Send + Sync {
    async fn rerun_analysis(&self, mr_id: MergeRequestId) -> Result<(), ActionError>;
    async fn post_recommendations(&self, mr_id: MergeRequestId) -> Result<(), ActionError>;
    async fn sync_projects(&self) -> Result<SyncReport, ActionError>;
}

use chrono::{DateTime, Utc};
use mrlens_api::{
    errors::FetchError,
    models::{MergeRequest, MergeRequestId, Project, ProjectId},
    traits::ProjectSource,
    ApiProvider,
};

use crate::integrity;

/// A project and its merge requests as delivered by one fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub project: Project,
    pub merge_requests: Vec<MergeRequest>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(project: Project, merge_requests: Vec<MergeRequest>) -> Self {
        Self {
            project,
            merge_requests,
            fetched_at: Utc::now(),
        }
    }

    pub fn find(&self, id: MergeRequestId) -> Option<&MergeRequest> {
        self.merge_requests.iter().find(|mr| mr.id == id)
    }
}

#[derive(Clone)]
pub struct SnapshotFetcher {
    api: ApiProvider,
}

impl SnapshotFetcher {
    pub fn new(api: ApiProvider) -> Self {
        Self { api }
    }

    /// Fetches project and merge requests together. Either both arrive or the
    /// whole cycle fails.
    pub async fn fetch(&self, project_id: ProjectId) -> Result<Snapshot, FetchError> {
        let (project, merge_requests) = futures::try_join!(
            self.api.get_project(project_id),
            self.api.list_merge_requests(project_id),
        )?;

        let snapshot = Snapshot::new(project, merge_requests);

        for warning in integrity::inspect(&snapshot) {
            tracing::warn!(project_id, "data integrity: {warning}");
        }

        tracing::debug!(
            project_id,
            merge_requests = snapshot.merge_requests.len(),
            "fetched snapshot"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod test {
    use mrlens_api::models::Recommendation;
    use tracing_test::traced_test;

    use super::*;
    use crate::testing::{self, FakeApi};

    #[tokio::test]
    async fn test_fetch_pairs_project_with_merge_requests() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(4, testing::abc());
        let fetcher = SnapshotFetcher::new(fake.provider());

        let snapshot = fetcher.fetch(4).await?;

        assert_eq!(snapshot.project.id, 4);
        assert_eq!(snapshot.merge_requests.len(), 3);
        assert_eq!(
            snapshot.find(1).and_then(|m| m.recommendation()),
            Some(Recommendation::Merge)
        );
        assert!(fake.calls().contains(&"get_project 4".to_string()));
        assert!(fake.calls().contains(&"list_merge_requests 4".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_fails_when_merge_requests_fail() {
        let fake = FakeApi::with_snapshot(4, vec![]);
        fake.state.lock().unwrap().merge_requests.clear();
        fake.push_merge_requests(Err(testing::transport_error("/projects/4/mrs/")));

        let result = SnapshotFetcher::new(fake.provider()).fetch(4).await;

        assert_eq!(result, Err(testing::transport_error("/projects/4/mrs/")));
    }

    #[tokio::test]
    async fn test_fetch_fails_when_project_fails() {
        let fake = FakeApi::with_snapshot(4, testing::abc());
        fake.state.lock().unwrap().project = Some(Err(testing::transport_error("/projects/4/")));

        let result = SnapshotFetcher::new(fake.provider()).fetch(4).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_fetch_logs_integrity_warnings() -> anyhow::Result<()> {
        let mut broken = testing::mr(9, "not a date");
        broken.latest_review = Some(testing::review(Recommendation::Merge, 1));
        let fake = FakeApi::with_snapshot(4, vec![broken]);

        let snapshot = SnapshotFetcher::new(fake.provider()).fetch(4).await?;

        assert_eq!(snapshot.merge_requests.len(), 1);
        assert!(logs_contain("data integrity"));

        Ok(())
    }
}

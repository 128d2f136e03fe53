//! Fixtures and an in-memory backend shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mrlens_api::{
    errors::{ActionError, FetchError},
    models::{
        Issue, MergeRequest, MergeRequestId, Project, ProjectId, Recommendation, Review,
        Severity, SyncReport,
    },
    traits::{ProjectSource, ReviewActions},
    ApiProvider, Provider,
};

pub fn project(id: ProjectId) -> Project {
    Project {
        id,
        gitlab_id: 1000 + id,
        name: format!("project-{id}"),
        path_with_namespace: format!("team/project-{id}"),
        web_url: format!("https://gitlab.example.com/team/project-{id}"),
        avatar_url: None,
        description: None,
        mrs_count: None,
        open_mrs_count: None,
        reviewed_mrs_count: None,
    }
}

pub fn mr(id: MergeRequestId, updated_at: &str) -> MergeRequest {
    MergeRequest {
        id,
        mr_iid: id,
        title: format!("MR {id}"),
        description: String::new(),
        author: "dev".into(),
        state: "opened".into(),
        web_url: format!("https://gitlab.example.com/team/project-1/-/merge_requests/{id}"),
        created_at: "2024-01-01".into(),
        updated_at: updated_at.into(),
        project: None,
        latest_review: None,
    }
}

pub fn reviewed(mut mr: MergeRequest, review: Review) -> MergeRequest {
    mr.latest_review = Some(review);
    mr
}

pub fn review(recommendation: Recommendation, issues: usize) -> Review {
    Review {
        id: 1,
        recommendation,
        confidence: 0.9,
        summary_text: "summary".into(),
        processing_time_ms: None,
        created_at: "2024-01-01T00:00:00Z".into(),
        issues: (0..issues).map(|i| issue(i as i64)).collect(),
        issues_found_count: Some(issues),
    }
}

pub fn issue(id: i64) -> Issue {
    Issue {
        id,
        file_path: "src/lib.rs".into(),
        line_number: Some(10 + id),
        severity: Severity::Warning,
        message: format!("issue {id}"),
        suggested_fix: String::new(),
        rule: "style".into(),
    }
}

/// A: merge with 2 issues, B: reject with 0 issues, C: no review.
pub fn abc() -> Vec<MergeRequest> {
    vec![
        reviewed(mr(1, "2024-01-03"), review(Recommendation::Merge, 2)),
        reviewed(mr(2, "2024-01-05"), review(Recommendation::Reject, 0)),
        mr(3, "2024-01-01"),
    ]
}

#[derive(Default)]
pub struct FakeState {
    pub projects: Vec<Project>,
    pub project: Option<Result<Project, FetchError>>,
    /// Popped per call; the last entry is reused once the queue runs dry.
    pub merge_requests: VecDeque<Result<Vec<MergeRequest>, FetchError>>,
    pub action_result: Option<ActionError>,
    pub calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeApi {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn with_snapshot(project_id: ProjectId, mrs: Vec<MergeRequest>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.project = Some(Ok(project(project_id)));
            state.merge_requests.push_back(Ok(mrs));
        }
        fake
    }

    pub fn push_merge_requests(&self, result: Result<Vec<MergeRequest>, FetchError>) {
        self.state.lock().unwrap().merge_requests.push_back(result);
    }

    pub fn fail_actions(&self, err: ActionError) {
        self.state.lock().unwrap().action_result = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn provider(&self) -> ApiProvider {
        ApiProvider::new(Arc::new(self.clone()))
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn action(&self, call: String) -> Result<(), ActionError> {
        self.record(call);
        match self.state.lock().unwrap().action_result.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn transport_error(endpoint: &str) -> FetchError {
    FetchError::Transport {
        endpoint: endpoint.into(),
        message: "connection refused".into(),
    }
}

#[async_trait]
impl ProjectSource for FakeApi {
    async fn list_projects(&self) -> Result<Vec<Project>, FetchError> {
        self.record("list_projects".into());
        Ok(self.state.lock().unwrap().projects.clone())
    }

    async fn get_project(&self, project_id: ProjectId) -> Result<Project, FetchError> {
        self.record(format!("get_project {project_id}"));
        self.state
            .lock()
            .unwrap()
            .project
            .clone()
            .unwrap_or_else(|| Err(transport_error("/projects/")))
    }

    async fn list_merge_requests(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<MergeRequest>, FetchError> {
        self.record(format!("list_merge_requests {project_id}"));
        let mut state = self.state.lock().unwrap();
        if state.merge_requests.len() > 1 {
            state.merge_requests.pop_front().unwrap()
        } else {
            state
                .merge_requests
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    async fn get_merge_request(&self, mr_id: MergeRequestId) -> Result<MergeRequest, FetchError> {
        self.record(format!("get_merge_request {mr_id}"));
        let state = self.state.lock().unwrap();
        state
            .merge_requests
            .front()
            .and_then(|r| r.as_ref().ok())
            .and_then(|mrs| mrs.iter().find(|m| m.id == mr_id).cloned())
            .ok_or(FetchError::Status {
                endpoint: format!("/mrs/{mr_id}/"),
                status: 404,
            })
    }
}

#[async_trait]
impl ReviewActions for FakeApi {
    async fn rerun_analysis(&self, mr_id: MergeRequestId) -> Result<(), ActionError> {
        self.action(format!("rerun_analysis {mr_id}"))
    }

    async fn post_recommendations(&self, mr_id: MergeRequestId) -> Result<(), ActionError> {
        self.action(format!("post_recommendations {mr_id}"))
    }

    async fn sync_projects(&self) -> Result<SyncReport, ActionError> {
        self.action("sync_projects".into())?;
        Ok(SyncReport {
            status: "ok".into(),
            created: 0,
            updated: 0,
            total: 0,
        })
    }
}

impl Provider for FakeApi {}

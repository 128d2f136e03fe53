use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::{
    errors::{transport_message, ActionError, FetchError},
    models::{MergeRequest, MergeRequestId, Project, ProjectId, SyncReport},
    traits::{ProjectSource, ReviewActions},
    Provider,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

pub struct HttpApi {
    client: Client,
    uri: String,
}

#[derive(Debug, Clone)]
pub struct HttpApiOptions {
    pub uri: String,
    pub timeout: Duration,
}

impl Default for HttpApiOptions {
    fn default() -> Self {
        Self {
            uri: DEFAULT_API_URL.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpApiOptions {
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }
}

impl HttpApi {
    pub fn new(options: HttpApiOptions) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mrlens/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            client,
            uri: options.uri.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.uri, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        tracing::debug!(path, "fetching");

        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                endpoint: path.into(),
                message: transport_message(&e),
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            tracing::warn!(path, status, "fetch returned error status");
            return Err(FetchError::Status {
                endpoint: path.into(),
                status,
            });
        }

        let body = res.bytes().await.map_err(|e| FetchError::Transport {
            endpoint: path.into(),
            message: transport_message(&e),
        })?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            endpoint: path.into(),
            message: e.to_string(),
        })
    }

    async fn post(&self, path: &str) -> Result<Response, ActionError> {
        tracing::debug!(path, "posting");

        let res = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(|e| ActionError::Transport {
                endpoint: path.into(),
                message: transport_message(&e),
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(path, status, "action returned error status");
            return Err(ActionError::Status {
                endpoint: path.into(),
                status,
                detail: error_detail(&body),
            });
        }

        Ok(res)
    }
}

/// Pulls `detail` out of a JSON error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

#[async_trait]
impl ProjectSource for HttpApi {
    async fn list_projects(&self) -> Result<Vec<Project>, FetchError> {
        self.get_json("/projects/").await
    }

    async fn get_project(&self, project_id: ProjectId) -> Result<Project, FetchError> {
        self.get_json(&format!("/projects/{project_id}/")).await
    }

    async fn list_merge_requests(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<MergeRequest>, FetchError> {
        self.get_json(&format!("/projects/{project_id}/mrs/")).await
    }

    async fn get_merge_request(&self, mr_id: MergeRequestId) -> Result<MergeRequest, FetchError> {
        self.get_json(&format!("/mrs/{mr_id}/")).await
    }
}

#[async_trait]
impl ReviewActions for HttpApi {
    async fn rerun_analysis(&self, mr_id: MergeRequestId) -> Result<(), ActionError> {
        self.post(&format!("/mrs/{mr_id}/rerun/")).await?;
        Ok(())
    }

    async fn post_recommendations(&self, mr_id: MergeRequestId) -> Result<(), ActionError> {
        self.post(&format!("/mrs/{mr_id}/recommendations/")).await?;
        Ok(())
    }

    async fn sync_projects(&self) -> Result<SyncReport, ActionError> {
        let endpoint = "/projects/sync/";
        let res = self.post(endpoint).await?;

        res.json::<SyncReport>()
            .await
            .map_err(|e| ActionError::Transport {
                endpoint: endpoint.into(),
                message: format!("invalid response body: {e}"),
            })
    }
}

impl Provider for HttpApi {}

#[cfg(test)]
mod test {
    use serde_json::json;
    use tracing_test::traced_test;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn project_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "gitlab_id": 100 + id,
            "name": "api",
            "path_with_namespace": "team/api",
            "web_url": "https://gitlab.example.com/team/api",
            "avatar_url": null,
            "description": "backend",
            "mrs_count": 3,
            "open_mrs_count": 2,
            "reviewed_mrs_count": 1
        })
    }

    async fn api(server: &MockServer) -> anyhow::Result<HttpApi> {
        HttpApi::new(HttpApiOptions::with_uri(format!("{}/api/", server.uri())))
    }

    #[tokio::test]
    async fn test_lists_projects() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                project_json(1),
                project_json(2)
            ])))
            .mount(&server)
            .await;

        let projects = api(&server).await?.list_projects().await?;

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].gitlab_id, 102);
        assert_eq!(projects[0].open_mrs_count, Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_lists_merge_requests_without_reviews() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/7/mrs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "mr_iid": 11,
                "title": "Fix login",
                "description": "",
                "author": "dev",
                "state": "opened",
                "web_url": "https://gitlab.example.com/team/api/-/merge_requests/11",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-02T00:00:00Z",
                "project": project_json(7),
                "latest_review": null
            }])))
            .mount(&server)
            .await;

        let mrs = api(&server).await?.list_merge_requests(7).await?;

        assert_eq!(mrs.len(), 1);
        assert!(mrs[0].latest_review.is_none());

        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_error_status_maps_to_fetch_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/3/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = api(&server).await?.get_project(3).await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Status {
                endpoint: "/projects/3/".into(),
                status: 404
            }
        );
        assert!(logs_contain("fetch returned error status"));

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects/3/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = api(&server).await?.get_project(3).await.unwrap_err();

        assert!(matches!(err, FetchError::Decode { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_server_maps_to_transport_error() -> anyhow::Result<()> {
        let api = HttpApi::new(HttpApiOptions {
            uri: "http://127.0.0.1:1/api".into(),
            timeout: Duration::from_secs(2),
        })?;

        let err = api.list_projects().await.unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_actions_post_to_backend() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/mrs/5/rerun/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "processing_started"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/mrs/5/recommendations/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "No issues to send"})),
            )
            .mount(&server)
            .await;

        let api = api(&server).await?;
        api.rerun_analysis(5).await?;
        let err = api.post_recommendations(5).await.unwrap_err();

        assert_eq!(
            err,
            ActionError::Status {
                endpoint: "/mrs/5/recommendations/".into(),
                status: 400,
                detail: "No issues to send".into()
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_projects_reports_counts() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/projects/sync/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "created": 2,
                "updated": 5,
                "total": 7
            })))
            .mount(&server)
            .await;

        let report = api(&server).await?.sync_projects().await?;

        assert_eq!(report.created, 2);
        assert_eq!(report.total, 7);

        Ok(())
    }
}

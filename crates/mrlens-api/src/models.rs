use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub type ProjectId = i64;
pub type MergeRequestId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub gitlab_id: i64,
    pub name: String,
    pub path_with_namespace: String,
    pub web_url: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Counters are only annotated on the list endpoint.
    #[serde(default)]
    pub mrs_count: Option<u64>,
    #[serde(default)]
    pub open_mrs_count: Option<u64>,
    #[serde(default)]
    pub reviewed_mrs_count: Option<u64>,
}

impl Project {
    pub fn description_or_default(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => "No description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: MergeRequestId,
    pub mr_iid: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    pub state: String,
    pub web_url: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub latest_review: Option<Review>,
}

impl MergeRequest {
    /// `None` when `updated_at` cannot be parsed.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    /// Issue count of the latest review, 0 when there is none.
    pub fn issue_count(&self) -> usize {
        self.latest_review
            .as_ref()
            .map(|r| r.issues.len())
            .unwrap_or_default()
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.latest_review.as_ref().map(|r| r.recommendation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Merge,
    NeedsFixes,
    Reject,
    Pending,
    Failed,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Merge => "merge",
            Recommendation::NeedsFixes => "needs_fixes",
            Recommendation::Reject => "reject",
            Recommendation::Pending => "pending",
            Recommendation::Failed => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Merge => "Ready for merge",
            Recommendation::NeedsFixes => "Changes requested",
            Recommendation::Reject => "Rejected by AI",
            Recommendation::Pending => "Pending",
            Recommendation::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub summary_text: String,
    /// Zero or absent means the backend did not measure it.
    #[serde(default)]
    pub processing_time_ms: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub issues_found_count: Option<usize>,
}

impl Review {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// Processing time when it was actually measured.
    pub fn measured_processing_ms(&self) -> Option<u64> {
        self.processing_time_ms
            .filter(|ms| *ms > 0)
            .and_then(|ms| u64::try_from(ms).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub file_path: String,
    /// `None` for file level findings.
    #[serde(default)]
    pub line_number: Option<i64>,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub suggested_fix: String,
    #[serde(default)]
    pub rule: String,
}

impl Issue {
    pub fn location(&self) -> String {
        match self.line_number {
            Some(line) => format!("{}:{}", self.file_path, line),
            None => self.file_path.clone(),
        }
    }

    pub fn suggested_fix(&self) -> Option<&str> {
        Some(self.suggested_fix.as_str()).filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    #[serde(default)]
    pub status: String,
    pub created: u64,
    pub updated: u64,
    pub total: u64,
}

/// Parses the timestamp formats the backend emits. Naive values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

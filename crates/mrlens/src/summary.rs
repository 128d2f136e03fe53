use chrono::{DateTime, Utc};
use mrlens_api::models::{MergeRequest, Project, Recommendation};
use serde::Serialize;

/// Statistics over one project's merge requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub with_review: usize,
    pub rec_merge: usize,
    pub rec_needs_fixes: usize,
    pub rec_reject: usize,
    /// Mean over measured reviews only, rounded to the nearest millisecond.
    pub avg_processing_ms: u64,
    pub total_issues: usize,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

pub fn summarize(merge_requests: &[MergeRequest]) -> Summary {
    let mut summary = Summary {
        total: merge_requests.len(),
        ..Default::default()
    };

    let mut measured_sum: u128 = 0;
    let mut measured_count: u128 = 0;

    for review in merge_requests.iter().filter_map(|mr| mr.latest_review.as_ref()) {
        summary.with_review += 1;
        summary.total_issues += review.issues.len();

        match review.recommendation {
            Recommendation::Merge => summary.rec_merge += 1,
            Recommendation::NeedsFixes => summary.rec_needs_fixes += 1,
            Recommendation::Reject => summary.rec_reject += 1,
            Recommendation::Pending | Recommendation::Failed => {}
        }

        if let Some(ms) = review.measured_processing_ms() {
            measured_sum += u128::from(ms);
            measured_count += 1;
        }

        if let Some(created) = review.created() {
            summary.last_analyzed_at = summary.last_analyzed_at.max(Some(created));
        }
    }

    if measured_count > 0 {
        let rounded = (measured_sum + measured_count / 2) / measured_count;
        summary.avg_processing_ms = u64::try_from(rounded).unwrap_or(u64::MAX);
    }

    summary
}

/// Totals across every project on the projects page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectsOverview {
    pub projects: usize,
    pub mrs: u64,
    pub open_mrs: u64,
    pub reviewed_mrs: u64,
}

pub fn summarize_projects(projects: &[Project]) -> ProjectsOverview {
    projects.iter().fold(
        ProjectsOverview {
            projects: projects.len(),
            ..Default::default()
        },
        |mut overview, project| {
            overview.mrs += project.mrs_count.unwrap_or_default();
            overview.open_mrs += project.open_mrs_count.unwrap_or_default();
            overview.reviewed_mrs += project.reviewed_mrs_count.unwrap_or_default();
            overview
        },
    )
}

pub fn format_duration(ms: u64) -> String {
    match ms {
        0 => "—".into(),
        1..=999 => format!("{ms} ms"),
        1000..=59_999 => format!("{:.1} s", ms as f64 / 1000.0),
        _ => {
            let seconds = ms / 1000;
            format!("{} min {}s", seconds / 60, seconds % 60)
        }
    }
}

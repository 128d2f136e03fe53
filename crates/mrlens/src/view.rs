use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use mrlens_api::models::{MergeRequest, Recommendation};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RecommendationFilter {
    #[default]
    All,
    Merge,
    NeedsFixes,
    Reject,
    NoReview,
}

impl RecommendationFilter {
    pub fn matches(&self, mr: &MergeRequest) -> bool {
        match self {
            RecommendationFilter::All => true,
            RecommendationFilter::Merge => mr.recommendation() == Some(Recommendation::Merge),
            RecommendationFilter::NeedsFixes => {
                mr.recommendation() == Some(Recommendation::NeedsFixes)
            }
            RecommendationFilter::Reject => mr.recommendation() == Some(Recommendation::Reject),
            RecommendationFilter::NoReview => mr.latest_review.is_none(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            RecommendationFilter::All => RecommendationFilter::Merge,
            RecommendationFilter::Merge => RecommendationFilter::NeedsFixes,
            RecommendationFilter::NeedsFixes => RecommendationFilter::Reject,
            RecommendationFilter::Reject => RecommendationFilter::NoReview,
            RecommendationFilter::NoReview => RecommendationFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecommendationFilter::All => "All",
            RecommendationFilter::Merge => "Ready for merge",
            RecommendationFilter::NeedsFixes => "Changes requested",
            RecommendationFilter::Reject => "Rejected",
            RecommendationFilter::NoReview => "No review",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    UpdatedDesc,
    IssuesDesc,
    IssuesAsc,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::UpdatedDesc => SortKey::IssuesDesc,
            SortKey::IssuesDesc => SortKey::IssuesAsc,
            SortKey::IssuesAsc => SortKey::UpdatedDesc,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::UpdatedDesc => "Recently updated",
            SortKey::IssuesDesc => "Most issues",
            SortKey::IssuesAsc => "Fewest issues",
        }
    }

    fn compare(&self, a: &MergeRequest, b: &MergeRequest) -> Ordering {
        let by_updated = updated_key(b).cmp(&updated_key(a));
        match self {
            SortKey::UpdatedDesc => by_updated,
            SortKey::IssuesDesc => b.issue_count().cmp(&a.issue_count()).then(by_updated),
            SortKey::IssuesAsc => a.issue_count().cmp(&b.issue_count()).then(by_updated),
        }
    }
}

/// Unparsable timestamps are `None`, which orders before every real instant.
fn updated_key(mr: &MergeRequest) -> Option<DateTime<Utc>> {
    mr.updated()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: RecommendationFilter,
    pub only_with_issues: bool,
    pub sort: SortKey,
}

impl ViewOptions {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn keeps(&self, mr: &MergeRequest) -> bool {
        self.filter.matches(mr) && (!self.only_with_issues || mr.issue_count() > 0)
    }
}

/// Filters and orders merge requests. Equal keys keep their input order.
pub fn view<'a>(
    merge_requests: impl IntoIterator<Item = &'a MergeRequest>,
    options: &ViewOptions,
) -> Vec<&'a MergeRequest> {
    let mut items: Vec<&MergeRequest> = merge_requests
        .into_iter()
        .filter(|mr| options.keeps(mr))
        .collect();

    items.sort_by(|a, b| options.sort.compare(a, b));

    items
}

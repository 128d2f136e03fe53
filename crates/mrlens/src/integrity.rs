use mrlens_api::models::{parse_timestamp, MergeRequestId};

use crate::snapshot::Snapshot;

/// Problems in fetched data that are logged but never block rendering.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DataIntegrityWarning {
    #[error("merge request {mr_id} has malformed {field}: {value:?}")]
    MalformedTimestamp {
        mr_id: MergeRequestId,
        field: &'static str,
        value: String,
    },

    #[error("review {review_id} reports {reported} issues but carries {actual}")]
    IssueCountMismatch {
        review_id: i64,
        reported: usize,
        actual: usize,
    },

    #[error("review {review_id} has confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange { review_id: i64, confidence: f64 },
}

pub fn inspect(snapshot: &Snapshot) -> Vec<DataIntegrityWarning> {
    let mut warnings = Vec::new();

    for mr in &snapshot.merge_requests {
        if parse_timestamp(&mr.updated_at).is_none() {
            warnings.push(DataIntegrityWarning::MalformedTimestamp {
                mr_id: mr.id,
                field: "updated_at",
                value: mr.updated_at.clone(),
            });
        }

        let Some(review) = &mr.latest_review else {
            continue;
        };

        if review.created().is_none() {
            warnings.push(DataIntegrityWarning::MalformedTimestamp {
                mr_id: mr.id,
                field: "review.created_at",
                value: review.created_at.clone(),
            });
        }

        if let Some(reported) = review.issues_found_count {
            if reported != review.issues.len() {
                warnings.push(DataIntegrityWarning::IssueCountMismatch {
                    review_id: review.id,
                    reported,
                    actual: review.issues.len(),
                });
            }
        }

        if !(0.0..=1.0).contains(&review.confidence) {
            warnings.push(DataIntegrityWarning::ConfidenceOutOfRange {
                review_id: review.id,
                confidence: review.confidence,
            });
        }
    }

    warnings
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mrlens_api::{
    errors::ActionError,
    models::{MergeRequest, MergeRequestId},
    traits::ReviewActions,
    ApiProvider,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("merge request {mr_id} has no issues to post")]
    NoIssues { mr_id: MergeRequestId },

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Fires the backend mutating requests. Effects show up through the next
/// snapshot fetch, never by patching local state.
#[derive(Clone)]
pub struct ActionDispatcher {
    api: ApiProvider,
    reanalysis: Arc<AtomicUsize>,
    posting: Arc<AtomicUsize>,
}

/// Held for as long as a request of one kind is outstanding.
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }

    /// Only succeeds when no request of the same kind is outstanding.
    fn try_enter(counter: &Arc<AtomicUsize>) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(counter.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ActionDispatcher {
    pub fn new(api: ApiProvider) -> Self {
        Self {
            api,
            reanalysis: Arc::default(),
            posting: Arc::default(),
        }
    }

    pub fn is_reanalyzing(&self) -> bool {
        self.reanalysis.load(Ordering::SeqCst) > 0
    }

    pub fn is_posting(&self) -> bool {
        self.posting.load(Ordering::SeqCst) > 0
    }

    /// Claims the re-analysis slot, `None` while one is already running.
    pub fn begin_reanalysis(&self) -> Option<InFlight> {
        InFlight::try_enter(&self.reanalysis)
    }

    pub fn begin_recommendation_post(&self) -> Option<InFlight> {
        InFlight::try_enter(&self.posting)
    }

    pub fn check_recommendation_post(mr: &MergeRequest) -> Result<(), DispatchError> {
        if mr.issue_count() == 0 {
            return Err(DispatchError::NoIssues { mr_id: mr.id });
        }

        Ok(())
    }

    pub async fn request_reanalysis(&self, mr_id: MergeRequestId) -> Result<(), DispatchError> {
        let _in_flight = InFlight::enter(&self.reanalysis);

        self.api.rerun_analysis(mr_id).await.map_err(|e| {
            tracing::warn!(mr_id, "re-analysis request failed: {e}");
            e
        })?;

        tracing::info!(mr_id, "re-analysis requested");
        Ok(())
    }

    /// Rejects merge requests without issues before touching the network.
    pub async fn request_recommendation_post(
        &self,
        mr: &MergeRequest,
    ) -> Result<(), DispatchError> {
        Self::check_recommendation_post(mr)?;

        let _in_flight = InFlight::enter(&self.posting);

        self.api.post_recommendations(mr.id).await.map_err(|e| {
            tracing::warn!(mr_id = mr.id, "posting recommendations failed: {e}");
            e
        })?;

        tracing::info!(mr_id = mr.id, "recommendations posted");
        Ok(())
    }
}

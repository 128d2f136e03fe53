use std::{ops::Deref, sync::Arc, time::Duration};

use mrlens_api::{
    errors::FetchError,
    models::{MergeRequest, MergeRequestId, ProjectId},
};
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    selection,
    snapshot::{Snapshot, SnapshotFetcher},
};

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    Tick,
    Manual,
}

/// One issued fetch. Generations increase monotonically across mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub project_id: ProjectId,
    pub generation: u64,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Failed,
    /// Result belonged to another project, a previous mount, or was overtaken
    /// by a later cycle. State is untouched.
    Discarded,
}

/// The refresh state machine. Holds the current snapshot and the selection as
/// an id that is resolved against the snapshot on every access.
#[derive(Debug, Default)]
pub struct Refresher {
    project_id: Option<ProjectId>,
    state: RefreshState,
    snapshot: Option<Arc<Snapshot>>,
    selected: Option<MergeRequestId>,
    error: Option<FetchError>,
    next_generation: u64,
    latest_issued: u64,
    applied: u64,
    mount_floor: u64,
}

impl Refresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn selected(&self) -> Option<&MergeRequest> {
        let id = self.selected?;
        self.snapshot.as_ref()?.find(id)
    }

    /// Selects `id` if it is part of the current snapshot.
    pub fn select(&mut self, id: MergeRequestId) -> bool {
        let known = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.find(id).is_some());
        if known {
            self.selected = Some(id);
        }
        known
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Starts watching `project_id`. Everything issued before this call is
    /// ignored when it resolves.
    pub fn mount(&mut self, project_id: ProjectId) -> Cycle {
        if self.project_id != Some(project_id) {
            self.snapshot = None;
            self.selected = None;
        }
        self.project_id = Some(project_id);
        self.error = None;
        self.mount_floor = self.next_generation + 1;

        self.issue(project_id, Trigger::Mount)
    }

    pub fn unmount(&mut self) {
        self.project_id = None;
        self.state = RefreshState::Idle;
        self.snapshot = None;
        self.selected = None;
        self.error = None;
        self.mount_floor = self.next_generation + 1;
    }

    /// Timer ticks are dropped while a cycle is loading.
    pub fn on_tick(&mut self) -> Option<Cycle> {
        let project_id = self.project_id?;
        if self.state == RefreshState::Loading {
            return None;
        }

        Some(self.issue(project_id, Trigger::Tick))
    }

    /// Explicit refreshes always issue, superseding whatever is in flight.
    pub fn request_refresh(&mut self) -> Option<Cycle> {
        let project_id = self.project_id?;

        Some(self.issue(project_id, Trigger::Manual))
    }

    pub fn complete(&mut self, cycle: Cycle, result: Result<Snapshot, FetchError>) -> Outcome {
        if self.project_id != Some(cycle.project_id)
            || cycle.generation < self.mount_floor
            || cycle.generation <= self.applied
        {
            tracing::debug!(
                project_id = cycle.project_id,
                generation = cycle.generation,
                "discarding stale refresh result"
            );
            return Outcome::Discarded;
        }

        self.applied = cycle.generation;
        let settled = cycle.generation == self.latest_issued;

        match result {
            Ok(snapshot) => {
                let previous = self.selected().cloned();
                self.selected = selection::reconcile(previous.as_ref(), &snapshot.merge_requests)
                    .map(|mr| mr.id);
                self.snapshot = Some(Arc::new(snapshot));
                self.error = None;
                if settled {
                    self.state = RefreshState::Ready;
                }

                Outcome::Applied
            }
            Err(e) => {
                tracing::warn!(project_id = cycle.project_id, "refresh failed: {e}");
                self.error = Some(e);
                if settled {
                    self.state = RefreshState::Failed;
                }

                Outcome::Failed
            }
        }
    }

    fn issue(&mut self, project_id: ProjectId, trigger: Trigger) -> Cycle {
        self.next_generation += 1;
        self.latest_issued = self.next_generation;
        self.state = RefreshState::Loading;

        Cycle {
            project_id,
            generation: self.next_generation,
            trigger,
        }
    }
}

#[derive(Debug)]
pub enum RefreshEvent {
    Tick {
        project_id: ProjectId,
    },
    Completed {
        cycle: Cycle,
        result: Result<Snapshot, FetchError>,
    },
}

/// Drives a [`Refresher`] with a poll ticker and spawned fetches. Events are
/// delivered to `events` and must be fed back through [`RefreshScheduler::handle`].
pub struct RefreshScheduler {
    fetcher: SnapshotFetcher,
    refresher: Refresher,
    events: UnboundedSender<RefreshEvent>,
    ticker: Option<CancellationToken>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(fetcher: SnapshotFetcher, events: UnboundedSender<RefreshEvent>) -> Self {
        Self {
            fetcher,
            refresher: Refresher::new(),
            events,
            ticker: None,
            interval: REFRESH_INTERVAL,
        }
    }

    pub fn mount(&mut self, project_id: ProjectId) {
        self.stop_ticker();
        tracing::info!(project_id, "mounting refresh scheduler");

        let cycle = self.refresher.mount(project_id);
        self.spawn_fetch(cycle);
        self.start_ticker(project_id);
    }

    pub fn unmount(&mut self) {
        self.stop_ticker();
        self.refresher.unmount();
    }

    pub fn refresh_now(&mut self) {
        if let Some(cycle) = self.refresher.request_refresh() {
            self.spawn_fetch(cycle);
        }
    }

    pub fn select(&mut self, id: MergeRequestId) -> bool {
        self.refresher.select(id)
    }

    pub fn dismiss_error(&mut self) {
        self.refresher.dismiss_error()
    }

    pub fn handle(&mut self, event: RefreshEvent) -> Option<Outcome> {
        match event {
            RefreshEvent::Tick { project_id } => {
                if self.refresher.project_id() != Some(project_id) {
                    return None;
                }
                if let Some(cycle) = self.refresher.on_tick() {
                    self.spawn_fetch(cycle);
                }

                None
            }
            RefreshEvent::Completed { cycle, result } => {
                Some(self.refresher.complete(cycle, result))
            }
        }
    }

    fn spawn_fetch(&self, cycle: Cycle) {
        let fetcher = self.fetcher.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            tracing::debug!(
                project_id = cycle.project_id,
                generation = cycle.generation,
                trigger = ?cycle.trigger,
                "fetching snapshot"
            );
            let result = fetcher.fetch(cycle.project_id).await;

            if events
                .send(RefreshEvent::Completed { cycle, result })
                .is_err()
            {
                tracing::debug!("refresh receiver closed, dropping result");
            }
        });
    }

    fn start_ticker(&mut self, project_id: ProjectId) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        break;
                    }
                    _ = interval.tick() => {
                        if events.send(RefreshEvent::Tick { project_id }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.ticker = Some(token);
    }

    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }
}

impl Deref for RefreshScheduler {
    type Target = Refresher;

    fn deref(&self) -> &Self::Target {
        &self.refresher
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

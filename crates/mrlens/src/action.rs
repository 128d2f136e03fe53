use mrlens_api::{
    errors::FetchError,
    models::{MergeRequestId, Project, ProjectId},
};

use crate::dispatcher::DispatchError;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Quit,
    Error(String),

    Up,
    Down,
    Open,
    Back,

    CycleFilter,
    ToggleOnlyWithIssues,
    CycleSort,
    ResetFilters,

    Refresh,
    RequestReanalysis,
    PostRecommendations,
    DismissError,

    /// Broadcast to every page; the dashboard mounts its scheduler.
    OpenProject(ProjectId),
    ProjectsLoaded(Result<Vec<Project>, FetchError>),
    Dispatched(Dispatched),
}

impl Action {
    /// Navigation actions reach every page, not just the visible one.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Action::OpenProject(_) | Action::Back)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Reanalysis,
    Recommendations,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub kind: DispatchKind,
    pub mr_id: MergeRequestId,
    pub result: Result<(), DispatchError>,
}

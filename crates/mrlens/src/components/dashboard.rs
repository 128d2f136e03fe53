use chrono::Utc;
use mrlens_api::{
    models::{MergeRequest, MergeRequestId},
    ApiProvider,
};
use ratatui::{prelude::*, widgets::*};
use timeago::Formatter;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    action::{Action, DispatchKind, Dispatched},
    dispatcher::ActionDispatcher,
    scheduler::{RefreshEvent, RefreshScheduler, RefreshState},
    snapshot::SnapshotFetcher,
    summary::summarize,
    view::{view, ViewOptions},
};

use super::{step, Component};

mod review;
mod stats;

pub struct Dashboard {
    scheduler: RefreshScheduler,
    refresh_events: UnboundedReceiver<RefreshEvent>,
    dispatcher: ActionDispatcher,
    action_tx: Option<UnboundedSender<Action>>,
    options: ViewOptions,
    status: Option<String>,
    list_state: ListState,
}

impl Dashboard {
    pub fn new(api: ApiProvider) -> Self {
        let (events_tx, refresh_events) = mpsc::unbounded_channel();

        Self {
            scheduler: RefreshScheduler::new(SnapshotFetcher::new(api.clone()), events_tx),
            refresh_events,
            dispatcher: ActionDispatcher::new(api),
            action_tx: None,
            options: ViewOptions::default(),
            status: None,
            list_state: ListState::default(),
        }
    }

    fn visible(&self) -> Vec<&MergeRequest> {
        match self.scheduler.snapshot() {
            Some(snapshot) => view(&snapshot.merge_requests, &self.options),
            None => Vec::new(),
        }
    }

    fn visible_ids(&self) -> Vec<MergeRequestId> {
        self.visible().iter().map(|mr| mr.id).collect()
    }

    fn drain_refresh_events(&mut self) {
        while let Ok(event) = self.refresh_events.try_recv() {
            self.scheduler.handle(event);
        }
    }

    fn move_selection(&mut self, down: bool) {
        let ids = self.visible_ids();
        let current = self
            .scheduler
            .selected()
            .and_then(|mr| ids.iter().position(|id| *id == mr.id));

        if let Some(next) = step(current, ids.len(), down) {
            self.scheduler.select(ids[next]);
        }
    }

    /// After the view changes, move the selection into it if it fell out.
    fn keep_selection_visible(&mut self) {
        let ids = self.visible_ids();
        let visible = self
            .scheduler
            .selected()
            .is_some_and(|mr| ids.contains(&mr.id));

        if !visible {
            if let Some(first) = ids.first() {
                self.scheduler.select(*first);
            }
        }
    }

    fn dispatch(&mut self, kind: DispatchKind) {
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let Some(mr) = self.scheduler.selected().cloned() else {
            return;
        };

        let in_flight = match kind {
            DispatchKind::Reanalysis => self.dispatcher.begin_reanalysis(),
            DispatchKind::Recommendations => {
                if let Err(e) = ActionDispatcher::check_recommendation_post(&mr) {
                    self.status = Some(e.to_string());
                    return;
                }
                self.dispatcher.begin_recommendation_post()
            }
        };
        let Some(in_flight) = in_flight else {
            return;
        };

        self.status = Some(match kind {
            DispatchKind::Reanalysis => format!("requesting re-analysis of !{}...", mr.mr_iid),
            DispatchKind::Recommendations => {
                format!("posting recommendations to !{}...", mr.mr_iid)
            }
        });

        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let result = match kind {
                DispatchKind::Reanalysis => dispatcher.request_reanalysis(mr.id).await,
                DispatchKind::Recommendations => dispatcher.request_recommendation_post(&mr).await,
            };
            drop(in_flight);

            let dispatched = Dispatched {
                kind,
                mr_id: mr.id,
                result,
            };
            if tx.send(Action::Dispatched(dispatched)).is_err() {
                tracing::debug!("dispatch receiver closed");
            }
        });
    }

    /// Title and message for the last failed refresh, if it is still shown.
    fn error_banner(&self) -> Option<(String, String)> {
        self.scheduler
            .error()
            .map(|e| (format!("Refresh failed: {}", e.endpoint()), e.to_string()))
    }

    fn on_dispatched(&mut self, dispatched: Dispatched) {
        self.status = Some(match (dispatched.kind, dispatched.result) {
            (DispatchKind::Reanalysis, Ok(())) => {
                "Analysis restarted, results appear with the next refresh".into()
            }
            (DispatchKind::Recommendations, Ok(())) => "Recommendations sent to GitLab".into(),
            (_, Err(e)) => format!("Error: {e}"),
        });
    }

    fn draw_header(&self, f: &mut crate::tui::Frame<'_>, area: Rect) {
        let (title, subtitle) = match self.scheduler.snapshot() {
            Some(snapshot) => (
                snapshot.project.name.clone(),
                format!(
                    "{} · {} · fetched {}",
                    snapshot.project.path_with_namespace,
                    snapshot.project.web_url,
                    snapshot.fetched_at.format("%H:%M:%S")
                ),
            ),
            None => ("Loading project...".to_string(), String::new()),
        };

        let state = match self.scheduler.state() {
            RefreshState::Idle => "",
            RefreshState::Loading => " refreshing",
            RefreshState::Ready => "",
            RefreshState::Failed => " refresh failed",
        };

        let lines = vec![
            Line::from(vec![Span::from(title).bold(), state.dark_gray()]),
            Line::from(Span::from(subtitle).dark_gray()),
        ];

        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM)),
            area,
        );
    }

    fn draw_filters(&self, f: &mut crate::tui::Frame<'_>, area: Rect) {
        let only_with_issues = if self.options.only_with_issues {
            "[x]"
        } else {
            "[ ]"
        };

        let line = Line::from(vec![
            "Filter (f): ".dark_gray(),
            self.options.filter.label().into(),
            "   With issues only (i): ".dark_gray(),
            only_with_issues.into(),
            "   Sort (s): ".dark_gray(),
            self.options.sort.label().into(),
            "   (x) reset".dark_gray(),
        ]);

        f.render_widget(Paragraph::new(line), area);
    }

    fn draw_list(&mut self, f: &mut crate::tui::Frame<'_>, area: Rect) {
        let formatter = Formatter::default();
        let now = Utc::now();
        let selected_id = self.scheduler.selected().map(|mr| mr.id);

        let visible = self.visible();
        let position = visible.iter().position(|mr| Some(mr.id) == selected_id);
        let items: Vec<ListItem> = visible
            .iter()
            .map(|mr| {
                let badge = match mr.latest_review.as_ref() {
                    Some(review) => Span::styled(
                        format!(" {} ", review.recommendation.label()),
                        review::recommendation_style(review.recommendation),
                    ),
                    None => " No review ".dark_gray(),
                };
                let updated = mr
                    .updated()
                    .map(|t| formatter.convert_chrono(t, now))
                    .unwrap_or_else(|| "unknown".into());

                ListItem::new(vec![
                    Line::from(vec![
                        Span::from(format!("!{} ", mr.mr_iid)).bold(),
                        mr.title.clone().into(),
                    ]),
                    Line::from(vec![
                        Span::from(format!(
                            "{} · {} · {} issues · ",
                            mr.author,
                            updated,
                            mr.issue_count()
                        ))
                        .dark_gray(),
                        badge,
                    ]),
                ])
            })
            .collect();
        let empty = items.is_empty();

        let title = format!("Merge requests ({})", items.len());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        self.list_state.select(position);
        if empty {
            f.render_widget(
                Paragraph::new("No merge requests match these filters.")
                    .block(Block::default().borders(Borders::ALL).title("Merge requests")),
                area,
            );
        } else {
            f.render_stateful_widget(list, area, &mut self.list_state);
        }
    }

    fn draw_status(&self, f: &mut crate::tui::Frame<'_>, area: Rect) {
        let text = match &self.status {
            Some(status) => status.clone(),
            None => "r refresh · a re-analyse · p post recommendations · esc back · q quit".into(),
        };

        f.render_widget(
            Paragraph::new(text).fg(Color::Black).bg(Color::White),
            area,
        );
    }
}

impl Component for Dashboard {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> anyhow::Result<()> {
        self.action_tx = Some(tx);

        Ok(())
    }

    fn update(&mut self, action: Action) -> anyhow::Result<Option<Action>> {
        match action {
            Action::OpenProject(project_id) => {
                self.options.reset();
                self.status = None;
                self.scheduler.mount(project_id);
            }
            Action::Back => self.scheduler.unmount(),
            Action::Tick | Action::Render => self.drain_refresh_events(),
            Action::Refresh => self.scheduler.refresh_now(),
            Action::Up => self.move_selection(false),
            Action::Down => self.move_selection(true),
            Action::CycleFilter => {
                self.options.filter = self.options.filter.next();
                self.keep_selection_visible();
            }
            Action::ToggleOnlyWithIssues => {
                self.options.only_with_issues = !self.options.only_with_issues;
                self.keep_selection_visible();
            }
            Action::CycleSort => self.options.sort = self.options.sort.next(),
            Action::ResetFilters => {
                self.options.reset();
                self.keep_selection_visible();
            }
            Action::RequestReanalysis => self.dispatch(DispatchKind::Reanalysis),
            Action::PostRecommendations => self.dispatch(DispatchKind::Recommendations),
            Action::Dispatched(dispatched) => self.on_dispatched(dispatched),
            Action::DismissError => {
                self.scheduler.dismiss_error();
                self.status = None;
            }
            _ => {}
        }

        Ok(None)
    }

    fn draw(&mut self, f: &mut crate::tui::Frame<'_>, area: Rect) -> anyhow::Result<()> {
        let error = self.error_banner();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(if error.is_some() { 3 } else { 0 }),
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(f, layout[0]);

        if let Some((title, error)) = error {
            f.render_widget(
                Paragraph::new(format!("{error} (d to dismiss)"))
                    .fg(Color::Red)
                    .block(Block::default().borders(Borders::ALL).title(title)),
                layout[1],
            );
        }

        if let Some(snapshot) = self.scheduler.snapshot() {
            stats::draw(f, layout[2], &summarize(&snapshot.merge_requests));
        }

        self.draw_filters(f, layout[3]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(layout[4]);

        self.draw_list(f, body[0]);
        review::draw(
            f,
            body[1],
            self.scheduler.selected(),
            self.dispatcher.is_reanalyzing(),
            self.dispatcher.is_posting(),
        );

        self.draw_status(f, layout[5]);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use mrlens_api::models::Recommendation;

    use super::*;
    use crate::testing::{self, FakeApi};

    async fn mounted(fake: &FakeApi) -> anyhow::Result<Dashboard> {
        let mut dashboard = Dashboard::new(fake.provider());
        dashboard.update(Action::OpenProject(1))?;

        let event = dashboard
            .refresh_events
            .recv()
            .await
            .expect("initial snapshot");
        dashboard.scheduler.handle(event);

        Ok(dashboard)
    }

    #[tokio::test]
    async fn test_open_project_mounts_and_selects_first() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let dashboard = mounted(&fake).await?;

        assert_eq!(dashboard.scheduler.state(), RefreshState::Ready);
        assert_eq!(dashboard.visible_ids(), vec![2, 1, 3]);
        assert_eq!(dashboard.scheduler.selected().map(|mr| mr.id), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn test_navigation_follows_visible_order() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;

        dashboard.update(Action::Down)?;
        assert_eq!(dashboard.scheduler.selected().map(|mr| mr.id), Some(3));

        dashboard.update(Action::Up)?;
        dashboard.update(Action::Up)?;
        assert_eq!(dashboard.scheduler.selected().map(|mr| mr.id), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_filter_moves_selection_into_view() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;

        // All -> Merge -> NeedsFixes -> Reject -> NoReview
        for _ in 0..4 {
            dashboard.update(Action::CycleFilter)?;
        }

        assert_eq!(dashboard.visible_ids(), vec![3]);
        assert_eq!(dashboard.scheduler.selected().map(|mr| mr.id), Some(3));

        dashboard.update(Action::ResetFilters)?;
        assert_eq!(dashboard.visible_ids().len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_without_issues_is_refused_locally() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;
        let (tx, _rx) = mpsc::unbounded_channel();
        dashboard.register_action_handler(tx)?;
        assert!(dashboard.scheduler.select(2));

        dashboard.update(Action::PostRecommendations)?;

        assert!(dashboard
            .status
            .as_deref()
            .is_some_and(|s| s.contains("no issues")));
        assert!(!fake.calls().iter().any(|c| c.starts_with("post_recommendations")));

        Ok(())
    }

    #[tokio::test]
    async fn test_reanalysis_reports_back() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        dashboard.register_action_handler(tx)?;

        dashboard.update(Action::RequestReanalysis)?;
        let action = rx.recv().await.expect("dispatch result");
        assert_eq!(
            action,
            Action::Dispatched(Dispatched {
                kind: DispatchKind::Reanalysis,
                mr_id: 1,
                result: Ok(())
            })
        );
        dashboard.update(action)?;

        assert!(fake.calls().contains(&"rerun_analysis 1".to_string()));
        assert!(dashboard
            .status
            .as_deref()
            .is_some_and(|s| s.starts_with("Analysis restarted")));

        Ok(())
    }

    #[tokio::test]
    async fn test_second_press_while_in_flight_is_ignored() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        dashboard.register_action_handler(tx)?;

        dashboard.update(Action::RequestReanalysis)?;
        dashboard.update(Action::RequestReanalysis)?;

        let action = rx.recv().await.expect("dispatch result");
        dashboard.update(action)?;
        assert!(rx.try_recv().is_err());

        let reruns = fake
            .calls()
            .iter()
            .filter(|c| c.starts_with("rerun_analysis"))
            .count();
        assert_eq!(reruns, 1);
        assert!(!dashboard.dispatcher.is_reanalyzing());

        dashboard.update(Action::RequestReanalysis)?;
        rx.recv().await.expect("dispatch result after release");
        assert_eq!(
            fake.calls()
                .iter()
                .filter(|c| c.starts_with("rerun_analysis"))
                .count(),
            2
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_names_endpoint() -> anyhow::Result<()> {
        let fake = FakeApi::default();
        let dashboard = mounted(&fake).await?;

        assert_eq!(dashboard.scheduler.state(), RefreshState::Failed);
        let (title, message) = dashboard.error_banner().expect("error banner");
        assert_eq!(title, "Refresh failed: /projects/");
        assert!(message.contains("connection refused"));

        Ok(())
    }

    #[tokio::test]
    async fn test_back_unmounts() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;

        dashboard.update(Action::Back)?;

        assert_eq!(dashboard.scheduler.state(), RefreshState::Idle);
        assert!(dashboard.visible().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_applies_new_review() -> anyhow::Result<()> {
        let fake = FakeApi::with_snapshot(1, testing::abc());
        let mut dashboard = mounted(&fake).await?;
        let mut updated = testing::abc();
        updated[2] = testing::reviewed(
            testing::mr(3, "2024-01-06"),
            testing::review(Recommendation::NeedsFixes, 1),
        );
        fake.state.lock().unwrap().merge_requests.clear();
        fake.push_merge_requests(Ok(updated));
        assert!(dashboard.scheduler.select(3));

        dashboard.update(Action::Refresh)?;
        let event = dashboard.refresh_events.recv().await.expect("refresh");
        dashboard.scheduler.handle(event);

        let selected = dashboard.scheduler.selected().expect("selection kept");
        assert_eq!(selected.id, 3);
        assert_eq!(selected.recommendation(), Some(Recommendation::NeedsFixes));
        assert_eq!(dashboard.visible_ids(), vec![3, 2, 1]);

        Ok(())
    }
}

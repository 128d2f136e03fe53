use mrlens_api::{errors::FetchError, models::Project, traits::ProjectSource, ApiProvider};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    action::Action,
    summary::{summarize_projects, ProjectsOverview},
};

use super::{step, Component};

pub struct Projects {
    api: ApiProvider,
    action_tx: Option<UnboundedSender<Action>>,
    projects: Option<Result<Vec<Project>, FetchError>>,
    overview: ProjectsOverview,
    table_state: TableState,
    loading: bool,
}

impl Projects {
    pub fn new(api: ApiProvider) -> Self {
        Self {
            api,
            action_tx: None,
            projects: None,
            overview: ProjectsOverview::default(),
            table_state: TableState::default(),
            loading: false,
        }
    }

    fn schedule_fetch(&mut self) {
        let Some(tx) = self.action_tx.clone() else {
            return;
        };
        let api = self.api.clone();
        self.loading = true;

        tokio::spawn(async move {
            let result = api.list_projects().await;
            if let Err(e) = &result {
                tracing::warn!("failed to list projects: {e}");
            }
            if tx.send(Action::ProjectsLoaded(result)).is_err() {
                tracing::debug!("projects receiver closed");
            }
        });
    }

    fn loaded(&self) -> &[Project] {
        match &self.projects {
            Some(Ok(projects)) => projects,
            _ => &[],
        }
    }

    fn selected(&self) -> Option<&Project> {
        self.table_state
            .selected()
            .and_then(|i| self.loaded().get(i))
    }
}

impl Component for Projects {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> anyhow::Result<()> {
        self.action_tx = Some(tx);

        Ok(())
    }

    fn init(&mut self) -> anyhow::Result<()> {
        self.schedule_fetch();

        Ok(())
    }

    fn update(&mut self, action: Action) -> anyhow::Result<Option<Action>> {
        match action {
            Action::ProjectsLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(projects) => {
                        tracing::info!(projects = projects.len(), "loaded projects");
                        self.overview = summarize_projects(&projects);
                        let selected = step(None, projects.len(), true);
                        self.table_state.select(
                            self.table_state
                                .selected()
                                .filter(|i| *i < projects.len())
                                .or(selected),
                        );
                        self.projects = Some(Ok(projects));
                    }
                    // Keep showing the last good list.
                    Err(e) if matches!(self.projects, Some(Ok(_))) => {
                        return Ok(Some(Action::Error(e.to_string())));
                    }
                    Err(e) => self.projects = Some(Err(e)),
                }
            }
            Action::Refresh => self.schedule_fetch(),
            Action::Up | Action::Down => {
                let next = step(
                    self.table_state.selected(),
                    self.loaded().len(),
                    action == Action::Down,
                );
                self.table_state.select(next);
            }
            Action::Open => {
                if let Some(project) = self.selected() {
                    return Ok(Some(Action::OpenProject(project.id)));
                }
            }
            _ => {}
        }

        Ok(None)
    }

    fn draw(&mut self, f: &mut crate::tui::Frame<'_>, area: Rect) -> anyhow::Result<()> {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let overview = format!(
            "{} projects · {} MRs · {} open · {} reviewed",
            self.overview.projects,
            self.overview.mrs,
            self.overview.open_mrs,
            self.overview.reviewed_mrs
        );
        f.render_widget(
            Paragraph::new(overview).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("GitLab projects"),
            ),
            layout[0],
        );

        match &self.projects {
            None => f.render_widget(Paragraph::new("loading projects..."), layout[1]),
            Some(Err(e)) => f.render_widget(
                Paragraph::new(format!("Error: {e}"))
                    .fg(Color::Red)
                    .wrap(Wrap { trim: true }),
                layout[1],
            ),
            Some(Ok(projects)) if projects.is_empty() => f.render_widget(
                Paragraph::new("No projects yet. Run `mrlens sync` to import them from GitLab."),
                layout[1],
            ),
            Some(Ok(projects)) => {
                let header = Row::new(["Project", "GitLab", "Description", "MRs", "Open", "Reviewed"])
                    .style(Style::default().add_modifier(Modifier::BOLD))
                    .bottom_margin(1);

                let rows = projects.iter().map(|p| {
                    Row::new([
                        Cell::from(p.path_with_namespace.clone()),
                        Cell::from(format!("#{}", p.gitlab_id)),
                        Cell::from(p.description_or_default().to_string()),
                        Cell::from(p.mrs_count.unwrap_or_default().to_string()),
                        Cell::from(p.open_mrs_count.unwrap_or_default().to_string()),
                        Cell::from(p.reviewed_mrs_count.unwrap_or_default().to_string()),
                    ])
                });

                let table = Table::new(
                    rows,
                    [
                        Constraint::Percentage(30),
                        Constraint::Length(8),
                        Constraint::Percentage(40),
                        Constraint::Length(5),
                        Constraint::Length(5),
                        Constraint::Length(9),
                    ],
                )
                .header(header)
                .column_spacing(2)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .block(Block::default().borders(Borders::ALL));

                f.render_stateful_widget(table, layout[1], &mut self.table_state);
            }
        }

        let help = if self.loading {
            "refreshing..."
        } else {
            "enter open · j/k move · r refresh · q quit"
        };
        f.render_widget(
            Paragraph::new(help).fg(Color::Black).bg(Color::White),
            layout[2],
        );

        Ok(())
    }
}

use mrlens_api::{models::ProjectId, ApiProvider};
use ratatui::prelude::Rect;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    action::Action,
    components::{dashboard::Dashboard, projects::Projects},
    config::Config,
    page::Page,
    tui,
};

const PROJECTS_PAGE: &str = "projects";
const DASHBOARD_PAGE: &str = "dashboard";

pub struct App {
    config: Config,
    tick_rate: f64,
    frame_rate: f64,
    should_quit: bool,
    pages: Vec<Page>,
    current_page: Option<String>,
    start_project: Option<ProjectId>,
}

impl App {
    pub fn new(tick_rate: f64, frame_rate: f64) -> Self {
        Self {
            tick_rate,
            frame_rate,
            config: Config::default(),
            should_quit: false,
            pages: Vec::new(),
            current_page: None,
            start_project: None,
        }
    }

    /// Opens the dashboard of `project_id` right away instead of the project list.
    pub fn start_with_project(mut self, project_id: Option<ProjectId>) -> Self {
        self.start_project = project_id;
        self
    }

    fn get_current_page(&mut self) -> Option<&mut Page> {
        let page = self.current_page.as_deref()?;
        self.pages.iter_mut().find(|p| p.name() == page)
    }

    pub fn register_pages(&mut self, api: ApiProvider) -> &mut Self {
        self.pages.push(Page::new(
            PROJECTS_PAGE,
            vec![Box::new(Projects::new(api.clone()))],
        ));
        self.pages.push(Page::new(
            DASHBOARD_PAGE,
            vec![Box::new(Dashboard::new(api))],
        ));

        self.current_page = Some(PROJECTS_PAGE.into());

        self
    }

    /// Switches pages for navigation actions. Returns whether the action
    /// should reach every page instead of just the current one.
    fn navigate(&mut self, action: &Action) -> bool {
        match action {
            Action::OpenProject(project_id) => {
                tracing::info!(project_id, "opening project dashboard");
                self.current_page = Some(DASHBOARD_PAGE.into());
            }
            Action::Back if self.current_page.as_deref() == Some(DASHBOARD_PAGE) => {
                self.current_page = Some(PROJECTS_PAGE.into());
            }
            Action::Back => return false,
            _ => {}
        }

        action.is_broadcast()
    }

    fn draw(&mut self, tui: &mut tui::Tui, action_tx: &UnboundedSender<Action>) -> anyhow::Result<()> {
        let mut draw_error = None;
        tui.draw(|f| {
            if let Some(page) = self.get_current_page() {
                if let Err(e) = page.draw(f) {
                    draw_error = Some(e);
                }
            }
        })?;

        if let Some(e) = draw_error {
            action_tx.send(Action::Error(format!("failed to draw {:?}", e)))?;
        }

        Ok(())
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();

        let mut tui = tui::Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate);
        tui.enter()?;

        for page in self.pages.iter_mut() {
            page.apply(|c| {
                c.register_action_handler(action_tx.clone())?;
                c.register_config_handler(self.config.clone())
            })?;
        }

        for page in self.pages.iter_mut() {
            page.apply(|c| c.init())?;
        }

        if let Some(project_id) = self.start_project.take() {
            action_tx.send(Action::OpenProject(project_id))?;
        }

        loop {
            if let Some(e) = tui.next().await {
                match e {
                    tui::Event::Key(key) => {
                        if let Some(action) = self.config.keybinds.action_for(key) {
                            tracing::debug!("got action: {action:?}");
                            action_tx.send(action.clone())?;
                        }
                    }
                    tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
                    tui::Event::Tick => action_tx.send(Action::Tick)?,
                    tui::Event::Render => action_tx.send(Action::Render)?,
                    tui::Event::Init | tui::Event::Error => {}
                }

                if let Some(page) = self.get_current_page() {
                    page.apply(|c| {
                        if let Some(action) = c.handle_events(Some(e.clone()))? {
                            action_tx.send(action)?;
                        }

                        Ok(())
                    })?;
                }
            }

            while let Ok(action) = action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    tracing::debug!("{action:?}");
                }

                match &action {
                    Action::Resize(x, y) => {
                        tui.resize(Rect::new(0, 0, *x, *y))?;
                        self.draw(&mut tui, &action_tx)?;
                    }
                    Action::Render => self.draw(&mut tui, &action_tx)?,
                    Action::Quit => self.should_quit = true,
                    Action::Error(e) => tracing::error!("{e}"),
                    _ => {}
                }

                let broadcast = self.navigate(&action);
                let forward = |page: &mut Page| {
                    page.apply(|c| {
                        if let Some(action) = c.update(action.clone())? {
                            action_tx.send(action)?;
                        }

                        Ok(())
                    })
                };

                if broadcast {
                    for page in self.pages.iter_mut() {
                        forward(page)?;
                    }
                } else if let Some(page) = self.get_current_page() {
                    forward(page)?;
                }
            }

            if self.should_quit {
                tui.stop()?;
                break;
            }
        }

        tui.exit()?;

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(4.0, 30.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeApi;

    #[tokio::test]
    async fn test_navigation_switches_pages() {
        let mut app = App::default();
        app.register_pages(FakeApi::default().provider());

        assert!(app.navigate(&Action::OpenProject(3)));
        assert_eq!(app.current_page.as_deref(), Some(DASHBOARD_PAGE));

        assert!(app.navigate(&Action::Back));
        assert_eq!(app.current_page.as_deref(), Some(PROJECTS_PAGE));

        assert!(!app.navigate(&Action::Back));
        assert!(!app.navigate(&Action::Refresh));
        assert_eq!(app.current_page.as_deref(), Some(PROJECTS_PAGE));
    }
}

use crate::{components::Component, tui::Frame};

pub struct Page {
    name: String,
    components: Vec<Box<dyn Component>>,
}

impl Page {
    pub fn new(name: impl Into<String>, components: Vec<Box<dyn Component>>) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(
        &mut self,
        mut apply_fn: impl FnMut(&mut Box<dyn Component>) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for c in self.components.iter_mut() {
            apply_fn(c)?;
        }

        Ok(())
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let area = frame.size();
        for c in self.components.iter_mut() {
            c.draw(frame, area)?;
        }

        Ok(())
    }
}

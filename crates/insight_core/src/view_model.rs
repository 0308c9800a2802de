use crate::Insight;

pub const PANEL_TITLE: &str = "AI Insights";

/// What the panel content area should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelBody {
    /// Nothing analyzed yet.
    #[default]
    Idle,
    Loading,
    Error(String),
    NoInsights,
    Insights(Vec<Insight>),
    Rendered(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView {
    pub visible: bool,
    pub title: String,
    pub expert_role: Option<String>,
    pub body: PanelBody,
    /// "Content has changed" affordance above the body.
    pub stale_notice: bool,
}

impl PanelView {
    /// Header line, e.g. `AI Insights by Analyst`.
    pub fn header(&self) -> String {
        match self.expert_role.as_deref() {
            Some(role) => format!("{} by {}", self.title, role),
            None => self.title.clone(),
        }
    }
}

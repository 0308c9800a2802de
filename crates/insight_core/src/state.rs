use crate::view_model::{PanelBody, PanelView, PANEL_TITLE};
use crate::{AnalysisResult, InsightPayload};

pub type RequestId = u64;

/// Where the current analysis cycle stands. Exactly one variant holds at a time,
/// so a loading widget can never also carry an error or a stale result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Loading {
        request_id: RequestId,
    },
    Ready(AnalysisResult),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WidgetState {
    phase: AnalysisPhase,
    panel_visible: bool,
    stale: bool,
    stale_notice: bool,
    content_available: bool,
    /// Sticks across cycles once the service has named one.
    expert_role: Option<String>,
    next_request_id: RequestId,
    torn_down: bool,
    dirty: bool,
}

impl WidgetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &AnalysisPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, AnalysisPhase::Loading { .. })
    }

    pub fn loading_request(&self) -> Option<RequestId> {
        match self.phase {
            AnalysisPhase::Loading { request_id } => Some(request_id),
            _ => None,
        }
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn content_available(&self) -> bool {
        self.content_available
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// True when a finished analysis with a payload is on display.
    pub fn has_insights(&self) -> bool {
        matches!(&self.phase, AnalysisPhase::Ready(result) if result.has_insights())
    }

    pub fn view(&self) -> PanelView {
        let body = match &self.phase {
            AnalysisPhase::Idle => PanelBody::Idle,
            AnalysisPhase::Loading { .. } => PanelBody::Loading,
            AnalysisPhase::Error(message) => PanelBody::Error(message.clone()),
            AnalysisPhase::Ready(result) => match &result.insights {
                None => PanelBody::NoInsights,
                Some(payload) if payload.is_empty() => PanelBody::NoInsights,
                Some(InsightPayload::List(items)) => PanelBody::Insights(items.clone()),
                Some(InsightPayload::Rendered(text)) => PanelBody::Rendered(text.clone()),
            },
        };

        PanelView {
            visible: self.panel_visible,
            title: PANEL_TITLE.to_string(),
            expert_role: self.expert_role.clone(),
            body,
            stale_notice: self.stale_notice,
        }
    }

    /// Returns whether anything visible changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_content_available(&mut self, available: bool) {
        self.content_available = available;
    }

    pub(crate) fn set_panel_visible(&mut self, visible: bool) {
        if self.panel_visible != visible {
            self.panel_visible = visible;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_stale(&mut self, stale: bool) {
        self.stale = stale;
    }

    pub(crate) fn set_stale_notice(&mut self, shown: bool) {
        if self.stale_notice != shown {
            self.stale_notice = shown;
            self.mark_dirty();
        }
    }

    /// Enters `Loading` with a fresh request id.
    pub(crate) fn begin_loading(&mut self) -> RequestId {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.phase = AnalysisPhase::Loading { request_id };
        self.mark_dirty();
        request_id
    }

    pub(crate) fn finish_ready(&mut self, result: AnalysisResult) {
        if let Some(role) = result.expert_role.as_ref() {
            self.expert_role = Some(role.clone());
        }
        self.phase = AnalysisPhase::Ready(result);
        self.mark_dirty();
    }

    pub(crate) fn finish_error(&mut self, message: String) {
        self.phase = AnalysisPhase::Error(message);
        self.mark_dirty();
    }

    pub(crate) fn return_to_idle(&mut self) {
        self.phase = AnalysisPhase::Idle;
        self.mark_dirty();
    }

    pub(crate) fn tear_down(&mut self) {
        self.torn_down = true;
        self.stale_notice = false;
        if self.is_loading() {
            self.phase = AnalysisPhase::Idle;
        }
        self.mark_dirty();
    }
}

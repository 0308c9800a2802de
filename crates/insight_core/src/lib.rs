//! Insight core: pure widget state machine, configuration and view-model helpers.
mod config;
mod effect;
mod insight;
mod msg;
mod state;
mod update;
mod view_model;

pub use config::{AnalysisMode, ConfigOverrides, Theme, WidgetConfig};
pub use effect::Effect;
pub use insight::{AnalysisResult, Impact, Insight, InsightPayload};
pub use msg::Msg;
pub use state::{AnalysisPhase, RequestId, WidgetState};
pub use update::update;
pub use view_model::{PanelBody, PanelView, PANEL_TITLE};

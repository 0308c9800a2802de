use crate::{AnalysisMode, Effect, Msg, WidgetState};

pub const CANCELLED_MESSAGE: &str = "Analysis cancelled";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WidgetState, msg: Msg) -> (WidgetState, Vec<Effect>) {
    if state.is_torn_down() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::Started { mode, node_count } => {
            state.set_content_available(node_count > 0);
            state.mark_dirty();
            if mode == AnalysisMode::Auto {
                request_analysis(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::ContentResolved { node_count } => {
            state.set_content_available(node_count > 0);
            Vec::new()
        }
        Msg::AnalyzeRequested => request_analysis(&mut state),
        Msg::PanelToggled(force) => {
            let visible = force.unwrap_or(!state.panel_visible());
            state.set_panel_visible(visible);
            let needs_analysis = !state.has_insights() || state.is_stale();
            if visible && needs_analysis && !state.is_loading() {
                request_analysis(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::ContentChanged => {
            state.set_stale(true);
            if state.panel_visible() && state.has_insights() {
                state.set_stale_notice(true);
            }
            Vec::new()
        }
        Msg::AnalysisCompleted { request_id, result } => {
            if state.loading_request() != Some(request_id) {
                return (state, Vec::new());
            }
            match result {
                Ok(result) => {
                    state.finish_ready(result);
                    if state.is_stale() && state.panel_visible() && state.has_insights() {
                        state.set_stale_notice(true);
                    }
                }
                Err(message) => state.finish_error(message),
            }
            Vec::new()
        }
        Msg::AnalysisSkipped { request_id } => {
            if state.loading_request() == Some(request_id) {
                state.return_to_idle();
            }
            Vec::new()
        }
        Msg::CancelRequested => match state.loading_request() {
            Some(request_id) => {
                state.finish_error(CANCELLED_MESSAGE.to_string());
                vec![Effect::CancelAnalysis { request_id }]
            }
            None => Vec::new(),
        },
        Msg::TornDown => {
            let pending = state.loading_request();
            state.tear_down();
            let mut effects = Vec::with_capacity(2);
            if let Some(request_id) = pending {
                effects.push(Effect::CancelAnalysis { request_id });
            }
            effects.push(Effect::StopObserving);
            effects
        }
    };

    (state, effects)
}

/// Starts a cycle unless one is already loading or there is nothing to analyze.
fn request_analysis(state: &mut WidgetState) -> Vec<Effect> {
    if state.is_loading() || !state.content_available() {
        return Vec::new();
    }

    state.set_stale(false);
    state.set_stale_notice(false);
    let request_id = state.begin_loading();
    vec![Effect::RunAnalysis { request_id }]
}

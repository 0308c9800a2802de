use crate::{AnalysisMode, AnalysisResult, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Initial content resolution finished.
    Started {
        mode: AnalysisMode,
        node_count: usize,
    },
    /// Content nodes were resolved again before an analysis cycle.
    ContentResolved { node_count: usize },
    /// User (or the stale notice button) asked for a fresh analysis.
    AnalyzeRequested,
    /// Toggle button or close button; `Some` forces the visibility.
    PanelToggled(Option<bool>),
    /// The change monitor reported a significant content delta.
    ContentChanged,
    /// The analysis call for `request_id` finished.
    AnalysisCompleted {
        request_id: RequestId,
        result: Result<AnalysisResult, String>,
    },
    /// The cycle for `request_id` found nothing to analyze.
    AnalysisSkipped { request_id: RequestId },
    /// Caller abandoned the in-flight analysis.
    CancelRequested,
    /// Widget instance is being torn down.
    TornDown,
}

use crate::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Re-resolve (when dynamic), extract and submit content for analysis.
    RunAnalysis { request_id: RequestId },
    CancelAnalysis { request_id: RequestId },
    StopObserving,
}

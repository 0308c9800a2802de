//! Insight engine: host-page model, content detection, change monitoring and
//! the analysis client.
mod analyze;
mod decode;
mod engine;
mod extract;
mod monitor;
mod page;
mod resolve;
mod types;

pub use analyze::{analyze_url, AnalysisSettings, Analyzer, ReqwestAnalyzer};
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use engine::EngineHandle;
pub use extract::{
    extract_content, ContentSnapshot, Extractor, FieldValue, FormSnapshot, PageContentExtractor,
};
pub use monitor::{
    is_significant, ChangeMonitor, ChangeReport, ChangeState, ABSOLUTE_THRESHOLD,
    RELATIVE_THRESHOLD,
};
pub use page::{
    MutationBatch, MutationKind, MutationRecord, ObserverId, Page, PageError, Subscription,
};
pub use resolve::{Resolution, ResolutionSource, SelectorResolver, FALLBACK_SELECTORS};
pub use types::{
    AnalysisError, AnalyzeResponse, EngineEvent, FailureKind, RequestId, WireImpact, WireInsight,
    WireInsights,
};

pub use ego_tree::NodeId;

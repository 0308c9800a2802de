use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::High => write!(f, "High"),
            Impact::Medium => write!(f, "Medium"),
            Impact::Low => write!(f, "Low"),
        }
    }
}

/// One analysis result item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub content: String,
    pub rationale: String,
    pub impact: Impact,
}

/// What the analysis service returned in its `insights` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightPayload {
    List(Vec<Insight>),
    /// Opaque pre-rendered text, shown as-is.
    Rendered(String),
}

impl InsightPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            InsightPayload::List(items) => items.is_empty(),
            InsightPayload::Rendered(text) => text.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    /// `None` when the service omitted the field.
    pub insights: Option<InsightPayload>,
    pub expert_role: Option<String>,
}

impl AnalysisResult {
    pub fn has_insights(&self) -> bool {
        self.insights.is_some()
    }
}

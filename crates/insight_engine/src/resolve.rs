use ego_tree::NodeId;
use widget_logging::{widget_debug, widget_warn};

use crate::page::Page;

/// Structural selectors tried in order when the configured selector matches nothing:
/// semantic containers, content classes, sections, SPA view markers, then forms.
pub const FALLBACK_SELECTORS: [&str; 11] = [
    "article",
    "main",
    "[role=\"main\"]",
    ".content",
    ".post-content",
    ".entry-content",
    "section:not(header):not(footer)",
    "[data-view]",
    "[data-page]",
    "[data-route]",
    "form",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Configured,
    Fallback(&'static str),
    Body,
    /// Nothing to analyze.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub nodes: Vec<NodeId>,
    pub source: ResolutionSource,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            source: ResolutionSource::Empty,
        }
    }
}

/// Finds the content nodes for a configured selector.
///
/// Matches of the configured selector are returned as-is; widget exclusion
/// happens during extraction, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorResolver {
    selector: String,
    smart_detection: bool,
}

impl SelectorResolver {
    pub fn new(selector: impl Into<String>, smart_detection: bool) -> Self {
        Self {
            selector: selector.into(),
            smart_detection,
        }
    }

    pub fn resolve(&self, page: &Page) -> Resolution {
        let configured = query(page, &self.selector);
        if !configured.is_empty() {
            widget_debug!(
                "Selector {:?} matched {} content nodes",
                self.selector,
                configured.len()
            );
            return Resolution {
                nodes: configured,
                source: ResolutionSource::Configured,
            };
        }

        if !self.smart_detection {
            widget_debug!("Selector {:?} matched nothing; smart detection off", self.selector);
            return Resolution::empty();
        }

        for selector in FALLBACK_SELECTORS {
            let nodes = query(page, selector);
            if !nodes.is_empty() {
                widget_debug!(
                    "Smart detection matched {} content nodes with {:?}",
                    nodes.len(),
                    selector
                );
                return Resolution {
                    nodes,
                    source: ResolutionSource::Fallback(selector),
                };
            }
        }

        match page.body() {
            Some(body) => {
                widget_debug!("Smart detection falling back to document body");
                Resolution {
                    nodes: vec![body],
                    source: ResolutionSource::Body,
                }
            }
            None => Resolution::empty(),
        }
    }
}

/// Runs one selector; an unparsable selector simply matches nothing.
fn query(page: &Page, selector: &str) -> Vec<NodeId> {
    if selector.trim().is_empty() {
        return Vec::new();
    }
    match page.select(selector) {
        Ok(nodes) => nodes,
        Err(err) => {
            widget_warn!("Ignoring content selector: {}", err);
            Vec::new()
        }
    }
}

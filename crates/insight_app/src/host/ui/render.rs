use std::io::Write;

use insight_core::{Insight, PanelBody, PanelView};
use widget_logging::widget_warn;

/// What a collapsed widget shows: just the toggle button.
pub const TOGGLE_LABEL: &str = "[AI]";

const LOADING_TEXT: &str = "Analyzing content...";
const EMPTY_TEXT: &str = "No insights available";
const STALE_NOTICE: [&str; 3] = [
    "Content has changed",
    "The page content has changed since the last analysis.",
    "[Analyze Again]",
];

/// Receives the panel view every time the widget state changed.
pub trait PanelRenderer {
    fn render(&mut self, view: &PanelView);
}

impl<F> PanelRenderer for F
where
    F: FnMut(&PanelView),
{
    fn render(&mut self, view: &PanelView) {
        self(view)
    }
}

/// Plain-text rendering of the panel, one entry per line.
pub fn render_lines(view: &PanelView) -> Vec<String> {
    if !view.visible {
        return vec![TOGGLE_LABEL.to_string()];
    }

    let mut lines = vec![view.header()];
    if view.stale_notice {
        lines.extend(STALE_NOTICE.iter().map(|line| line.to_string()));
    }

    match &view.body {
        PanelBody::Idle => {}
        PanelBody::Loading => lines.push(LOADING_TEXT.to_string()),
        PanelBody::Error(message) => lines.push(format!("Error: {message}")),
        PanelBody::NoInsights => lines.push(EMPTY_TEXT.to_string()),
        PanelBody::Insights(items) => {
            for (index, insight) in items.iter().enumerate() {
                if index > 0 {
                    lines.push(String::new());
                }
                push_insight(&mut lines, insight);
            }
        }
        PanelBody::Rendered(text) => lines.extend(text.lines().map(str::to_string)),
    }
    lines
}

fn push_insight(lines: &mut Vec<String>, insight: &Insight) {
    lines.push(format!("* {}", insight.content));
    lines.push(format!("  {}", insight.rationale));
    lines.push(format!("  Impact: {}", insight.impact));
}

/// Writes each frame to `out`, separated by a blank line.
pub struct TextPanelRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextPanelRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PanelRenderer for TextPanelRenderer<W> {
    fn render(&mut self, view: &PanelView) {
        let mut frame = render_lines(view).join("\n");
        frame.push_str("\n\n");
        if let Err(err) = self.out.write_all(frame.as_bytes()).and_then(|_| self.out.flush()) {
            widget_warn!("Could not write panel frame: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use insight_core::{Impact, PANEL_TITLE};
    use pretty_assertions::assert_eq;

    use super::*;

    fn visible(body: PanelBody) -> PanelView {
        PanelView {
            visible: true,
            title: PANEL_TITLE.to_string(),
            expert_role: None,
            body,
            stale_notice: false,
        }
    }

    #[test]
    fn hidden_panel_shows_only_toggle() {
        let view = PanelView {
            visible: false,
            ..visible(PanelBody::Loading)
        };
        assert_eq!(render_lines(&view), vec![TOGGLE_LABEL.to_string()]);
    }

    #[test]
    fn loading_and_error_bodies() {
        assert_eq!(
            render_lines(&visible(PanelBody::Loading)),
            vec!["AI Insights", "Analyzing content..."]
        );
        assert_eq!(
            render_lines(&visible(PanelBody::Error("API error: 500".to_string()))),
            vec!["AI Insights", "Error: API error: 500"]
        );
    }

    #[test]
    fn insights_list_impact_and_stale_notice_first() {
        let mut view = visible(PanelBody::Insights(vec![
            Insight {
                content: "Tighten the intro".to_string(),
                rationale: "Readers skim".to_string(),
                impact: Impact::High,
            },
            Insight {
                content: "Add alt text".to_string(),
                rationale: "Accessibility".to_string(),
                impact: Impact::Low,
            },
        ]));
        view.expert_role = Some("Editor".to_string());
        view.stale_notice = true;

        assert_eq!(
            render_lines(&view),
            vec![
                "AI Insights by Editor",
                "Content has changed",
                "The page content has changed since the last analysis.",
                "[Analyze Again]",
                "* Tighten the intro",
                "  Readers skim",
                "  Impact: High",
                "",
                "* Add alt text",
                "  Accessibility",
                "  Impact: Low",
            ]
        );
    }

    #[test]
    fn text_renderer_writes_frames() {
        let mut renderer = TextPanelRenderer::new(Vec::new());
        renderer.render(&visible(PanelBody::NoInsights));
        let written = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(written, "AI Insights\nNo insights available\n\n");
    }
}

//! Change monitor: decides whether page mutations amount to a significant
//! content change.
//!
//! The monitor observes a single subtree: the resolved node when exactly one
//! was resolved, the document body otherwise. Each delivered batch is filtered,
//! and if anything relevant survives, the text length of the tracked nodes is
//! compared with the last known length.

use ego_tree::NodeId;
use widget_logging::{widget_debug, widget_warn};

use crate::page::{MutationKind, MutationRecord, Page, PageError, Subscription};

/// A change of more than this many characters is always significant.
pub const ABSOLUTE_THRESHOLD: usize = 20;
/// A change of more than this fraction of the previous length is significant.
pub const RELATIVE_THRESHOLD: f64 = 0.05;

/// `true` iff the length moved by more than 20 characters or more than 5%.
/// From an empty baseline any growth counts.
pub fn is_significant(previous: usize, current: usize) -> bool {
    let delta = previous.abs_diff(current);
    if delta > ABSOLUTE_THRESHOLD {
        return true;
    }
    if previous == 0 {
        return delta > 0;
    }
    delta as f64 / previous as f64 > RELATIVE_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeState {
    pub last_known_length: usize,
    /// Set by a significant change, cleared when an analysis cycle begins.
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeReport {
    pub previous_length: usize,
    pub current_length: usize,
}

#[derive(Debug)]
pub struct ChangeMonitor {
    subscription: Subscription,
    nodes: Vec<NodeId>,
    exclude: Option<NodeId>,
    state: ChangeState,
}

impl ChangeMonitor {
    pub fn start(page: &mut Page, nodes: &[NodeId], exclude: Option<NodeId>) -> Self {
        let target = match nodes {
            [single] => *single,
            _ => page.body().unwrap_or_else(|| page.root()),
        };
        let baseline = match page.text_len_excluding(nodes, exclude) {
            Ok(len) => len,
            Err(err) => {
                widget_warn!("Could not measure initial content: {}", err);
                0
            }
        };
        let subscription = page.observe(target);
        widget_debug!(
            "Observing {:?} for {} content nodes, baseline {} chars",
            target,
            nodes.len(),
            baseline
        );

        Self {
            subscription,
            nodes: nodes.to_vec(),
            exclude,
            state: ChangeState {
                last_known_length: baseline,
                dirty: false,
            },
        }
    }

    pub fn observed_target(&self) -> NodeId {
        self.subscription.target()
    }

    pub fn change_state(&self) -> ChangeState {
        self.state
    }

    /// Replaces the node set used for length comparison.
    pub fn track(&mut self, nodes: &[NodeId]) {
        self.nodes = nodes.to_vec();
    }

    pub fn begin_cycle(&mut self) {
        self.state.dirty = false;
    }

    /// Processes every delivered batch, calling `on_significant` once per
    /// significant batch. Returns how many batches were significant.
    pub fn poll<F>(&mut self, page: &Page, mut on_significant: F) -> usize
    where
        F: FnMut(ChangeReport),
    {
        let mut significant = 0;
        while let Some(batch) = self.subscription.try_next() {
            if let Some(report) = self.process_batch(page, &batch) {
                significant += 1;
                on_significant(report);
            }
        }
        significant
    }

    /// Handles one batch as a unit. Never fails: a measurement error counts as
    /// "no change".
    pub fn process_batch(&mut self, page: &Page, batch: &[MutationRecord]) -> Option<ChangeReport> {
        if !batch.iter().any(|record| self.is_relevant(page, record)) {
            widget_debug!("Ignoring batch of {} irrelevant mutations", batch.len());
            return None;
        }

        let current = match self.measure(page) {
            Ok(len) => len,
            Err(err) => {
                widget_warn!("Content measurement failed, treating as unchanged: {}", err);
                return None;
            }
        };
        let previous = self.state.last_known_length;
        if !is_significant(previous, current) {
            widget_debug!("Content length {} -> {}: not significant", previous, current);
            return None;
        }

        self.state.last_known_length = current;
        self.state.dirty = true;
        widget_debug!("Content length {} -> {}: significant", previous, current);
        Some(ChangeReport {
            previous_length: previous,
            current_length: current,
        })
    }

    pub fn stop(self, page: &mut Page) {
        page.disconnect(self.subscription.id());
    }

    fn measure(&self, page: &Page) -> Result<usize, PageError> {
        page.text_len_excluding(&self.nodes, self.exclude)
    }

    fn is_relevant(&self, page: &Page, record: &MutationRecord) -> bool {
        if is_script_or_style(page, record.target) {
            return false;
        }
        if let Some(widget) = self.exclude {
            if page.contains(widget, record.target) {
                return false;
            }
        }
        match &record.kind {
            MutationKind::ChildList { added, .. } => added.iter().any(|id| {
                page.text(*id)
                    .map(|text| !text.trim().is_empty())
                    .unwrap_or(false)
            }),
            MutationKind::CharacterData => page
                .text(record.target)
                .map(|text| !text.is_empty())
                .unwrap_or(false),
        }
    }
}

/// The target itself, or the element owning a text target, is `<script>`/`<style>`.
fn is_script_or_style(page: &Page, target: NodeId) -> bool {
    let element = if page.is_text(target) {
        page.parent(target)
    } else {
        Some(target)
    };
    element
        .and_then(|id| page.tag_name(id))
        .is_some_and(|name| name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_changes_are_not_significant() {
        assert!(!is_significant(1000, 1020));
        assert!(!is_significant(1000, 980));
        assert!(!is_significant(400, 420));
        assert!(!is_significant(0, 0));
    }

    #[test]
    fn absolute_threshold_is_strict() {
        assert!(!is_significant(10_000, 10_020));
        assert!(is_significant(10_000, 10_021));
    }

    #[test]
    fn relative_threshold_is_strict() {
        assert!(!is_significant(100, 105));
        assert!(is_significant(100, 106));
        assert!(is_significant(100, 94));
    }

    #[test]
    fn any_growth_from_empty_is_significant() {
        assert!(is_significant(0, 1));
        assert!(is_significant(0, 500));
    }

    fn page_with_block(len: usize) -> (Page, NodeId) {
        let markup = format!(
            "<body><main><p>{}</p></main><aside>side</aside></body>",
            "x".repeat(len)
        );
        let page = Page::parse(&markup);
        let main = page.select("main").unwrap()[0];
        (page, main)
    }

    #[test]
    fn single_node_is_observed_directly_and_multiple_collapse_to_body() {
        let (mut page, main) = page_with_block(10);
        let aside = page.select("aside").unwrap()[0];

        let monitor = ChangeMonitor::start(&mut page, &[main], None);
        assert_eq!(monitor.observed_target(), main);
        assert_eq!(monitor.change_state().last_known_length, 10);

        let monitor = ChangeMonitor::start(&mut page, &[main, aside], None);
        assert_eq!(monitor.observed_target(), page.body().unwrap());
        assert_eq!(monitor.change_state().last_known_length, 14);

        let monitor = ChangeMonitor::start(&mut page, &[], None);
        assert_eq!(monitor.observed_target(), page.body().unwrap());
    }

    #[test]
    fn one_callback_per_significant_batch() {
        let (mut page, main) = page_with_block(100);
        let mut monitor = ChangeMonitor::start(&mut page, &[main], None);

        page.append_html(main, "<p>New paragraph of 25 characters!!</p>").unwrap();
        page.append_html(main, "<p>and another long paragraph here</p>").unwrap();
        page.flush_mutations();

        let mut reports = Vec::new();
        let count = monitor.poll(&page, |report| reports.push(report));
        assert_eq!(count, 1);
        assert_eq!(reports[0].previous_length, 100);
        assert_eq!(monitor.change_state().last_known_length, reports[0].current_length);
        assert!(monitor.change_state().dirty);

        monitor.begin_cycle();
        assert!(!monitor.change_state().dirty);
    }

    #[test]
    fn empty_text_insertions_are_ignored() {
        let (mut page, main) = page_with_block(0);
        let mut monitor = ChangeMonitor::start(&mut page, &[main], None);

        page.append_html(main, "<div>   </div><img src=x.png>").unwrap();
        page.flush_mutations();
        assert_eq!(monitor.poll(&page, |_| {}), 0);
        assert!(!monitor.change_state().dirty);
    }

    #[test]
    fn script_style_and_widget_targets_are_ignored() {
        let markup = "<body><main><script></script><style></style>\
                      <div class=ai-insight-widget></div></main></body>";
        let mut page = Page::parse(markup);
        let main = page.select("main").unwrap()[0];
        let script = page.select("script").unwrap()[0];
        let style = page.select("style").unwrap()[0];
        let widget = page.select(".ai-insight-widget").unwrap()[0];
        let mut monitor = ChangeMonitor::start(&mut page, &[main], Some(widget));

        let long = "y".repeat(200);
        page.append_text(script, &long).unwrap();
        page.append_text(style, &long).unwrap();
        page.append_html(widget, &format!("<p>{long}</p>")).unwrap();
        page.flush_mutations();

        assert_eq!(monitor.poll(&page, |_| {}), 0);
    }

    #[test]
    fn widget_text_is_left_out_of_the_measured_length() {
        let markup = format!(
            "<body><main><p>{}</p></main><div class=ai-insight-widget>panel</div></body>",
            "x".repeat(100)
        );
        let mut page = Page::parse(&markup);
        let body = page.body().unwrap();
        let main = page.select("main").unwrap()[0];
        let widget = page.select(".ai-insight-widget").unwrap()[0];
        let mut monitor = ChangeMonitor::start(&mut page, &[body], Some(widget));
        assert_eq!(monitor.change_state().last_known_length, 100);

        page.append_html(widget, &format!("<p>{}</p>", "w".repeat(300))).unwrap();
        page.append_text(main, "yy").unwrap();
        page.flush_mutations();

        assert_eq!(monitor.poll(&page, |_| {}), 0);
        assert!(!monitor.change_state().dirty);
    }

    #[test]
    fn character_data_change_is_measured() {
        let (mut page, main) = page_with_block(0);
        let text = page.append_text(main, "short").unwrap();
        let mut monitor = ChangeMonitor::start(&mut page, &[main], None);
        assert_eq!(monitor.change_state().last_known_length, 5);

        page.set_text(text, "short").unwrap();
        page.flush_mutations();
        assert_eq!(monitor.poll(&page, |_| {}), 0, "same length is no change");

        page.set_text(text, &"z".repeat(40)).unwrap();
        page.flush_mutations();
        assert_eq!(monitor.poll(&page, |_| {}), 1);
        assert_eq!(monitor.change_state().last_known_length, 40);
    }

    #[test]
    fn removals_alone_do_not_trigger() {
        let (mut page, main) = page_with_block(100);
        let paragraph = page.select("p").unwrap()[0];
        let mut monitor = ChangeMonitor::start(&mut page, &[main], None);

        page.remove(paragraph).unwrap();
        page.flush_mutations();
        assert_eq!(monitor.poll(&page, |_| {}), 0);
    }

    #[test]
    fn measurement_failure_counts_as_no_change() {
        let (mut page, main) = page_with_block(10);
        let mut monitor = ChangeMonitor::start(&mut page, &[main], None);
        let other = Page::parse(&format!("<body>{}</body>", "<b>x</b>".repeat(50)));
        let foreign = other.select("b").unwrap()[49];
        monitor.track(&[foreign]);

        page.append_text(main, &"n".repeat(50)).unwrap();
        page.flush_mutations();
        assert_eq!(monitor.poll(&page, |_| {}), 0);
        assert_eq!(monitor.change_state().last_known_length, 10);
    }

    #[test]
    fn stop_releases_subscription() {
        let (mut page, main) = page_with_block(10);
        let monitor = ChangeMonitor::start(&mut page, &[main], None);
        assert_eq!(page.observer_count(), 1);
        monitor.stop(&mut page);
        assert_eq!(page.observer_count(), 0);
    }
}

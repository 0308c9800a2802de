use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use insight_core::{update, Msg, PanelView, WidgetConfig, WidgetState};
use insight_engine::{
    AnalysisSettings, Analyzer, ChangeMonitor, EngineHandle, Page, ResolutionSource,
};
use widget_logging::{widget_debug, widget_info, widget_warn};

use super::config_source::mount_widget;
use super::effects::{EffectRunner, Surface};
use super::ui::render::{render_lines, PanelRenderer};

const SETTLE_POLL: Duration = Duration::from_millis(50);

/// One widget instance on one page.
///
/// Single-threaded: every state change goes through the message inbox and is
/// applied by [`WidgetController::pump`]. Analysis calls run on the engine's
/// background runtime and come back as messages.
pub struct WidgetController {
    config: WidgetConfig,
    state: WidgetState,
    surface: Surface,
    runner: EffectRunner,
    renderer: Option<Box<dyn PanelRenderer>>,
    msg_tx: mpsc::Sender<Msg>,
    msg_rx: mpsc::Receiver<Msg>,
    /// Set once [`WidgetController::initialize`] ran.
    source: Option<ResolutionSource>,
}

impl WidgetController {
    pub fn new(page: Page, config: WidgetConfig, settings: AnalysisSettings) -> Self {
        let engine = EngineHandle::new(settings);
        Self::with_engine(page, config, engine)
    }

    pub fn with_analyzer(
        page: Page,
        config: WidgetConfig,
        analyzer: Arc<dyn Analyzer>,
        settings: AnalysisSettings,
    ) -> Self {
        let engine = EngineHandle::with_analyzer(analyzer, settings);
        Self::with_engine(page, config, engine)
    }

    fn with_engine(page: Page, config: WidgetConfig, engine: EngineHandle) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(engine, &config);
        Self {
            config,
            state: WidgetState::new(),
            surface: Surface {
                page,
                widget: None,
                nodes: Vec::new(),
                monitor: None,
            },
            runner,
            renderer: None,
            msg_tx,
            msg_rx,
            source: None,
        }
    }

    pub fn set_renderer(&mut self, renderer: impl PanelRenderer + 'static) {
        self.renderer = Some(Box::new(renderer));
    }

    /// Mounts the widget, resolves content, starts monitoring and, in auto
    /// mode, the first analysis. Calling it again does nothing.
    pub fn initialize(&mut self) -> ResolutionSource {
        if let Some(source) = self.source {
            widget_debug!("Widget already initialized");
            return source;
        }

        match mount_widget(&mut self.surface.page, &self.config) {
            Ok(widget) => self.surface.widget = Some(widget),
            Err(err) => widget_warn!("Could not mount widget container: {}", err),
        }

        let resolution = self.runner.resolver().resolve(&self.surface.page);
        widget_info!(
            "Insight widget started: {} content nodes ({:?}), mode {}",
            resolution.nodes.len(),
            resolution.source,
            self.config.mode()
        );
        self.surface.nodes = resolution.nodes;
        self.source = Some(resolution.source);

        if self.config.dynamic_content_support() {
            self.surface.monitor = Some(ChangeMonitor::start(
                &mut self.surface.page,
                &self.surface.nodes,
                self.surface.widget,
            ));
        }

        self.send(Msg::Started {
            mode: self.config.mode(),
            node_count: self.surface.nodes.len(),
        });
        self.pump();
        resolution.source
    }

    pub fn request_analysis(&mut self) {
        self.refresh_content();
        self.send(Msg::AnalyzeRequested);
        self.pump();
    }

    /// Flips the panel, or forces it open/closed with `Some`.
    pub fn toggle_panel(&mut self, force: Option<bool>) {
        self.refresh_content();
        self.send(Msg::PanelToggled(force));
        self.pump();
    }

    /// Abandons the in-flight analysis, if any.
    pub fn cancel_analysis(&mut self) {
        self.send(Msg::CancelRequested);
        self.pump();
    }

    /// Host-page access for scripted edits. Changes are picked up by the next
    /// [`pump`](Self::pump).
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.surface.page
    }

    pub fn page(&self) -> &Page {
        &self.surface.page
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn view(&self) -> PanelView {
        self.state.view()
    }

    /// Delivers page mutations to the monitor, collects engine results and
    /// dispatches every queued message. Returns the number of messages handled.
    pub fn pump(&mut self) -> usize {
        if self.state.is_torn_down() {
            return 0;
        }

        self.surface.page.flush_mutations();
        if let Some(monitor) = self.surface.monitor.as_mut() {
            let msg_tx = &self.msg_tx;
            monitor.poll(&self.surface.page, |report| {
                widget_info!(
                    "Significant content change: {} -> {} chars",
                    report.previous_length,
                    report.current_length
                );
                let _ = msg_tx.send(Msg::ContentChanged);
            });
        }
        self.runner.drain_events(&self.msg_tx);
        self.process_pending_messages()
    }

    /// Pumps until no analysis is loading or `timeout` passes. Returns `true`
    /// when the widget settled.
    pub fn pump_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if !self.state.is_loading() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                widget_warn!("Widget did not settle within {:?}", timeout);
                return false;
            }
            self.runner
                .wait_event((deadline - now).min(SETTLE_POLL), &self.msg_tx);
        }
    }

    /// Stops observation, cancels any pending analysis and shuts the engine
    /// down. Later calls and messages are ignored.
    pub fn teardown(&mut self) {
        if self.state.is_torn_down() {
            return;
        }
        widget_info!("Tearing down insight widget");
        self.dispatch_msg(Msg::TornDown);
        self.runner.shutdown();
        while self.msg_rx.try_recv().is_ok() {}
    }

    /// Queues a fresh `ContentResolved` ahead of a user request. Does nothing
    /// before initialization or without dynamic content support.
    fn refresh_content(&mut self) {
        if self.source.is_none() || self.state.is_torn_down() {
            return;
        }
        self.runner.refresh_content(&mut self.surface, &self.msg_tx);
    }

    fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }

    fn process_pending_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch_msg(msg);
            handled += 1;
        }
        handled
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;

        self.runner.run(effects, &mut self.surface, &self.msg_tx);
        if was_dirty {
            self.render();
        }
    }

    fn render(&mut self) {
        let view = self.state.view();
        if let Some(widget) = self.surface.widget {
            let text = render_lines(&view).join("\n");
            if let Err(err) = self.surface.page.set_text_content(widget, &text) {
                widget_warn!("Could not update widget container: {}", err);
            }
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&view);
        }
    }
}

impl Drop for WidgetController {
    fn drop(&mut self) {
        self.teardown();
    }
}

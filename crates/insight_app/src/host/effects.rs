use std::sync::mpsc;
use std::time::Duration;

use insight_core::{
    AnalysisResult, Effect, Impact, Insight, InsightPayload, Msg, RequestId, WidgetConfig,
};
use insight_engine::{
    AnalyzeResponse, ChangeMonitor, EngineEvent, EngineHandle, Extractor, NodeId, Page,
    PageContentExtractor, SelectorResolver, WireImpact, WireInsights,
};
use widget_logging::{widget_debug, widget_info, widget_warn};

/// Everything an analysis cycle reads from or writes to on the host page.
pub(crate) struct Surface {
    pub page: Page,
    /// The mounted widget container, excluded from extraction and monitoring.
    pub widget: Option<NodeId>,
    pub nodes: Vec<NodeId>,
    pub monitor: Option<ChangeMonitor>,
}

pub(crate) struct EffectRunner {
    engine: Option<EngineHandle>,
    endpoint: String,
    resolver: SelectorResolver,
    dynamic: bool,
    extractor: Box<dyn Extractor>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, config: &WidgetConfig) -> Self {
        Self {
            engine: Some(engine),
            endpoint: config.endpoint().to_string(),
            resolver: SelectorResolver::new(config.selector(), config.smart_content_detection()),
            dynamic: config.dynamic_content_support(),
            extractor: Box::new(PageContentExtractor),
        }
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    pub fn run(&self, effects: Vec<Effect>, surface: &mut Surface, msg_tx: &mpsc::Sender<Msg>) {
        for effect in effects {
            match effect {
                Effect::RunAnalysis { request_id } => {
                    self.run_analysis(request_id, surface, msg_tx);
                }
                Effect::CancelAnalysis { request_id } => {
                    widget_info!("Cancelling analysis request {}", request_id);
                    if let Some(engine) = &self.engine {
                        engine.cancel(request_id);
                    }
                }
                Effect::StopObserving => {
                    if let Some(monitor) = surface.monitor.take() {
                        widget_debug!("Stopping change monitor");
                        monitor.stop(&mut surface.page);
                    }
                }
            }
        }
    }

    /// Re-resolves the content nodes when dynamic content support is on, so
    /// content that appeared or was replaced since the last resolution counts.
    pub fn refresh_content(&self, surface: &mut Surface, msg_tx: &mpsc::Sender<Msg>) {
        if !self.dynamic {
            return;
        }
        let resolution = self.resolver.resolve(&surface.page);
        widget_debug!(
            "Re-resolved {} content nodes via {:?}",
            resolution.nodes.len(),
            resolution.source
        );
        surface.nodes = resolution.nodes;
        if let Some(monitor) = surface.monitor.as_mut() {
            monitor.track(&surface.nodes);
        }
        let _ = msg_tx.send(Msg::ContentResolved {
            node_count: surface.nodes.len(),
        });
    }

    fn run_analysis(
        &self,
        request_id: RequestId,
        surface: &mut Surface,
        msg_tx: &mpsc::Sender<Msg>,
    ) {
        if let Some(monitor) = surface.monitor.as_mut() {
            monitor.begin_cycle();
        }

        self.refresh_content(surface, msg_tx);

        let snapshot = self
            .extractor
            .extract(&surface.page, &surface.nodes, surface.widget);
        let content = snapshot.render();
        if content.trim().is_empty() {
            widget_debug!("Request {}: nothing to analyze", request_id);
            let _ = msg_tx.send(Msg::AnalysisSkipped { request_id });
            return;
        }

        match &self.engine {
            Some(engine) => engine.analyze(request_id, self.endpoint.as_str(), content),
            None => {
                widget_warn!("Request {} dropped: analysis engine is shut down", request_id);
                let _ = msg_tx.send(Msg::AnalysisSkipped { request_id });
            }
        }
    }

    /// Forwards every engine event that is already available.
    pub fn drain_events(&self, msg_tx: &mpsc::Sender<Msg>) -> usize {
        let Some(engine) = &self.engine else {
            return 0;
        };
        let mut forwarded = 0;
        while let Some(event) = engine.try_recv() {
            let _ = msg_tx.send(map_event(event));
            forwarded += 1;
        }
        forwarded
    }

    /// Blocks up to `timeout` for one engine event.
    pub fn wait_event(&self, timeout: Duration, msg_tx: &mpsc::Sender<Msg>) -> bool {
        let Some(event) = self.engine.as_ref().and_then(|engine| engine.recv_timeout(timeout))
        else {
            return false;
        };
        let _ = msg_tx.send(map_event(event));
        true
    }

    /// Drops the engine; its runtime cancels whatever is still in flight.
    pub fn shutdown(&mut self) {
        if self.engine.take().is_some() {
            widget_debug!("Analysis engine shut down");
        }
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::AnalysisCompleted { request_id, result } => Msg::AnalysisCompleted {
            request_id,
            result: result.map(map_response).map_err(|err| {
                widget_warn!("Analysis request {} failed ({}): {}", request_id, err.kind, err);
                err.message
            }),
        },
    }
}

fn map_response(response: AnalyzeResponse) -> AnalysisResult {
    let insights = response.insights.map(|insights| match insights {
        WireInsights::List(items) => InsightPayload::List(
            items
                .into_iter()
                .map(|item| Insight {
                    content: item.content,
                    rationale: item.rationale,
                    impact: map_impact(item.impact),
                })
                .collect(),
        ),
        WireInsights::Rendered(text) => InsightPayload::Rendered(text),
    });
    AnalysisResult {
        insights,
        expert_role: response.expert_role,
    }
}

fn map_impact(impact: WireImpact) -> Impact {
    match impact {
        WireImpact::High => Impact::High,
        WireImpact::Medium => Impact::Medium,
        WireImpact::Low => Impact::Low,
    }
}

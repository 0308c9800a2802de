use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use widget_logging::{widget_debug, widget_error, widget_info};

use crate::analyze::{AnalysisSettings, Analyzer, ReqwestAnalyzer};
use crate::{AnalysisError, EngineEvent, FailureKind, RequestId};

enum EngineCommand {
    Analyze {
        request_id: RequestId,
        endpoint: String,
        content: String,
    },
    Cancel {
        request_id: RequestId,
    },
}

type PendingTokens = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Runs analysis calls on a background tokio runtime.
///
/// Every submitted request yields exactly one `AnalysisCompleted` event, unless
/// it is cancelled first. Dropping the handle stops the runtime and aborts
/// whatever is still in flight.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: AnalysisSettings) -> Self {
        let analyzer = Arc::new(ReqwestAnalyzer::new(settings.clone()));
        Self::with_analyzer(analyzer, settings)
    }

    pub fn with_analyzer(analyzer: Arc<dyn Analyzer>, settings: AnalysisSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let deadline = settings.deadline;

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    widget_error!("Analysis runtime unavailable: {}", err);
                    reject_all(cmd_rx, event_tx, err.to_string());
                    return;
                }
            };
            let pending: PendingTokens = Arc::new(Mutex::new(HashMap::new()));

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Analyze {
                        request_id,
                        endpoint,
                        content,
                    } => {
                        let token = CancellationToken::new();
                        if let Ok(mut tokens) = pending.lock() {
                            tokens.insert(request_id, token.clone());
                        }
                        runtime.spawn(run_analysis(
                            analyzer.clone(),
                            deadline,
                            AnalysisJob {
                                request_id,
                                endpoint,
                                content,
                            },
                            token,
                            event_tx.clone(),
                            pending.clone(),
                        ));
                    }
                    EngineCommand::Cancel { request_id } => {
                        let token = pending
                            .lock()
                            .ok()
                            .and_then(|mut tokens| tokens.remove(&request_id));
                        if let Some(token) = token {
                            widget_debug!("Cancelling analysis request {}", request_id);
                            token.cancel();
                        }
                    }
                }
            }

            if let Ok(mut tokens) = pending.lock() {
                for (_, token) in tokens.drain() {
                    token.cancel();
                }
            };
        });

        Self { cmd_tx, event_rx }
    }

    pub fn analyze(&self, request_id: RequestId, endpoint: impl Into<String>, content: String) {
        let _ = self.cmd_tx.send(EngineCommand::Analyze {
            request_id,
            endpoint: endpoint.into(),
            content,
        });
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct AnalysisJob {
    request_id: RequestId,
    endpoint: String,
    content: String,
}

async fn run_analysis(
    analyzer: Arc<dyn Analyzer>,
    deadline: Duration,
    job: AnalysisJob,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
    pending: PendingTokens,
) {
    let request_id = job.request_id;
    widget_info!(
        "Submitting analysis request {} ({} chars)",
        request_id,
        job.content.chars().count()
    );

    let task = tokio::spawn(async move {
        tokio::time::timeout(deadline, analyzer.analyze(&job.endpoint, &job.content)).await
    });
    let abort = task.abort_handle();
    let outcome = token.run_until_cancelled(task).await;

    if let Ok(mut tokens) = pending.lock() {
        tokens.remove(&request_id);
    }

    let result = match outcome {
        None => {
            abort.abort();
            widget_debug!("Analysis request {} cancelled", request_id);
            return;
        }
        Some(Ok(Ok(result))) => result,
        Some(Ok(Err(_elapsed))) => Err(AnalysisError::new(
            FailureKind::Timeout,
            format!("analysis timed out after {}s", deadline.as_secs_f32()),
        )),
        Some(Err(join_err)) => Err(AnalysisError::new(
            FailureKind::Internal,
            format!("analysis task failed: {join_err}"),
        )),
    };

    match &result {
        Ok(_) => widget_info!("Analysis request {} completed", request_id),
        Err(err) => widget_info!("Analysis request {} failed: {}", request_id, err.kind),
    }
    let _ = event_tx.send(EngineEvent::AnalysisCompleted { request_id, result });
}

/// Answers every analyze command with a failure when no runtime could be built.
fn reject_all(
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    reason: String,
) {
    while let Ok(command) = cmd_rx.recv() {
        if let EngineCommand::Analyze { request_id, .. } = command {
            let _ = event_tx.send(EngineEvent::AnalysisCompleted {
                request_id,
                result: Err(AnalysisError::new(FailureKind::Internal, reason.clone())),
            });
        }
    }
}

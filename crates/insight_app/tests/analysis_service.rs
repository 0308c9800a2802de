use std::time::Duration;

use insight_app::{load_config, render_lines, WidgetController};
use insight_core::{AnalysisMode, ConfigOverrides};
use insight_engine::{AnalysisSettings, Page};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTLE: Duration = Duration::from_secs(10);

/// The controller is single-threaded and not `Send`, so it lives entirely on a
/// blocking thread while the mock server runs on the test runtime.
async fn run_widget<F>(endpoint: String, markup: &'static str, drive: F) -> Vec<String>
where
    F: FnOnce(&mut WidgetController) + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        widget_logging::initialize_for_tests();
        let page = Page::parse(markup);
        let host = ConfigOverrides {
            endpoint: Some(endpoint),
            ..ConfigOverrides::default()
        };
        let config = load_config(&page, host);
        let mut controller = WidgetController::new(page, config, AnalysisSettings::default());
        drive(&mut controller);
        let lines = render_lines(&controller.view());
        controller.teardown();
        lines
    })
    .await
    .expect("widget thread")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn double_request_reaches_service_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_json(serde_json::json!({ "content": "Release notes" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(serde_json::json!({
                    "insights": [
                        { "content": "Add dates", "rationale": "Readers need context", "impact": "Medium" }
                    ],
                    "expert_role": "Technical Writer"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let markup = r#"<html><head><script src="w.js" data-api="http://unused.invalid" data-mode="manual"></script></head>
        <body><article>Release notes</article></body></html>"#;
    let lines = run_widget(server.uri(), markup, |controller| {
        controller.initialize();
        assert_eq!(controller.config().mode(), AnalysisMode::Manual);
        controller.toggle_panel(Some(true));
        controller.request_analysis();
        assert!(controller.pump_until_settled(SETTLE));
    })
    .await;

    assert_eq!(
        lines,
        vec![
            "AI Insights by Technical Writer",
            "* Add dates",
            "  Readers need context",
            "  Impact: Medium",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn service_error_status_is_shown_in_panel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let lines = run_widget(
        format!("{}/", server.uri()),
        "<body><main>Hello world</main></body>",
        |controller| {
            controller.initialize();
            controller.toggle_panel(Some(true));
            assert!(controller.pump_until_settled(SETTLE));
        },
    )
    .await;

    assert_eq!(lines, vec!["AI Insights", "Error: API error: 404"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_reply_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&server)
        .await;

    let lines = run_widget(
        server.uri(),
        "<body><main>Hello world</main></body>",
        |controller| {
            controller.initialize();
            controller.toggle_panel(Some(true));
            assert!(controller.pump_until_settled(SETTLE));
        },
    )
    .await;

    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("Error: malformed analysis response"));
}

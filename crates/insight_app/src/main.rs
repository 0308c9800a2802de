use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use insight_app::{load_config, load_page, render_lines, TextPanelRenderer, WidgetController};
use insight_core::{AnalysisMode, ConfigOverrides, Theme};
use insight_engine::AnalysisSettings;
use log::LevelFilter;
use widget_logging::{widget_info, LogDestination};

/// Runs the insight widget against a saved HTML page.
#[derive(Parser)]
#[command(name = "insight-widget")]
#[command(about = "Analyze a page's main content with a remote insight service")]
#[command(version)]
struct Cli {
    /// HTML file to load
    page: PathBuf,

    /// Analysis service base URL (overrides the page's script tag)
    #[arg(long, env = "INSIGHT_WIDGET_ENDPOINT")]
    endpoint: Option<String>,

    /// CSS selector for the content to analyze
    #[arg(long)]
    selector: Option<String>,

    /// auto analyzes at startup, manual waits for the panel
    #[arg(long, value_parser = parse_mode)]
    mode: Option<AnalysisMode>,

    #[arg(long, value_parser = parse_theme)]
    theme: Option<Theme>,

    /// Do not fall back to structural selectors
    #[arg(long)]
    no_smart_detection: bool,

    /// Do not watch the page or re-resolve content
    #[arg(long)]
    no_dynamic: bool,

    /// Open the insights panel after startup
    #[arg(long)]
    open: bool,

    /// Print every panel state change, not just the final one
    #[arg(long)]
    frames: bool,

    /// Deadline for one analysis call
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    log: LogTarget,

    /// Log debug detail
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

fn parse_mode(raw: &str) -> Result<AnalysisMode, String> {
    AnalysisMode::parse(raw).ok_or_else(|| format!("unknown mode {raw:?} (auto|manual)"))
}

fn parse_theme(raw: &str) -> Result<Theme, String> {
    Theme::parse(raw).ok_or_else(|| format!("unknown theme {raw:?} (light|dark)"))
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            selector: self.selector.clone(),
            mode: self.mode,
            theme: self.theme,
            max_height: None,
            smart_content_detection: self.no_smart_detection.then_some(false),
            dynamic_content_support: self.no_dynamic.then_some(false),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    widget_logging::initialize(cli.log.into(), level);

    let page = load_page(&cli.page)?;
    let config = load_config(&page, cli.overrides());
    let settings = AnalysisSettings {
        deadline: Duration::from_secs(cli.timeout_secs.max(1)),
        ..AnalysisSettings::default()
    };
    let settle_timeout = settings.deadline + settings.connect_timeout;

    let mut controller = WidgetController::new(page, config, settings);
    if cli.frames {
        controller.set_renderer(TextPanelRenderer::new(std::io::stdout()));
    }
    let source = controller.initialize();
    widget_info!("Content resolved via {:?}", source);
    if cli.open {
        controller.toggle_panel(Some(true));
    }
    controller.pump_until_settled(settle_timeout);

    let mut view = controller.view();
    view.visible = true;
    for line in render_lines(&view) {
        println!("{line}");
    }

    controller.teardown();
    Ok(())
}

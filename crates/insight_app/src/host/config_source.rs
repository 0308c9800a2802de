//! Reads widget configuration from the host page and mounts the widget container.

use insight_core::{ConfigOverrides, WidgetConfig};
use insight_engine::{NodeId, Page, PageError};
use widget_logging::widget_debug;

/// The embedding `<script>` tag carries the endpoint and the other settings.
pub const CONFIG_SCRIPT_SELECTOR: &str = "script[data-api]";

/// Overrides from the first `script[data-api]` tag, or none when absent.
pub fn overrides_from_page(page: &Page) -> ConfigOverrides {
    let script = page
        .select(CONFIG_SCRIPT_SELECTOR)
        .ok()
        .and_then(|matches| matches.first().copied());
    match script {
        Some(id) => {
            widget_debug!("Reading widget configuration from {}", CONFIG_SCRIPT_SELECTOR);
            ConfigOverrides::from_attributes(|name| page.attr(id, name))
        }
        None => ConfigOverrides::default(),
    }
}

/// Defaults, then the page's script tag, then `host` overrides.
pub fn load_config(page: &Page, host: ConfigOverrides) -> WidgetConfig {
    WidgetConfig::with_overrides(overrides_from_page(page).merge(host))
}

/// Appends the widget container to the document body.
pub fn mount_widget(page: &mut Page, config: &WidgetConfig) -> Result<NodeId, PageError> {
    let body = page.body().unwrap_or_else(|| page.root());
    let markup = format!(
        "<div class=\"ai-insight-widget\" data-theme=\"{}\" data-max-height=\"{}\"></div>",
        config.theme(),
        escape_attr(config.max_height())
    );
    let added = page.append_html(body, &markup)?;
    added.first().copied().ok_or(PageError::NotContainer(body))
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

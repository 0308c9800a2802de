//! Insight app: hosts the widget on a parsed page and drives it to completion.
mod host;

pub use host::config_source::{
    load_config, mount_widget, overrides_from_page, CONFIG_SCRIPT_SELECTOR,
};
pub use host::controller::WidgetController;
pub use host::page_source::load_page;
pub use host::ui::render::{render_lines, PanelRenderer, TextPanelRenderer, TOGGLE_LABEL};

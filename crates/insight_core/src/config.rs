use std::fmt;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_SELECTOR: &str = "[data-selector]";
pub const DEFAULT_MAX_HEIGHT: &str = "400px";

/// When the widget runs its first analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Analyze as soon as content nodes are resolved.
    #[default]
    Auto,
    /// Wait until the panel is opened or analysis is requested.
    Manual,
}

impl AnalysisMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Auto => write!(f, "auto"),
            AnalysisMode::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Resolved widget configuration. Built once, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    endpoint: String,
    selector: String,
    mode: AnalysisMode,
    theme: Theme,
    max_height: String,
    smart_content_detection: bool,
    dynamic_content_support: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
            mode: AnalysisMode::Auto,
            theme: Theme::Light,
            max_height: DEFAULT_MAX_HEIGHT.to_string(),
            smart_content_detection: true,
            dynamic_content_support: true,
        }
    }
}

impl WidgetConfig {
    /// Defaults merged with caller overrides; unset fields keep their default.
    pub fn with_overrides(overrides: ConfigOverrides) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: overrides.endpoint.unwrap_or(defaults.endpoint),
            selector: overrides.selector.unwrap_or(defaults.selector),
            mode: overrides.mode.unwrap_or(defaults.mode),
            theme: overrides.theme.unwrap_or(defaults.theme),
            max_height: overrides.max_height.unwrap_or(defaults.max_height),
            smart_content_detection: overrides
                .smart_content_detection
                .unwrap_or(defaults.smart_content_detection),
            dynamic_content_support: overrides
                .dynamic_content_support
                .unwrap_or(defaults.dynamic_content_support),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn max_height(&self) -> &str {
        &self.max_height
    }

    pub fn smart_content_detection(&self) -> bool {
        self.smart_content_detection
    }

    pub fn dynamic_content_support(&self) -> bool {
        self.dynamic_content_support
    }
}

/// Partial configuration supplied by a host (markup attributes, CLI flags).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub selector: Option<String>,
    pub mode: Option<AnalysisMode>,
    pub theme: Option<Theme>,
    pub max_height: Option<String>,
    pub smart_content_detection: Option<bool>,
    pub dynamic_content_support: Option<bool>,
}

impl ConfigOverrides {
    /// Reads `data-*` attributes through `lookup`.
    ///
    /// Boolean flags count as enabled whenever the attribute is present and not
    /// the literal `"false"`. Unknown mode and theme values are ignored.
    pub fn from_attributes<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let text = |name: &str| lookup(name).map(ToOwned::to_owned);
        let flag = |name: &str| lookup(name).map(|value| value.trim() != "false");

        Self {
            endpoint: text("data-api").filter(|value| !value.trim().is_empty()),
            selector: text("data-selector"),
            mode: lookup("data-mode").and_then(AnalysisMode::parse),
            theme: lookup("data-theme").and_then(Theme::parse),
            max_height: text("data-max-height"),
            smart_content_detection: flag("data-smart-detection"),
            dynamic_content_support: flag("data-dynamic"),
        }
    }

    /// Layers `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            selector: other.selector.or(self.selector),
            mode: other.mode.or(self.mode),
            theme: other.theme.or(self.theme),
            max_height: other.max_height.or(self.max_height),
            smart_content_detection: other
                .smart_content_detection
                .or(self.smart_content_detection),
            dynamic_content_support: other
                .dynamic_content_support
                .or(self.dynamic_content_support),
        }
    }
}

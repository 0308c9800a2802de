pub mod config_source;
pub mod controller;
mod effects;
pub mod page_source;
pub mod ui;

pub mod bootstrap;
pub mod commands;
pub mod marker_ticker;
pub mod planner_sync;
pub mod render_model;
pub mod timeline;

//! TUI Widgets
//!
//! Custom widgets for the TableScrub TUI.

mod progress;
mod stats;
mod table;

pub use progress::render_progress;
pub use stats::render_stats;
pub use table::render_table;

// TableScrub - natural-language find/replace over uploaded tables

pub mod config;
pub mod types;
pub mod intake;
pub mod transport;  // Upload and processing calls to the backend
pub mod normalize;
pub mod export;
pub mod controller; // Pipeline state machine
pub mod session;
pub mod tui;        // Terminal User Interface
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use controller::{Effect, Message, Outcome, WorkflowController};
pub use session::Session;
pub use types::{AppError, AppResult};

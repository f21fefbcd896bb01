pub mod error;
pub mod error_utils;
pub mod logging;
pub mod output;
pub mod prompt;

pub use error::{Result, SyncError};
pub use output::ConsoleLogger;
pub use prompt::TerminalPrompter;

pub mod git;
pub mod runner;

pub use git::SystemGit;
pub use runner::{GitRunner, install_interrupt_handler};

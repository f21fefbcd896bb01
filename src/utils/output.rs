use crate::utils::error::SyncError;
use colored::Colorize;
use log::debug;

const BOX_WIDTH: usize = 60;

/// User-facing progress and result messages
pub trait Logger {
    fn title(&self, title: &str);
    fn success(&self, icon: &str, message: &str);
    /// `err` adds the failure detail and any remediation hint
    fn error(&self, icon: &str, message: &str, err: Option<&SyncError>);
    fn warning(&self, icon: &str, message: &str);
    fn info(&self, icon: &str, message: &str);
    fn muted(&self, message: &str);
    fn list_item(&self, message: &str);
    fn boxed(&self, title: &str, content: &str);
    fn newline(&self);
}

/// Colored terminal output on stdout
#[derive(Default)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn title(&self, title: &str) {
        println!();
        println!("{}", title.bold().magenta());
        println!("{}", "=".repeat(BOX_WIDTH).magenta());
    }

    fn success(&self, icon: &str, message: &str) {
        println!("{} {}", icon.green().bold(), message);
    }

    fn error(&self, icon: &str, message: &str, err: Option<&SyncError>) {
        println!("{} {}", icon.red().bold(), message);
        let Some(err) = err else {
            return;
        };

        println!("  {}", err.to_string().dimmed());
        if let Some(hint) = err.remediation() {
            println!();
            println!("  {} {}", "💡".yellow(), hint.yellow());
        }
        if let Some(output) = err.output() {
            debug!("git output:\n{}", output.trim_end());
        }
    }

    fn warning(&self, icon: &str, message: &str) {
        println!("{} {}", icon.yellow().bold(), message);
    }

    fn info(&self, icon: &str, message: &str) {
        println!("{} {}", icon.cyan(), message);
    }

    fn muted(&self, message: &str) {
        println!("{}", message.dimmed());
    }

    fn list_item(&self, message: &str) {
        println!("  {}", message);
    }

    fn boxed(&self, title: &str, content: &str) {
        let rule = BOX_WIDTH.saturating_sub(title.chars().count() + 4);
        println!();
        println!(
            "{} {} {}",
            "╭─".magenta(),
            title.bold().magenta(),
            "─".repeat(rule).magenta()
        );
        for line in content.lines() {
            println!("{} {}", "│".magenta(), line);
        }
        println!("{}", format!("╰{}", "─".repeat(BOX_WIDTH - 1)).magenta());
        println!();
    }

    fn newline(&self) {
        println!();
    }
}

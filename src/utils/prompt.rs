use crate::types::SelectOption;
use crate::utils::error::{Result, SyncError};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Interactive input used by the setup and sync flows.
///
/// Empty answers are returned as empty strings; the caller treats them as
/// cancellation.
pub trait Prompter {
    fn confirm(&self, prompt: &str) -> Result<bool>;
    /// Free text, trimmed
    fn input(&self, prompt: &str, placeholder: &str) -> Result<String>;
    /// Returns the `value` of the chosen option, or "" when nothing was chosen
    fn select(&self, prompt: &str, options: &[SelectOption]) -> Result<String>;
    /// Run `task` behind a progress indicator and return its result
    fn spin_while(&self, message: &str, task: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}

fn prompt_error(e: dialoguer::Error) -> SyncError {
    SyncError::Prompt(e.to_string())
}

/// Terminal prompts using dialoguer, spinner from indicatif
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(prompt_error)
    }

    fn input(&self, prompt: &str, placeholder: &str) -> Result<String> {
        let answer: String = Input::with_theme(&self.theme)
            .with_prompt(format!("{} (e.g. {})", prompt, placeholder))
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)?;
        Ok(answer.trim().to_string())
    }

    fn select(&self, prompt: &str, options: &[SelectOption]) -> Result<String> {
        let labels: Vec<&str> = options.iter().map(|o| o.label).collect();

        // Esc / q yields None
        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?;

        Ok(selection
            .and_then(|i| options.get(i))
            .map(|o| o.value.to_string())
            .unwrap_or_default())
    }

    fn spin_while(&self, message: &str, task: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = task();
        spinner.finish_and_clear();
        result
    }
}

use std::fmt;

/// Current branch and its distance from the upstream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchInfo {
    pub branch: String,
    pub ahead: u32,
    pub behind: u32,
}

impl BranchInfo {
    pub fn is_diverged(&self) -> bool {
        self.ahead > 0 || self.behind > 0
    }
}

/// One entry of a single-select prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOption {
    pub label: &'static str,
    pub value: &'static str,
}

/// What the user picked during first-time setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupDecision {
    Clone,
    Fresh,
    Replace,
    Merge,
    Cancel,
}

impl SetupDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            SetupDecision::Clone => "clone",
            SetupDecision::Fresh => "fresh",
            SetupDecision::Replace => "replace",
            SetupDecision::Merge => "merge",
            SetupDecision::Cancel => "cancel",
        }
    }

    /// Prompt entry carrying this decision as its value
    pub fn option(self, label: &'static str) -> SelectOption {
        SelectOption {
            label,
            value: self.as_str(),
        }
    }
}

impl std::str::FromStr for SetupDecision {
    type Err = String;

    /// An empty answer is always a cancellation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clone" => Ok(SetupDecision::Clone),
            "fresh" => Ok(SetupDecision::Fresh),
            "replace" => Ok(SetupDecision::Replace),
            "merge" => Ok(SetupDecision::Merge),
            "cancel" | "" => Ok(SetupDecision::Cancel),
            _ => Err(format!("Invalid setup choice: {}", s)),
        }
    }
}

impl fmt::Display for SetupDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

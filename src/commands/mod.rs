pub mod setup;
pub mod status;
pub mod sync;
pub mod version;

pub use status::{check_status, display_status};
pub use sync::SyncService;
pub use version::display_version;

use std::path::Path;

/// Show paths under the home directory as `~/...`
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return Path::new("~").join(rest).display().to_string();
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_shortens_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(display_path(&home.join(".claude")), "~/.claude");
        assert_eq!(display_path(Path::new("/srv/claude")), "/srv/claude");
    }
}

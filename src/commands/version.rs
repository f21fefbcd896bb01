use colored::Colorize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_line() -> String {
    format!("claude-sync {}", VERSION)
}

pub fn display_version() {
    println!("{}", version_line().bold().magenta());
    println!(
        "  {} {}/{}",
        "Platform:".bold(),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!("  {} git (installed binary)", "Backend:".bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line_uses_package_version() {
        assert_eq!(version_line(), format!("claude-sync {}", env!("CARGO_PKG_VERSION")));
    }
}

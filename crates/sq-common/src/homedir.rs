//! Home-directory `~` expansion for output paths.
//!
//! Trims whitespace, leaves non-`~`-prefixed paths untouched, otherwise
//! prefers `HOME`, falls back to `USERPROFILE`, and as a last resort
//! leaves the literal `~` in place rather than failing.

use std::path::PathBuf;

/// Expand a leading `~` in `path` to the user's home directory.
///
/// Lookup order: `HOME`, then `USERPROFILE`, then the literal `~` if
/// neither is set.
pub fn expand_homedir(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if !trimmed.starts_with('~') {
        return PathBuf::from(trimmed);
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| "~".to_string());

    PathBuf::from(format!("{home}{}", &trimmed[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_non_tilde_paths_untouched() {
        assert_eq!(expand_homedir("./mat/"), PathBuf::from("./mat/"));
        assert_eq!(expand_homedir("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(expand_homedir("  ./mat/  "), PathBuf::from("./mat/"));
    }

    #[test]
    fn expands_tilde_using_home_env() {
        let saved = std::env::var("HOME").ok();
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_homedir("~/mat/"),
            PathBuf::from("/home/tester/mat/")
        );
        match saved {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }
    }

    #[test]
    fn bare_tilde_expands_to_home_root() {
        let saved = std::env::var("HOME").ok();
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_homedir("~"), PathBuf::from("/home/tester"));
        match saved {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }
    }
}

//! General utility functions for wdbc
//!
//! Table names come from archives that spell paths with `\` and ignore case,
//! so the filter helpers here match names the same way the archives resolve
//! them.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

/// Format a byte count with a binary unit (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if size < 1024 {
        return format!("{} B", size);
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Create a case-insensitive glob matcher for table names
///
/// - Backslashes in the pattern are read as path separators
/// - `*.ext` becomes `**/*.ext` (match in any directory)
/// - Plain text without wildcards becomes `**/*text*` (substring search)
pub fn create_glob_matcher(pattern: &str) -> Result<GlobMatcher> {
    let normalized = pattern.replace('\\', "/");
    let expanded = if normalized.starts_with("*.") {
        format!("**/{}", normalized)
    } else if !normalized.contains(&['*', '?', '['][..]) {
        format!("**/*{}*", normalized)
    } else {
        normalized
    };

    let glob = GlobBuilder::new(&expanded)
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .with_context(|| format!("Invalid pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// Check if an archive name matches the optional filter
///
/// `DBFilesClient\Spell.dbc` and `DBFilesClient/Spell.dbc` match alike.
pub fn matches_filter(name: &str, matcher: Option<&GlobMatcher>) -> bool {
    match matcher {
        Some(m) if name.contains('\\') => m.is_match(name.replace('\\', "/")),
        Some(m) => m.is_match(name),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024 * 1024), "5120.00 GB");
    }

    #[test]
    fn test_glob_matcher_patterns() {
        let ext = create_glob_matcher("*.dbc").unwrap();
        assert!(ext.is_match("DBFilesClient/Spell.dbc"));
        assert!(!ext.is_match("DBFilesClient/Spell.db2"));

        let substring = create_glob_matcher("Spell").unwrap();
        assert!(matches_filter("DBFilesClient/SpellIcon.dbc", Some(&substring)));
        assert!(!matches_filter("DBFilesClient/Map.dbc", Some(&substring)));
        assert!(matches_filter("anything", None));
    }

    #[test]
    fn test_backslash_names_match() {
        let dir = create_glob_matcher("DBFilesClient/*").unwrap();
        assert!(matches_filter("DBFilesClient\\Spell.dbc", Some(&dir)));
        assert!(!matches_filter("Interface\\Spell.dbc", Some(&dir)));

        let backslash_pattern = create_glob_matcher("dbfilesclient\\map*").unwrap();
        assert!(matches_filter("DBFilesClient\\Map.dbc", Some(&backslash_pattern)));
        assert!(matches_filter("DBFilesClient/MapDifficulty.dbc", Some(&backslash_pattern)));
    }

    #[test]
    fn test_matching_ignores_case() {
        let ext = create_glob_matcher("*.DBC").unwrap();
        assert!(matches_filter("DBFilesClient\\spell.dbc", Some(&ext)));

        let substring = create_glob_matcher("spellicon").unwrap();
        assert!(matches_filter("DBFilesClient\\SpellIcon.dbc", Some(&substring)));
    }
}

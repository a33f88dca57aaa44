use glob::{Pattern, PatternError};

/// Names that are never uploaded, at any depth. A matching directory prunes
/// its whole subtree.
pub const EXCLUDED_NAMES: &[&str] = &[
    // version control
    ".git",
    ".svn",
    ".hg",
    // editor and vault metadata
    ".obsidian",
    ".vscode",
    ".idea",
    // OS index files
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // dependencies
    "node_modules",
    "bower_components",
    "__pycache__",
    ".venv",
    "venv",
    // environment and credentials
    ".env",
    ".npmrc",
];

/// Any component starting with this is treated as hidden.
pub const HIDDEN_PREFIX: char = '.';

/// Fixed denylist plus optional user-supplied glob patterns, matched
/// against single path components.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    extra: Vec<Pattern>,
}

impl ExclusionRules {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let extra = patterns
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    pub fn is_excluded(&self, component: &str) -> bool {
        component.starts_with(HIDDEN_PREFIX)
            || EXCLUDED_NAMES.contains(&component)
            || self.extra.iter().any(|p| p.matches(component))
    }

    /// True when any `/`-separated component of `path` is excluded.
    pub fn path_is_excluded(&self, path: &str) -> bool {
        path.split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .any(|c| self.is_excluded(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_and_denylisted_names_are_excluded() {
        let rules = ExclusionRules::default();
        assert!(rules.is_excluded(".git"));
        assert!(rules.is_excluded(".anything"));
        assert!(rules.is_excluded("node_modules"));
        assert!(rules.is_excluded("Thumbs.db"));
        assert!(!rules.is_excluded("notes.md"));
        assert!(!rules.is_excluded("src"));
    }

    #[test]
    fn extra_patterns_match_components() {
        let rules = ExclusionRules::new(&["*.tmp", "build"]).unwrap();
        assert!(rules.is_excluded("scratch.tmp"));
        assert!(rules.is_excluded("build"));
        assert!(!rules.is_excluded("builder"));
    }

    #[test]
    fn path_check_looks_at_every_component() {
        let rules = ExclusionRules::default();
        assert!(rules.path_is_excluded("docs/node_modules/pkg"));
        assert!(rules.path_is_excluded(".git/config"));
        assert!(!rules.path_is_excluded("./docs/guide"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(ExclusionRules::new(&["[unclosed"]).is_err());
    }
}

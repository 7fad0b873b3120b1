//! Compilation failures.

use thiserror::Error;
use tyval_core::ConfigurationError;

/// The schema graph could not be compiled.
///
/// Every failure is a configuration problem found by the reachability pass;
/// `path` is the schema location it was found at.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot compile schema at {}: {source}", display_path(.path))]
pub struct CompileError {
    pub path: String,
    #[source]
    pub source: ConfigurationError,
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

impl From<ConfigurationError> for CompileError {
    fn from(source: ConfigurationError) -> Self {
        let path = match &source {
            ConfigurationError::UnresolvedReference { path, .. }
            | ConfigurationError::UnboundThis { path }
            | ConfigurationError::MissingEntry { path, .. }
            | ConfigurationError::UnknownKind { path, .. }
            | ConfigurationError::InvalidPattern { path, .. }
            | ConfigurationError::UnguardedCycle { path, .. } => path.clone(),
            ConfigurationError::MissingId { .. } => String::new(),
        };
        Self { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_lifted_from_source() {
        let err = CompileError::from(ConfigurationError::UnresolvedReference {
            name: "Missing".into(),
            path: "/properties/a".into(),
        });
        assert_eq!(err.path, "/properties/a");
        assert_eq!(
            err.to_string(),
            "cannot compile schema at /properties/a: unresolved reference 'Missing' at /properties/a"
        );
    }

    #[test]
    fn test_root_path_display() {
        let err = CompileError::from(ConfigurationError::MissingId { position: 2 });
        assert!(err.to_string().starts_with("cannot compile schema at (root):"));
    }
}

//! Allow-list filtering by group or language.

use glob::Pattern;

use super::CatalogError;

/// Glob patterns a value must match; an empty list allows everything
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    patterns: Vec<Pattern>,
}

impl AllowList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CatalogError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| CatalogError::Pattern {
                    pattern: p.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn allows(&self, value: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(value))
    }
}

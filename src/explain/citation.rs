//! Rulebook citations.

use serde::{Deserialize, Serialize};

/// A rulebook or FAQ page reference.
///
/// ```
/// use rust_wargame::explain::Citation;
///
/// let cite = Citation::new("Core Rules", 48).with_section("To Hit");
/// assert_eq!(cite.to_string(), "Core Rules p.48 (To Hit)");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Publication (rulebook, army book, FAQ).
    pub source: String,
    /// Page number.
    pub page: u16,
    /// Section heading, if any.
    pub section: Option<String>,
}

impl Citation {
    /// Create a citation to a page.
    pub fn new(source: impl Into<String>, page: u16) -> Self {
        Self {
            source: source.into(),
            page,
            section: None,
        }
    }

    /// Set the section heading (builder pattern).
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} p.{}", self.source, self.page)?;
        if let Some(section) = &self.section {
            write!(f, " ({})", section)?;
        }
        Ok(())
    }
}

//! crates/folktales_core/src/catalog.rs
//!
//! The catalog query criteria and their matching rule. The gateway adapter
//! translates an active filter into its own query language; the rule here is
//! the contract both sides agree on.

use crate::domain::Folktale;

/// The sentinel value meaning "no restriction" for the region and source axes.
pub const ALL: &str = "all";

/// The (search term, region, source) triple a catalog query is issued with.
///
/// An empty or whitespace-only term and the `"all"` sentinel each disable
/// their axis. Active filters combine conjunctively: the term matches by
/// case-insensitive substring on the title only, region and source by exact
/// equality.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    pub term: String,
    pub region: String,
    pub source: String,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            term: String::new(),
            region: ALL.to_string(),
            source: ALL.to_string(),
        }
    }
}

impl CatalogFilter {
    pub fn new(
        term: impl Into<String>,
        region: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            region: region.into(),
            source: source.into(),
        }
    }

    /// The trimmed search term, or `None` when the axis is unrestricted.
    pub fn active_term(&self) -> Option<&str> {
        let term = self.term.trim();
        (!term.is_empty()).then_some(term)
    }

    /// The region restriction, or `None` for the `"all"` sentinel.
    pub fn active_region(&self) -> Option<&str> {
        (self.region != ALL).then_some(self.region.as_str())
    }

    /// The source restriction, or `None` for the `"all"` sentinel.
    pub fn active_source(&self) -> Option<&str> {
        (self.source != ALL).then_some(self.source.as_str())
    }

    /// Whether a catalog item satisfies every active axis of this filter.
    pub fn matches(&self, tale: &Folktale) -> bool {
        if let Some(term) = self.active_term() {
            if !tale.title.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(region) = self.active_region() {
            if tale.region.as_deref() != Some(region) {
                return false;
            }
        }
        if let Some(source) = self.active_source() {
            if tale.source.as_deref() != Some(source) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tale(title: &str, region: Option<&str>, source: Option<&str>) -> Folktale {
        Folktale {
            id: Uuid::new_v4(),
            title: title.to_string(),
            text: "Once upon a time...".to_string(),
            region: region.map(String::from),
            source: source.map(String::from),
        }
    }

    #[test]
    fn default_filter_matches_everything() {
        let filter = CatalogFilter::default();
        assert!(filter.matches(&tale("The Firebird", Some("Russia"), None)));
        assert!(filter.matches(&tale("Anansi", None, None)));
    }

    #[test]
    fn all_sentinel_imposes_no_restriction() {
        let filter = CatalogFilter::new("", ALL, ALL);
        assert!(filter.matches(&tale("Baba Yaga", Some("Russia"), Some("Afanasyev"))));
    }

    #[test]
    fn term_matches_case_insensitive_substring_on_title_only() {
        let filter = CatalogFilter::new("FIRE", ALL, ALL);
        assert!(filter.matches(&tale("The Firebird", None, None)));
        // Body text never participates in the match.
        assert!(!filter.matches(&tale("Vasilisa", None, None)));
    }

    #[test]
    fn whitespace_only_term_is_inactive() {
        let filter = CatalogFilter::new("   ", ALL, ALL);
        assert!(filter.matches(&tale("Anansi", None, None)));
    }

    #[test]
    fn region_and_source_match_exactly() {
        let filter = CatalogFilter::new("", "Russia", ALL);
        assert!(filter.matches(&tale("The Firebird", Some("Russia"), None)));
        assert!(!filter.matches(&tale("Anansi", Some("Ghana"), None)));
        // Untagged items fail a restricted axis.
        assert!(!filter.matches(&tale("Anansi", None, None)));
    }

    #[test]
    fn filters_combine_conjunctively() {
        let filter = CatalogFilter::new("bird", "Russia", "Afanasyev");
        assert!(filter.matches(&tale("The Firebird", Some("Russia"), Some("Afanasyev"))));
        assert!(!filter.matches(&tale("The Firebird", Some("Russia"), Some("Grimm"))));
        assert!(!filter.matches(&tale("Vasilisa", Some("Russia"), Some("Afanasyev"))));
    }
}

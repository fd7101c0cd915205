use indexmap::IndexSet;
use serde::Serialize;
use thiserror::Error;

/// Joins serialized terms. The service splits on this before anything else.
pub const TERM_SEPARATOR: &str = "||";

/// Separates field from query inside one term. The service splits once, so
/// only the field side must stay free of it.
pub const KEY_VALUE_DELIMITER: char = ':';

// ---------------------------------------------------------------------------
// Filter terms
// ---------------------------------------------------------------------------

/// One `field:query` constraint. Terms are OR-combined by the service and the
/// same field may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTerm {
    pub field: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("field {field:?} contains ':' or '||'")]
    FieldHasDelimiter { field: String },

    #[error("query {query:?} for field {field:?} contains '||'")]
    QueryHasSeparator { field: String, query: String },
}

impl FilterTerm {
    pub fn new(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            query: query.into(),
        }
    }

    /// A term takes part in the expression only when both sides are filled in.
    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && !self.query.is_empty()
    }

    /// Reject values that would corrupt the serialized expression.
    ///
    /// The wire format has no escaping, so these characters are refused at
    /// input time instead.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.field.contains(KEY_VALUE_DELIMITER) || self.field.contains(TERM_SEPARATOR) {
            return Err(FilterError::FieldHasDelimiter {
                field: self.field.clone(),
            });
        }
        if self.query.contains(TERM_SEPARATOR) {
            return Err(FilterError::QueryHasSeparator {
                field: self.field.clone(),
                query: self.query.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Column projection
// ---------------------------------------------------------------------------

/// The columns the service should return, in the order the user picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnProjection {
    columns: IndexSet<String>,
}

impl ColumnProjection {
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Add the column if absent, remove it if present.
    pub fn toggle(&mut self, column: &str) {
        if !self.columns.shift_remove(column) {
            self.columns.insert(column.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnProjection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Query parameters of one search call.
///
/// An empty `filter` means "no filter". A missing `columns` means "all
/// columns", which is not the same as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "filters")]
    pub filter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exact: bool,
}

impl SearchRequest {
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }
}

/// Serialize filter terms and an optional projection into a search request.
///
/// Incomplete terms are skipped; the rest become `field:query` joined by
/// [`TERM_SEPARATOR`]. Values are passed through verbatim, callers run
/// [`FilterTerm::validate`] first.
pub fn build(terms: &[FilterTerm], projection: Option<&ColumnProjection>) -> SearchRequest {
    let filter = terms
        .iter()
        .filter(|t| t.is_complete())
        .map(|t| format!("{}{KEY_VALUE_DELIMITER}{}", t.field, t.query))
        .collect::<Vec<_>>()
        .join(TERM_SEPARATOR);

    let columns = projection
        .filter(|p| !p.is_empty())
        .map(|p| p.iter().collect::<Vec<_>>().join(","));

    SearchRequest {
        filter,
        columns,
        exact: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_terms_means_match_all() {
        let req = build(&[], None);
        assert_eq!(req.filter, "");
        assert_eq!(req.columns, None);
    }

    #[test]
    fn single_term() {
        let req = build(&[FilterTerm::new("village", "Pune")], None);
        assert_eq!(req.filter, "village:Pune");
        assert_eq!(req.columns, None);
    }

    #[test]
    fn incomplete_terms_are_dropped() {
        let terms = [
            FilterTerm::new("village", "Pune"),
            FilterTerm::new("", "x"),
            FilterTerm::new("state", "MH"),
            FilterTerm::new("district", ""),
        ];
        assert_eq!(build(&terms, None).filter, "village:Pune||state:MH");
    }

    #[test]
    fn repeated_fields_are_kept() {
        let terms = [FilterTerm::new("state", "MH"), FilterTerm::new("state", "GJ")];
        assert_eq!(build(&terms, None).filter, "state:MH||state:GJ");
    }

    #[test]
    fn projection_keeps_caller_order() {
        let projection: ColumnProjection = ["b", "a"].into_iter().collect();
        let req = build(&[FilterTerm::new("village", "Pune")], Some(&projection));
        assert_eq!(req.columns.as_deref(), Some("b,a"));
    }

    #[test]
    fn empty_projection_is_omitted() {
        let req = build(&[], Some(&ColumnProjection::default()));
        assert_eq!(req.columns, None);
    }

    #[test]
    fn toggle_removes_and_reappends() {
        let mut projection: ColumnProjection = ["a", "b", "c"].into_iter().collect();
        projection.toggle("a");
        projection.toggle("a");
        assert_eq!(projection.iter().collect::<Vec<_>>(), ["b", "c", "a"]);
    }

    #[test]
    fn validate_rejects_separators() {
        assert!(FilterTerm::new("a:b", "x").validate().is_err());
        assert!(FilterTerm::new("a||b", "x").validate().is_err());
        assert!(FilterTerm::new("a", "x||y").validate().is_err());
        // The service splits once on ':', so a colon in the query is fine.
        assert!(FilterTerm::new("time", "10:30").validate().is_ok());
    }

    #[test]
    fn query_string_uses_service_parameter_names() {
        let projection: ColumnProjection = ["village", "population"].into_iter().collect();
        let req = build(&[FilterTerm::new("state", "MH")], Some(&projection)).with_exact(true);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["filters"], "state:MH");
        assert_eq!(value["columns"], "village,population");
        assert_eq!(value["exact"], true);

        let plain = serde_json::to_value(build(&[], None)).unwrap();
        assert_eq!(plain, serde_json::json!({ "filters": "" }));
    }

    proptest! {
        #[test]
        fn build_is_deterministic(
            pairs in proptest::collection::vec(("[a-z]{0,4}", "[A-Za-z0-9 ]{0,6}"), 0..6)
        ) {
            let terms: Vec<FilterTerm> =
                pairs.iter().map(|(f, q)| FilterTerm::new(f.clone(), q.clone())).collect();
            prop_assert_eq!(build(&terms, None), build(&terms, None));

            let complete = terms.iter().filter(|t| t.is_complete()).count();
            let filter = build(&terms, None).filter;
            let parts = if filter.is_empty() { 0 } else { filter.split(TERM_SEPARATOR).count() };
            prop_assert_eq!(parts, complete);
        }
    }
}

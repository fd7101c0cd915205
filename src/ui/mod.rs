pub mod capture;
pub mod panels;
pub mod results;

use crate::data::filter::{ColumnProjection, FilterTerm};
use crate::data::results::LayoutMode;
use crate::export::MediaKind;

/// Something the user asked for this frame. Collected while drawing and
/// applied afterwards, so panels only need shared access to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    PickFile,
    Upload,
    SelectSheet(String),
    /// `with_projection` is false for "search all columns".
    Search { with_projection: bool },
    Reset,
    SetLayout(LayoutMode),
    Export(MediaKind),
}

/// Inputs of the search form. Purely UI state; the controller only sees
/// them when a search is issued.
#[derive(Debug, Clone)]
pub struct SearchForm {
    pub sheet_choice: String,
    pub terms: Vec<FilterTerm>,
    pub projection: ColumnProjection,
    pub choosing_columns: bool,
    pub exact: bool,
}

impl SearchForm {
    pub fn new(exact: bool) -> Self {
        Self {
            sheet_choice: String::new(),
            terms: vec![FilterTerm::default()],
            projection: ColumnProjection::default(),
            choosing_columns: false,
            exact,
        }
    }

    /// Clear everything tied to the previous sheet's columns.
    pub fn reset_for_new_columns(&mut self) {
        self.terms = vec![FilterTerm::default()];
        self.projection.clear();
        self.choosing_columns = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_columns_reset_terms_and_projection() {
        let mut form = SearchForm::new(true);
        form.terms.push(FilterTerm::new("village", "Pune"));
        form.projection.toggle("village");
        form.choosing_columns = true;
        form.sheet_choice = "Feb".into();

        form.reset_for_new_columns();
        assert_eq!(form.terms, [FilterTerm::default()]);
        assert!(form.projection.is_empty());
        assert!(!form.choosing_columns);
        assert_eq!(form.sheet_choice, "Feb");
        assert!(form.exact);
    }
}

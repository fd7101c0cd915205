/// Data layer: core types, filter serialization, and the result store.
///
/// Architecture:
/// ```text
///   FilterTerm[] + ColumnProjection
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  build → SearchRequest { filters, columns, exact }
///   └──────────┘
///        │   (query service)
///        ▼
///   ┌──────────────┐
///   │ResultSetStore │  Vec<ResultRow>, headers, layout mode
///   └──────────────┘
///        │
///        ▼
///   normalized cells → table / cards / export
/// ```

pub mod filter;
pub mod model;
pub mod results;

/// Data layer: core types, fetching, caching, and filtering.
///
/// Architecture:
/// ```text
///  .json / .csv / .parquet  (customers export)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → sort by _id, cap at 50, strip fields
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  read-through TTL cache owned by the caller
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ CustomerTable  │  Vec<Row>, column index
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  classify columns, apply per-column constraints
///   └──────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;

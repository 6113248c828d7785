/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  loader   │ ───▶ │  region   │  country code → continent
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │ Dataset   │ ───▶ │ catalog   │  dimension domains, metrics with data
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection → Subset (source order)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ aggregate │  group by dimensions → mean / sum / top-N / rank
///   └──────────┘
/// ```

pub mod aggregate;
pub mod catalog;
pub mod filter;
pub mod loader;
pub mod model;
pub mod overview;
pub mod region;

//! Data layer: survey schema, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  data/raw/*.csv | *.parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → decode codes → drop incomplete rows
//!   └──────────┘  (writes data/processed cache)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  immutable Vec<Record>, column list, age encoding
//!   └──────────┘
//!        │               │
//!        ▼               ▼
//!   ┌──────────┐   ┌──────────┐
//!   │  filter   │   │ options   │  distinct labels for the controls
//!   └──────────┘   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  counts / means / sampled points per chart
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod codes;
pub mod filter;
pub mod loader;
pub mod model;
pub mod options;
pub mod schema;

//! Farm activity CSV in, ESG metrics, pillar scores and insights out.
//!
//! The pipeline runs in fixed stages: load ([`loader`]), validate
//! ([`validate`]), roll fields up to farm-years for the deep-dive
//! ([`rollup`]), derive metrics ([`metrics`]), score ([`scoring`]),
//! generate insights ([`insight`]), aggregate the portfolio
//! ([`aggregate`]) and follow deep-dive farms across years ([`trend`]).
//! [`report::analyze`] runs them in order.
pub mod aggregate;
pub mod config;
pub mod error;
pub mod insight;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod scoring;
pub mod trend;
pub mod types;
pub mod util;
pub mod validate;

pub use config::{EsgConfig, DEFAULT_CONFIG};
pub use error::{EsgError, EsgResult, RowError, ValidationWarning};
pub use loader::Dataset;
pub use report::{analyze, analyze_path, AnalysisResponse, AnalysisResult, FarmReport};
pub use types::{Measure, MetricId, Pillar, ReportType};

//! Evaluation aggregation pipeline: month filtering, grouped averages,
//! trend series, report assembly and export.

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod report;

pub use aggregate::{AggregatedResult, AggregationAxis, AggregationFilters, TrendSeries};
pub use filter::DateFilter;
pub use report::{EvaluationReport, ReportRequest, ReportService};

//! Market reports and their export to disk.

pub mod export;
pub mod reports;

pub use export::{export_report, ReportPaths};
pub use reports::{MarketReport, MarkdownReportGenerator, SymbolSummary};

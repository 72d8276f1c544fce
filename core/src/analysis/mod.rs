//! Table building and summary statistics for the snapshot plots
//!
//! - [`metrics`]: MTDDH per-case metrics table and snapshot row selection
//! - [`radiopedia`]: Radiopedia ultrasound dataset summary
//! - [`stats`]: small numeric helpers (moments, histograms, density curves)

pub mod metrics;
pub mod radiopedia;
pub mod stats;

pub use metrics::{
    build_case_side_rows, build_metrics_table, folder_group_letter, select_for_snapshot,
    MetricRow, MetricsTable, SnapshotSelection,
};
pub use radiopedia::{correct_side_graf_types, RadiopediaSummary};

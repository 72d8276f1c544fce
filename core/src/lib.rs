pub mod analysis;
pub mod audit;
pub mod cli;
pub mod error;
pub mod extraction;
pub mod render;
pub mod types;

pub use analysis::{build_metrics_table, select_for_snapshot, MetricsTable, RadiopediaSummary};
pub use audit::{audit_dataset, find_outliers, InventoryReport, OutlierReport};
pub use error::{HipAuditError, Result};
pub use extraction::{load_pose_labels, load_ultrasound_records, UltrasoundRecord};
pub use types::*;

//! Dataset bookkeeping for the MTDDH X-ray release
//!
//! - [`outliers`]: frog-leg view detection and the `outliers.json` report
//! - [`inventory`]: comparison of the raw release against the processed data

pub mod inventory;
pub mod outliers;

pub use inventory::{
    audit_dataset, categorize_missing, clean_dataset1_prefix, compare_stems,
    extract_dataset2_id, list_dataset2_images, list_files_by_stem, load_annotation_stems,
    DatasetKind, ExclusionReason, InventoryReport, StemComparison,
};
pub use outliers::{find_existing_image, find_outliers, is_frog_leg_view, OutlierReport};

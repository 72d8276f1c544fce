//! Core type definitions for hip dataset audits
//!
//! This module provides the fundamental types used throughout the hipaudit library:
//! - [`Side`]: Hip side of a measurement or image (left, right, both)
//! - [`Pose`], [`Keypoint`], [`BoundingBox`], [`Visibility`]: YOLO pose annotations
//! - [`OutlierCatalog`]: Curated exception lists for the X-ray outlier scan
//! - [`SnapshotFilter`]: Configuration for selecting MTDDH rows before plotting

mod catalog;
mod filter;
mod pose;
mod side;

pub use catalog::{OutlierCatalog, OutlierGroup};
pub use filter::{SnapshotFilter, DEFAULT_ACE_LIMIT};
pub use pose::{BoundingBox, Keypoint, Pose, Visibility};
pub use side::Side;

pub mod report;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Command-line arguments for hipaudit
#[derive(Parser, Debug)]
#[command(name = "hipaudit")]
#[command(about = "Audit and visualise hip X-ray and ultrasound datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TrueType font used for figure text
    #[arg(long, global = true, value_name = "TTF")]
    pub font: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flag frog-leg views and catalogued outliers in the MTDDH labels
    Outliers {
        /// Directory with images and YOLO pose labels
        #[arg(long, default_value = "./mtddh_xray_2d/data")]
        data_dir: PathBuf,

        /// Where to write the outlier report
        #[arg(short, long, default_value = "outliers.json")]
        output: PathBuf,

        /// JSON outlier catalog replacing the built-in lists
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Summary format printed after the report is written
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Compare the raw MTDDH release against the processed data directory
    Inventory {
        /// Root of the extracted MTDDH release
        #[arg(value_name = "RAW_ROOT")]
        raw_root: PathBuf,

        /// Processed data directory
        #[arg(long, default_value = "mtddh_xray_2d/data")]
        data_dir: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Plot ACE/Wiberg distributions and grade counts from metrics.json files
    MtddhSnapshot {
        /// Root searched recursively for metrics.json
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Output directory
        #[arg(long, default_value = "docs")]
        out_dir: PathBuf,

        /// Output file name inside the output directory
        #[arg(long, default_value = "mtddh_snapshot_new.png")]
        file_name: String,

        /// Folder group letters left out of the plots
        #[arg(long, value_delimiter = ',', default_values_t = ['i', 'z'])]
        exclude_groups: Vec<char>,

        /// Rows with a larger ACE index are listed and left out
        #[arg(long, default_value_t = crate::types::DEFAULT_ACE_LIMIT)]
        ace_limit: f64,
    },

    /// Plot the Radiopedia ultrasound dataset overview
    RadiopediaSnapshot {
        /// Directory of per-image JSON metadata
        #[arg(long, default_value = "./radiopedia_ultrasound_2d/data")]
        data_dir: PathBuf,

        /// Image shown in the first panel
        #[arg(long, default_value = "./docs/172535_0_labels.jpg")]
        sample_image: PathBuf,

        /// Output PNG
        #[arg(short, long, default_value = "./docs/radiopedia_snapshot.png")]
        output: PathBuf,

        /// Format of the summary printed after plotting
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Draw a YOLO pose label over its X-ray
    ShowPose {
        /// X-ray image
        #[arg(value_name = "IMAGE", default_value = "./mtddh_xray_2d/data/dataset1_train_a315.jpg")]
        image: PathBuf,

        /// Label file; defaults to the image path with a .txt extension
        #[arg(long)]
        label: Option<PathBuf>,

        /// Output PNG
        #[arg(short, long, default_value = "pose_overlay.png")]
        output: PathBuf,
    },

    /// Draw a segmentation mask and metadata over an ultrasound image
    ShowUltrasound {
        /// Directory holding `<id>.png`, `<id>_label.png` and `<id>.json`
        #[arg(long, default_value = "./radiopedia_ultrasound_2d/data")]
        data_dir: PathBuf,

        /// Sample identifier
        #[arg(value_name = "SAMPLE_ID", default_value = "167854_0")]
        sample_id: String,

        /// Output PNG
        #[arg(short, long, default_value = "ultrasound_overlay.png")]
        output: PathBuf,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Label file belonging to an image: same path, `.txt` extension
pub fn default_label_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Image, mask and metadata paths of an ultrasound sample
pub fn ultrasound_sample_paths(data_dir: &Path, sample_id: &str) -> (PathBuf, PathBuf, PathBuf) {
    (
        data_dir.join(format!("{}.png", sample_id)),
        data_dir.join(format!("{}_label.png", sample_id)),
        data_dir.join(format!("{}.json", sample_id)),
    )
}

/// Raw MTDDH locations the inventory command reads
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLayout {
    /// Dataset1 keypoint image directories
    pub dataset1_dirs: Vec<PathBuf>,
    /// Dataset1 COCO-style annotation files
    pub dataset1_annotations: Vec<PathBuf>,
    /// Dataset2 case folders
    pub dataset2_dir: PathBuf,
}

impl InventoryLayout {
    pub fn new(raw_root: &Path) -> Self {
        let keypoints = raw_root.join("Dataset1").join("Keypoints");
        Self {
            dataset1_dirs: vec![keypoints.join("Train"), keypoints.join("Validation")],
            dataset1_annotations: vec![
                keypoints.join("Keypoints_Validation.json"),
                keypoints.join("Keypoints_Train.json"),
            ],
            dataset2_dir: raw_root.join("Dataset2").join("png"),
        }
    }
}

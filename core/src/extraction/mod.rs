pub mod metrics;
pub mod numeric;
pub mod ultrasound;
pub mod yolo;

pub use metrics::{find_metrics_files, load_metrics_file, split_side_key, METRICS_FILE_NAME};
pub use numeric::{parse_age_to_months, parse_numeric_str, parse_numeric_value};
pub use ultrasound::{load_ultrasound_record, load_ultrasound_records, UltrasoundRecord};
pub use yolo::{load_pose_labels, parse_pose_labels, parse_pose_line};

use serde::Serialize;

/// Keypoint visibility flag from a YOLO pose label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Not labeled (flag 0, or anything non-positive)
    Hidden,
    /// Labeled but occluded (flag 1)
    Occluded,
    /// Labeled and visible (flag 2 and above)
    Visible,
}

impl Visibility {
    /// Converts the integer flag stored in a label file
    pub fn from_flag(flag: i64) -> Self {
        match flag {
            f if f <= 0 => Visibility::Hidden,
            1 => Visibility::Occluded,
            _ => Visibility::Visible,
        }
    }

    /// Returns whether the keypoint carries a position
    pub fn is_labeled(&self) -> bool {
        !matches!(self, Visibility::Hidden)
    }
}

/// Normalized coordinate to pixels, kept within one image size of the edges
fn scale_to_pixels(value: f64, size: u32) -> i32 {
    let size = size as f64;
    (value * size).clamp(-size, 2.0 * size) as i32
}

/// Single keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub visibility: Visibility,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, visibility: Visibility) -> Self {
        Self { x, y, visibility }
    }

    /// Pixel position for an image of the given size
    pub fn to_pixels(&self, width: u32, height: u32) -> (i32, i32) {
        (scale_to_pixels(self.x, width), scale_to_pixels(self.y, height))
    }
}

/// Bounding box in normalized YOLO form (center + size)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// Pixel corners `(x1, y1, x2, y2)` for an image of the given size
    pub fn to_pixels(&self, width: u32, height: u32) -> (i32, i32, i32, i32) {
        (
            scale_to_pixels(self.x_center - self.width / 2.0, width),
            scale_to_pixels(self.y_center - self.height / 2.0, height),
            scale_to_pixels(self.x_center + self.width / 2.0, width),
            scale_to_pixels(self.y_center + self.height / 2.0, height),
        )
    }
}

/// One annotated object from a YOLO pose label file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub class_id: u32,
    pub bbox: BoundingBox,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Keypoints that carry a position (visibility > 0)
    pub fn labeled_keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().filter(|k| k.visibility.is_labeled())
    }

    /// Horizontal and vertical extent of the labeled keypoints
    ///
    /// Returns `None` when fewer than two keypoints are labeled.
    pub fn keypoint_extent(&self) -> Option<(f64, f64)> {
        let mut count = 0usize;
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);

        for k in self.labeled_keypoints() {
            count += 1;
            min_x = min_x.min(k.x);
            max_x = max_x.max(k.x);
            min_y = min_y.min(k.y);
            max_y = max_y.max(k.y);
        }

        if count < 2 {
            return None;
        }
        Some((max_x - min_x, max_y - min_y))
    }
}

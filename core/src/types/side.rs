use serde::{Deserialize, Serialize};
use std::fmt;

/// Hip side a measurement or image refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    /// Unsided value, or a record covering both hips
    #[default]
    Both,
}

impl Side {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Both => "both",
        }
    }

    /// Returns the key suffix used by sided metric names (`ace_index_left`)
    pub fn key_suffix(&self) -> Option<&'static str> {
        match self {
            Side::Left => Some("_left"),
            Side::Right => Some("_right"),
            Side::Both => None,
        }
    }

    /// Returns the column prefix used by the ultrasound sheets (`R Alpha Angle`)
    pub fn column_prefix(&self) -> Option<&'static str> {
        match self {
            Side::Left => Some("L"),
            Side::Right => Some("R"),
            Side::Both => None,
        }
    }

    /// Parses side from string
    ///
    /// Accepts "left"/"l" and "right"/"r" in any case; anything else is `Both`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Side::Left,
            "right" | "r" => Side::Right,
            _ => Side::Both,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|s| Side::from_str(&s)).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_str() {
        assert_eq!(Side::from_str("left"), Side::Left);
        assert_eq!(Side::from_str("RIGHT"), Side::Right);
        assert_eq!(Side::from_str(" l "), Side::Left);
        assert_eq!(Side::from_str("r"), Side::Right);
        assert_eq!(Side::from_str(""), Side::Both);
        assert_eq!(Side::from_str("bilateral"), Side::Both);
    }

    #[test]
    fn test_side_ordering() {
        let mut sides = vec![Side::Right, Side::Left];
        sides.sort();
        assert_eq!(sides, vec![Side::Left, Side::Right]);
    }

    #[test]
    fn test_side_deserialize() {
        let side: Side = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(side, Side::Left);
        let side: Side = serde_json::from_str("null").unwrap();
        assert_eq!(side, Side::Both);
    }
}

use crate::analysis::stats::{mean, min_max};
use crate::extraction::{parse_age_to_months, UltrasoundRecord};
use crate::types::Side;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const BREECH: &str = "Breech?";
pub const PATIENT_ID: &str = "RadID";
pub const ALPHA_ANGLE: &str = "Alpha Angle";
pub const BETA_ANGLE: &str = "Beta Angle";
pub const COVERAGE: &str = "Coverage";
pub const GRAF_TYPE: &str = "Graf Type";

/// Age of the patient in months, if the sheet has a parseable age
pub fn age_months(record: &UltrasoundRecord) -> Option<f64> {
    record
        .get_string_value(AGE)
        .and_then(|age| parse_age_to_months(&age))
}

/// Values of a sided measurement for one side across records
pub fn sided_values(records: &[UltrasoundRecord], side: Side, column: &str) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.get_sided_numeric(side, column))
        .collect()
}

/// Graf types of the hip each image actually shows
///
/// Records without a left/right side, or without that side's Graf type, are
/// left out.
pub fn correct_side_graf_types(records: &[UltrasoundRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get_sided_string(r.side, GRAF_TYPE))
        .collect()
}

/// Occurrences per value, most common first (ties by value)
pub fn value_counts(values: &[String]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(v, c)| (v.to_string(), c))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Headline statistics of the Radiopedia ultrasound dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiopediaSummary {
    pub total_images: usize,
    pub unique_patients: usize,
    pub age_range_months: Option<(f64, f64)>,
    pub mean_age_months: Option<f64>,
    pub male: usize,
    pub female: usize,
    /// Share of breech presentations among records with a known answer
    pub breech_percent: f64,
    /// Share of records with a known breech answer
    pub breech_available_percent: f64,
    pub alpha_completeness: f64,
    pub beta_completeness: f64,
    pub coverage_completeness: f64,
    pub graf_counts: Vec<(String, usize)>,
    pub alpha_range: Option<(f64, f64)>,
    pub beta_range: Option<(f64, f64)>,
}

impl RadiopediaSummary {
    /// Computes the summary over all records
    pub fn from_records(records: &[UltrasoundRecord]) -> Self {
        let total = records.len();

        // Absent IDs count as one patient
        let patients: BTreeSet<Option<String>> = records
            .iter()
            .map(|r| r.get_string_value(PATIENT_ID))
            .collect();

        let ages: Vec<f64> = records.iter().filter_map(age_months).collect();

        let genders: Vec<String> = records
            .iter()
            .filter_map(|r| r.get_string_value(GENDER))
            .collect();

        let breech: Vec<String> = records
            .iter()
            .filter_map(|r| r.get_string_value(BREECH))
            .collect();
        let breech_yes = breech.iter().filter(|b| b.as_str() == "Y").count();

        let both_sides = |column: &str| -> Vec<f64> {
            let mut values = sided_values(records, Side::Right, column);
            values.extend(sided_values(records, Side::Left, column));
            values
        };
        let alpha = both_sides(ALPHA_ANGLE);
        let beta = both_sides(BETA_ANGLE);
        let coverage = both_sides(COVERAGE);

        Self {
            total_images: total,
            unique_patients: patients.len(),
            age_range_months: min_max(&ages),
            mean_age_months: mean(&ages),
            male: genders.iter().filter(|g| g.as_str() == "M").count(),
            female: genders.iter().filter(|g| g.as_str() == "F").count(),
            breech_percent: percent(breech_yes, breech.len()),
            breech_available_percent: percent(breech.len(), total),
            alpha_completeness: percent(alpha.len(), total * 2),
            beta_completeness: percent(beta.len(), total * 2),
            coverage_completeness: percent(coverage.len(), total * 2),
            graf_counts: value_counts(&correct_side_graf_types(records)),
            alpha_range: min_max(&alpha),
            beta_range: min_max(&beta),
        }
    }

    pub fn male_percent(&self) -> f64 {
        percent(self.male, self.total_images)
    }

    pub fn female_percent(&self) -> f64 {
        percent(self.female, self.total_images)
    }

    /// Most frequent Graf type and its count
    pub fn most_common_graf(&self) -> Option<(&str, usize)> {
        self.graf_counts.first().map(|(g, c)| (g.as_str(), *c))
    }

    /// Text of the dataset summary panel, one entry per line
    pub fn summary_lines(&self) -> Vec<String> {
        let age_range = match self.age_range_months {
            Some((lo, hi)) => format!("{:.1} - {:.1} months", lo, hi),
            None => "n/a".to_string(),
        };
        let mean_age = match self.mean_age_months {
            Some(m) => format!("{:.1} months", m),
            None => "n/a".to_string(),
        };

        vec![
            "Dataset Summary:".to_string(),
            String::new(),
            format!("Total Images: {}", self.total_images),
            format!("Unique Patients: {}", self.unique_patients),
            format!("Age Range: {}", age_range),
            format!("Mean Age: {}", mean_age),
            String::new(),
            "Gender Distribution:".to_string(),
            format!("Male: {} ({:.1}%)", self.male, self.male_percent()),
            format!("Female: {} ({:.1}%)", self.female, self.female_percent()),
            String::new(),
            format!(
                "Breech Presentation: {:.1}% (of known cases)",
                self.breech_percent
            ),
            format!("Breech Data Available: {:.1}%", self.breech_available_percent),
            String::new(),
            "Data Completeness:".to_string(),
            format!("Alpha Angles: {:.1}%", self.alpha_completeness),
            format!("Beta Angles: {:.1}%", self.beta_completeness),
            format!("Coverage: {:.1}%", self.coverage_completeness),
            format!("Breech: {:.1}%", self.breech_available_percent),
        ]
    }
}

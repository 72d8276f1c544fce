use std::collections::BTreeSet;

/// Default ACE index ceiling for the MTDDH snapshot
pub const DEFAULT_ACE_LIMIT: f64 = 80.0;

/// Configuration for selecting MTDDH rows before plotting
///
/// All filters use hard exclusion - rows that don't match are removed from the
/// plotted table. Rows above the ACE limit are reported before removal.
///
/// # Example
///
/// ```
/// use hipaudit_core::SnapshotFilter;
///
/// let filter = SnapshotFilter::default()
///     .exclude_group('x')
///     .with_ace_limit(75.0);
///
/// assert!(filter.excluded_groups.contains(&'x'));
/// assert!(filter.excluded_groups.contains(&'i'));
/// assert_eq!(filter.ace_limit, 75.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotFilter {
    /// Folder group letters (lowercase) whose rows are left out
    pub excluded_groups: BTreeSet<char>,

    /// Rows with an ACE index above this value are reported and removed
    pub ace_limit: f64,
}

impl Default for SnapshotFilter {
    fn default() -> Self {
        Self {
            excluded_groups: ['i', 'z'].into_iter().collect(),
            ace_limit: DEFAULT_ACE_LIMIT,
        }
    }
}

impl SnapshotFilter {
    /// Creates a filter that keeps every folder group and has no ACE ceiling
    ///
    /// Rows without an ACE index are still never plotted.
    pub fn permissive() -> Self {
        Self {
            excluded_groups: BTreeSet::new(),
            ace_limit: f64::INFINITY,
        }
    }

    /// Builder: Exclude another folder group letter
    pub fn exclude_group(mut self, letter: char) -> Self {
        self.excluded_groups.insert(letter.to_ascii_lowercase());
        self
    }

    /// Builder: Set the ACE index ceiling
    pub fn with_ace_limit(mut self, limit: f64) -> Self {
        self.ace_limit = limit;
        self
    }

    /// Returns whether rows of this folder group are excluded
    pub fn is_group_excluded(&self, letter: Option<char>) -> bool {
        letter
            .map(|l| self.excluded_groups.contains(&l.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

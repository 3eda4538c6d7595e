//! Degree to screen-distance lookup.

use crate::error::Error;

/// Screen distance in meters for degrees 0.1, 0.2, ..., 1.5.
pub const DEFAULT_DISTANCES: [f64; 15] = [
    0.172, 0.344, 0.516, 0.688, 0.859, 1.031, 1.203, 1.375, 1.547, 1.719, 1.891, 2.063, 2.235,
    2.406, 2.578,
];

/// Target screen distance per degree, indexed in tenths of a degree.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    distances: Vec<f64>,
}

impl DistanceTable {
    /// Build a table whose entry `i` is the distance for degree `(i + 1) / 10`.
    pub fn new(distances: Vec<f64>) -> Self {
        Self { distances }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Table index for `degree`: degree 0.1 maps to 0.
    pub fn index_for(degree: f64) -> i64 {
        (degree * 10.0).round() as i64 - 1
    }

    /// Distance in meters at which the optotype subtends `degree`.
    ///
    /// # Errors
    ///
    /// [`Error::DistanceTableIndex`] if the degree falls outside the table.
    pub fn target_for(&self, degree: f64) -> Result<f64, Error> {
        let index = Self::index_for(degree);
        usize::try_from(index)
            .ok()
            .and_then(|i| self.distances.get(i).copied())
            .ok_or(Error::DistanceTableIndex { degree, index })
    }
}

impl Default for DistanceTable {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCES.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_for_rounds_tenths() {
        assert_eq!(DistanceTable::index_for(0.1), 0);
        assert_eq!(DistanceTable::index_for(0.7), 6);
        assert_eq!(DistanceTable::index_for(0.1 + 0.2), 2);
        assert_eq!(DistanceTable::index_for(1.5), 14);
    }

    #[test]
    fn test_target_out_of_table() {
        let table = DistanceTable::default();
        assert_eq!(table.target_for(0.1).unwrap(), 0.172);
        assert!(matches!(
            table.target_for(0.0),
            Err(Error::DistanceTableIndex { index: -1, .. })
        ));
        assert!(table.target_for(1.6).is_err());
    }
}

//! Min-max normalization.

/// Observed range of one metric across a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
}

impl MinMax {
    /// Range of the finite values in `values`, or `None` if there are none.
    #[must_use]
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| {
                Some(match acc {
                    None => Self { min: v, max: v },
                    Some(Self { min, max }) => Self {
                        min: min.min(v),
                        max: max.max(v),
                    },
                })
            })
    }

    /// Whether every observed value was equal.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.max - self.min <= 0.0
    }

    /// Rescales `value` to `[0, 1]`.
    ///
    /// Returns `degenerate_value` when the range has no spread.
    #[must_use]
    pub fn normalize(&self, value: f64, degenerate_value: f64) -> f64 {
        if self.is_degenerate() {
            return degenerate_value;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_maps_to_zero_and_max_to_one() {
        let range = MinMax::of([500.0, 1000.0, 2000.0]).unwrap();
        assert!(range.normalize(500.0, 0.0).abs() < f64::EPSILON);
        assert!((range.normalize(2000.0, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!((range.normalize(1250.0, 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equal_values_use_degenerate_value() {
        let range = MinMax::of([7.0, 7.0, 7.0]).unwrap();
        assert!(range.is_degenerate());
        assert!((range.normalize(7.0, 0.5) - 0.5).abs() < f64::EPSILON);
        assert!(!range.normalize(7.0, 0.0).is_nan());
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let range = MinMax::of([f64::NAN, 1.0, 3.0, f64::INFINITY]).unwrap();
        assert_eq!(range, MinMax { min: 1.0, max: 3.0 });
        assert_eq!(MinMax::of(std::iter::empty()), None);
    }
}

// Weight resolution
// Renormalizes the base weight table over the dimensions that are actually active

use crate::models::{Dimension, WeightTable};
use crate::services::detection::AnalysisError;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Tolerance for accepting a submitted weight table.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

const NORMALIZED_EPSILON: f64 = 1e-12;

#[derive(Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("missing weight for dimension: {0}")]
    MissingDimension(Dimension),
    #[error("weight for {dimension} must be finite and non-negative, got {value}")]
    InvalidWeight { dimension: Dimension, value: f64 },
    #[error("weights must sum to 1.0, got {0:.4}")]
    BadSum(f64),
}

/// Check a table submitted as the new base weights.
pub fn validate_weight_table(table: &WeightTable) -> Result<(), WeightError> {
    for dimension in Dimension::ALL {
        let value = table
            .get(dimension)
            .ok_or(WeightError::MissingDimension(dimension))?;
        if !value.is_finite() || value < 0.0 {
            return Err(WeightError::InvalidWeight { dimension, value });
        }
    }
    let sum: f64 = Dimension::ALL.iter().filter_map(|d| table.get(*d)).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(WeightError::BadSum(sum));
    }
    Ok(())
}

pub struct WeightResolver;

impl WeightResolver {
    /// Weights of `enabled` dimensions, rescaled to sum to 1.0.
    ///
    /// An already-normalized selection is returned unchanged. A selection whose
    /// base weights sum to zero falls back to equal weights.
    pub fn resolve(
        base: &WeightTable,
        enabled: &BTreeSet<Dimension>,
    ) -> Result<BTreeMap<Dimension, f64>, AnalysisError> {
        if enabled.is_empty() {
            return Err(AnalysisError::NoActiveDimensions);
        }

        let selected: BTreeMap<Dimension, f64> = enabled
            .iter()
            .map(|d| {
                let w = base.get(*d).filter(|w| w.is_finite() && *w > 0.0).unwrap_or(0.0);
                (*d, w)
            })
            .collect();
        let sum: f64 = selected.values().sum();

        if sum <= 0.0 {
            let equal = 1.0 / enabled.len() as f64;
            return Ok(enabled.iter().map(|d| (*d, equal)).collect());
        }
        if (sum - 1.0).abs() <= NORMALIZED_EPSILON {
            return Ok(selected);
        }
        Ok(selected.into_iter().map(|(d, w)| (d, w / sum)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> BTreeSet<Dimension> {
        Dimension::ALL.into_iter().collect()
    }

    #[test]
    fn test_resolve_full_default_is_noop() {
        let base = WeightTable::default();
        let resolved = WeightResolver::resolve(&base, &all()).unwrap();
        assert_eq!(&resolved, base.as_map());
    }

    #[test]
    fn test_resolve_single_dimension_gets_one() {
        let base = WeightTable::default();
        let enabled: BTreeSet<_> = [Dimension::Readability].into_iter().collect();
        let resolved = WeightResolver::resolve(&base, &enabled).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&Dimension::Readability], 1.0);
    }

    #[test]
    fn test_resolve_subset_sums_to_one() {
        let base = WeightTable::default();
        let enabled: BTreeSet<_> = [
            Dimension::Perplexity,
            Dimension::Burstiness,
            Dimension::LexicalRichness,
            Dimension::Readability,
        ]
        .into_iter()
        .collect();
        let resolved = WeightResolver::resolve(&base, &enabled).unwrap();
        assert_eq!(resolved.len(), 4);
        assert!((resolved.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(resolved[&Dimension::Perplexity] > resolved[&Dimension::Readability]);
    }

    #[test]
    fn test_resolve_empty_fails() {
        let err = WeightResolver::resolve(&WeightTable::default(), &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoActiveDimensions));
    }

    #[test]
    fn test_resolve_zero_weights_fall_back_to_equal() {
        let mut map = BTreeMap::new();
        for d in Dimension::ALL {
            map.insert(d, if d == Dimension::Perplexity { 1.0 } else { 0.0 });
        }
        let base = WeightTable::new(map);
        let enabled: BTreeSet<_> = [Dimension::Burstiness, Dimension::Readability].into_iter().collect();
        let resolved = WeightResolver::resolve(&base, &enabled).unwrap();
        assert_eq!(resolved[&Dimension::Burstiness], 0.5);
        assert_eq!(resolved[&Dimension::Readability], 0.5);
    }

    #[test]
    fn test_validate_weight_table() {
        assert!(validate_weight_table(&WeightTable::default()).is_ok());

        let mut map: BTreeMap<Dimension, f64> = WeightTable::default().as_map().clone();
        map.remove(&Dimension::Readability);
        assert_eq!(
            validate_weight_table(&WeightTable::new(map.clone())),
            Err(WeightError::MissingDimension(Dimension::Readability))
        );

        map.insert(Dimension::Readability, 0.5);
        assert!(matches!(
            validate_weight_table(&WeightTable::new(map.clone())),
            Err(WeightError::BadSum(_))
        ));

        map.insert(Dimension::Readability, -0.1);
        assert!(matches!(
            validate_weight_table(&WeightTable::new(map)),
            Err(WeightError::InvalidWeight { .. })
        ));
    }
}

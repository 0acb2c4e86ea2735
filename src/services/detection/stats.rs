// Numeric helpers and score transforms shared by the analyzers

use crate::services::config_store::{LinearBand, NaturalBand};
use crate::services::providers::ProviderError;

pub use crate::models::clamp_unit;

/// Round to `decimals` places.
pub fn round_f64(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Ratio guarded against a zero denominator.
pub fn safe_ratio(numer: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        numer as f64 / denom as f64
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(mu) = mean(values) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `σ/μ`; `None` for fewer than two values or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    if mu.abs() < f64::EPSILON {
        return None;
    }
    Some(std_dev(values) / mu)
}

/// `low` maps to 0, `high` to 1, clamped.
pub fn linear_score(value: f64, band: &LinearBand) -> f64 {
    let span = band.high - band.low;
    if span <= 0.0 {
        return 0.0;
    }
    clamp_unit((value - band.low) / span)
}

/// Distance outside the natural band, normalised per side. 0 inside the band.
pub fn v_band_score(value: f64, band: &NaturalBand) -> f64 {
    if value < band.low {
        clamp_unit((band.low - value) / band.low_span)
    } else if value > band.high {
        clamp_unit((value - band.high) / band.high_span)
    } else {
        0.0
    }
}

/// Saturating map of a non-negative magnitude onto [0, 1).
pub fn saturate(value: f64, scale: f64) -> f64 {
    if value <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    clamp_unit(1.0 - (-value / scale).exp())
}

/// Cosine similarity; zero-norm vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ProviderError> {
    if a.len() != b.len() {
        return Err(ProviderError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0))
}

/// Shannon entropy (nats) divided by `ln(total)`, so a distribution of
/// all-distinct items scores 1.
pub fn normalized_entropy<I: IntoIterator<Item = usize>>(counts: I, total: usize) -> f64 {
    if total < 2 {
        return 0.0;
    }
    let t = total as f64;
    let h = -counts
        .into_iter()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / t;
            p * p.ln()
        })
        .sum::<f64>();
    clamp_unit(h / t.ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_guards() {
        assert_eq!(coefficient_of_variation(&[5.0]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
        assert_eq!(coefficient_of_variation(&[10.0, 10.0, 10.0]), Some(0.0));
        let cv = coefficient_of_variation(&[5.0, 15.0]).unwrap();
        assert!((cv - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_v_band_score() {
        let band = NaturalBand { low: 0.2, high: 0.8, low_span: 0.2, high_span: 0.8 };
        assert_eq!(v_band_score(0.0, &band), 1.0);
        assert!((v_band_score(0.1, &band) - 0.5).abs() < 1e-12);
        assert_eq!(v_band_score(0.5, &band), 0.0);
        assert!((v_band_score(1.2, &band) - 0.5).abs() < 1e-12);
        assert_eq!(v_band_score(5.0, &band), 1.0);
    }

    #[test]
    fn test_linear_score_clamps() {
        let band = LinearBand { low: 0.4, high: 1.0 };
        assert_eq!(linear_score(0.1, &band), 0.0);
        assert_eq!(linear_score(1.5, &band), 1.0);
        assert!((linear_score(0.7, &band) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_normalized_entropy() {
        assert!((normalized_entropy([1, 1, 1, 1], 4) - 1.0).abs() < 1e-12);
        assert_eq!(normalized_entropy([4], 4), 0.0);
        assert_eq!(normalized_entropy([1], 1), 0.0);
    }

    #[test]
    fn test_saturate_and_ratio() {
        assert_eq!(saturate(0.0, 1.0), 0.0);
        assert!(saturate(10.0, 1.0) > 0.99);
        assert_eq!(safe_ratio(3, 0), 0.0);
        assert_eq!(round_f64(0.123456, 3), 0.123);
    }
}

use serde::Deserialize;

/// Element-wise closeness: `|observed - expected| <= atol + rtol * |expected|`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerance {
    pub const fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    /// NaN on either side is never close.
    pub fn is_close(&self, observed: f64, expected: f64) -> bool {
        (observed - expected).abs() <= self.atol + self.rtol * expected.abs()
    }

    /// Vectors of different length are never close.
    pub fn all_close(&self, observed: &[f64], expected: &[f64]) -> bool {
        observed.len() == expected.len()
            && observed
                .iter()
                .zip(expected)
                .all(|(o, e)| self.is_close(*o, *e))
    }
}

/// Rounding applied to reported values only, never to the comparison.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

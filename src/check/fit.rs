//! Least-squares model fitting for resource samples

/// Order of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    /// `y = c`
    Constant,
    /// `y = a + b * x`
    Linear,
}

impl ModelKind {
    /// Label used in change records
    pub fn label(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Linear => "linear",
        }
    }
}

/// A model fitted to `(x, y)` samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    /// Model order
    pub kind: ModelKind,
    /// Value at `x = 0`
    pub intercept: f64,
    /// Growth per unit of `x`, 0 for constant models
    pub slope: f64,
    /// Coefficient of determination, `None` with fewer than two distinct x values
    pub r_square: Option<f64>,
}

impl Fit {
    /// Model value at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Relative movement of the fitted line over the sampled range that makes it linear
const LINEAR_MOVEMENT: f64 = 0.05;

/// Fit the lowest-order model that describes the samples
///
/// The least-squares line is kept when it moves by more than 5% of the mean
/// across the sampled x range, otherwise the samples are treated as constant.
/// Returns `None` for an empty sample set.
///
/// # Examples
///
/// ```
/// use perfcheck::check::fit::{fit_best, ModelKind};
///
/// let growing = [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)];
/// let fit = fit_best(&growing).unwrap();
/// assert_eq!(fit.kind, ModelKind::Linear);
/// assert!((fit.slope - 10.0).abs() < 1e-9);
///
/// let flat = [(1.0, 10.0), (2.0, 10.0), (3.0, 10.0)];
/// assert_eq!(fit_best(&flat).unwrap().kind, ModelKind::Constant);
/// ```
pub fn fit_best(samples: &[(f64, f64)]) -> Option<Fit> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (min_x, max_x) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
            (lo.min(*x), hi.max(*x))
        });

    let ss_tot: f64 = samples.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let constant = Fit {
        kind: ModelKind::Constant,
        intercept: mean_y,
        slope: 0.0,
        r_square: None,
    };

    if max_x <= min_x {
        return Some(constant);
    }

    let sxx: f64 = samples.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = samples
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let movement = (slope * (max_x - min_x)).abs();
    if movement > LINEAR_MOVEMENT * mean_y.abs() && movement > f64::EPSILON {
        let ss_res: f64 = samples
            .iter()
            .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
            .sum();
        let r_square = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };
        return Some(Fit {
            kind: ModelKind::Linear,
            intercept,
            slope,
            r_square: Some(r_square.clamp(0.0, 1.0)),
        });
    }

    // share of the signal explained by the constant (uncentered R²)
    let ss_raw: f64 = samples.iter().map(|(_, y)| y.powi(2)).sum();
    let r_square = if ss_tot == 0.0 || ss_raw == 0.0 {
        1.0
    } else {
        1.0 - ss_tot / ss_raw
    };
    Some(Fit {
        r_square: Some(r_square.clamp(0.0, 1.0)),
        ..constant
    })
}

//! Scalar functions of time for boundary values and source rates.

use plume_core::ConfigError;

/// A scalar function of physical time.
///
/// Implemented for [`Constant`], [`Tabular`] and any
/// `Fn(f64) -> f64 + Send + Sync` closure.
pub trait TimeFunction: Send + Sync {
    /// Value at time `t`.
    fn value(&self, t: f64) -> f64;
}

impl<F> TimeFunction for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

/// A time-independent value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant(pub f64);

impl TimeFunction for Constant {
    fn value(&self, _t: f64) -> f64 {
        self.0
    }
}

/// How a [`Tabular`] function varies between two breakpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabularForm {
    /// Linear interpolation.
    Linear,
    /// Hold the left breakpoint's value.
    Constant,
}

/// A piecewise function through `(times[i], values[i])`.
///
/// Interval `i` spans `[times[i], times[i+1])` and follows `forms[i]`.
/// Before the first breakpoint the first value holds; from the last
/// breakpoint on the last value holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Tabular {
    times: Vec<f64>,
    values: Vec<f64>,
    forms: Vec<TabularForm>,
}

impl Tabular {
    /// Build a tabular function.
    ///
    /// Returns `Err` unless there is at least one breakpoint, `times` is
    /// strictly increasing and finite, `values` has the same length, and
    /// `forms` has one entry per interval.
    pub fn new(
        times: Vec<f64>,
        values: Vec<f64>,
        forms: Vec<TabularForm>,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: "boundary conditions",
            reason,
        };
        if times.is_empty() || times.len() != values.len() {
            return Err(invalid(format!(
                "tabular function needs matching non-empty times and values, got {} and {}",
                times.len(),
                values.len()
            )));
        }
        if forms.len() + 1 != times.len() {
            return Err(invalid(format!(
                "tabular function needs {} forms, got {}",
                times.len() - 1,
                forms.len()
            )));
        }
        if times.iter().any(|t| !t.is_finite()) || times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid(
                "tabular times must be finite and strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            times,
            values,
            forms,
        })
    }

    /// Tabular function with the same form on every interval.
    pub fn uniform(times: Vec<f64>, values: Vec<f64>, form: TabularForm) -> Result<Self, ConfigError> {
        let forms = vec![form; times.len().saturating_sub(1)];
        Self::new(times, values, forms)
    }
}

impl TimeFunction for Tabular {
    fn value(&self, t: f64) -> f64 {
        let n = self.times.len();
        if t < self.times[0] {
            return self.values[0];
        }
        if t >= self.times[n - 1] {
            return self.values[n - 1];
        }
        let i = self.times.partition_point(|&x| x <= t) - 1;
        match self.forms[i] {
            TabularForm::Constant => self.values[i],
            TabularForm::Linear => {
                let (t0, t1) = (self.times[i], self.times[i + 1]);
                let (v0, v1) = (self.values[i], self.values[i + 1]);
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            }
        }
    }
}

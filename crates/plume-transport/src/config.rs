//! Transport configuration, its builder, and parameter-list parsing.
//!
//! [`TransportConfig`] is validated once at setup. It can be assembled with
//! [`TransportConfig::builder`] or read from an ordered [`ParameterList`]
//! using the keys in [`keys`].

use std::fmt;

use indexmap::IndexMap;
use plume_core::ConfigError;

/// Parameter-list keys understood by [`TransportConfig::from_params`].
pub mod keys {
    /// Spatial discretization order, `1` or `2`.
    pub const SPATIAL_ORDER: &str = "spatial discretization order";
    /// Temporal discretization order, `1` or `2`.
    pub const TEMPORAL_ORDER: &str = "temporal discretization order";
    /// CFL safety factor in `(0, 1]`.
    pub const CFL: &str = "CFL";
    /// `"transient"` or `"steady"`.
    pub const FLOW_MODE: &str = "flow mode";
    /// `"Barth-Jespersen"` or `"Tensorial"`.
    pub const LIMITER: &str = "advection limiter";
    /// `"yes"` or `"no"`.
    pub const INTERNAL_TESTS: &str = "enable internal tests";
    /// Relative tolerance of the internal checks.
    pub const TOLERANCE: &str = "internal tests tolerance";
    /// Ceiling on the stable step.
    pub const MAX_TIME_STEP: &str = "maximum time step";
    /// Stable step reported for stagnant flow.
    pub const LARGE_TIME_STEP: &str = "large time step";
}

/// Sentinel step for stagnant flow.
pub const LARGE_TIME_STEP: f64 = 1e+99;

// ── enums ──────────────────────────────────────────────────────────

/// Spatial accuracy of the face values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpatialOrder {
    /// Upwind cell averages.
    First,
    /// Limited linear reconstruction.
    Second,
}

/// Accuracy of the explicit time integrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalOrder {
    /// Forward Euler.
    First,
    /// Predictor-corrector.
    Second,
}

impl SpatialOrder {
    /// Numeric order.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl TemporalOrder {
    /// Numeric order.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

/// How often the flux field changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowMode {
    /// Flux may change between coupling steps; ghosts and the upwind map
    /// are refreshed on every advance.
    Transient,
    /// Flux is fixed after the first advance.
    Steady,
}

/// Gradient limiter used by second-order schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimiterKind {
    /// One coefficient per cell.
    BarthJespersen,
    /// One coefficient per cell and spatial direction.
    Tensorial,
}

// ── ParameterList ──────────────────────────────────────────────────

/// A typed value in a [`ParameterList`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Double(f64),
    /// Boolean value.
    Bool(bool),
    /// String value.
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Ordered key/value parameters, as handed over by an input parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterList {
    entries: IndexMap<String, ParamValue>,
}

impl ParameterList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter.
    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn int(&self, key: &'static str) -> Result<Option<i64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(type_error(key, "an integer", other)),
        }
    }

    fn double(&self, key: &'static str) -> Result<Option<f64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Double(v)) => Ok(Some(*v)),
            Some(ParamValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(type_error(key, "a number", other)),
        }
    }

    fn string(&self, key: &'static str) -> Result<Option<&str>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Str(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(type_error(key, "a string", other)),
        }
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(v)) => Ok(Some(*v)),
            Some(ParamValue::Str(s)) if s == "yes" => Ok(Some(true)),
            Some(ParamValue::Str(s)) if s == "no" => Ok(Some(false)),
            Some(other) => Err(type_error(key, "\"yes\" or \"no\"", other)),
        }
    }
}

fn type_error(key: &'static str, expected: &str, got: &ParamValue) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: format!("expected {expected}, got {got}"),
    }
}

// ── TransportConfig ────────────────────────────────────────────────

/// Validated transport settings.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportConfig {
    /// Spatial order. Default: first.
    pub spatial_order: SpatialOrder,
    /// Temporal order. Default: first.
    pub temporal_order: TemporalOrder,
    /// Safety factor applied to the stable step. Default: 1.0.
    pub cfl: f64,
    /// Ceiling on the stable step. Default: [`LARGE_TIME_STEP`].
    pub max_time_step: f64,
    /// Step reported when no cell constrains the bound.
    /// Default: [`LARGE_TIME_STEP`].
    pub large_time_step: f64,
    /// Flux update frequency. Default: transient.
    pub flow_mode: FlowMode,
    /// Limiter for second-order schemes. Default: tensorial.
    pub limiter: LimiterKind,
    /// Make check violations and missing inflow data fatal. Default: off.
    pub internal_checks: bool,
    /// Tolerance of the internal checks. Default: 1e-6.
    pub check_tolerance: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            spatial_order: SpatialOrder::First,
            temporal_order: TemporalOrder::First,
            cfl: 1.0,
            max_time_step: LARGE_TIME_STEP,
            large_time_step: LARGE_TIME_STEP,
            flow_mode: FlowMode::Transient,
            limiter: LimiterKind::Tensorial,
            internal_checks: false,
            check_tolerance: 1e-6,
        }
    }
}

impl TransportConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read a configuration from a parameter list. Missing keys keep their
    /// defaults; unknown keys are ignored.
    pub fn from_params(params: &ParameterList) -> Result<Self, ConfigError> {
        let mut b = Self::builder();
        if let Some(order) = params.int(keys::SPATIAL_ORDER)? {
            b = b.spatial_order(parse_order(keys::SPATIAL_ORDER, order)?.0);
        }
        if let Some(order) = params.int(keys::TEMPORAL_ORDER)? {
            b = b.temporal_order(parse_order(keys::TEMPORAL_ORDER, order)?.1);
        }
        if let Some(cfl) = params.double(keys::CFL)? {
            b = b.cfl(cfl);
        }
        if let Some(mode) = params.string(keys::FLOW_MODE)? {
            b = b.flow_mode(match mode {
                "transient" => FlowMode::Transient,
                "steady" | "stationary" => FlowMode::Steady,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: keys::FLOW_MODE,
                        reason: format!("unknown flow mode \"{other}\""),
                    })
                }
            });
        }
        if let Some(limiter) = params.string(keys::LIMITER)? {
            b = b.limiter(match limiter {
                "Barth-Jespersen" => LimiterKind::BarthJespersen,
                "Tensorial" => LimiterKind::Tensorial,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: keys::LIMITER,
                        reason: format!("unknown limiter \"{other}\""),
                    })
                }
            });
        }
        if let Some(on) = params.flag(keys::INTERNAL_TESTS)? {
            b = b.internal_checks(on);
        }
        if let Some(tol) = params.double(keys::TOLERANCE)? {
            b = b.check_tolerance(tol);
        }
        if let Some(dt) = params.double(keys::MAX_TIME_STEP)? {
            b = b.max_time_step(dt);
        }
        if let Some(dt) = params.double(keys::LARGE_TIME_STEP)? {
            b = b.large_time_step(dt);
        }
        b.build()
    }
}

fn parse_order(key: &'static str, order: i64) -> Result<(SpatialOrder, TemporalOrder), ConfigError> {
    match order {
        1 => Ok((SpatialOrder::First, TemporalOrder::First)),
        2 => Ok((SpatialOrder::Second, TemporalOrder::Second)),
        other => Err(ConfigError::InvalidValue {
            key,
            reason: format!("order must be 1 or 2, got {other}"),
        }),
    }
}

/// Builder for [`TransportConfig`].
#[derive(Clone, Debug)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Set the spatial order.
    pub fn spatial_order(mut self, order: SpatialOrder) -> Self {
        self.config.spatial_order = order;
        self
    }

    /// Set the temporal order.
    pub fn temporal_order(mut self, order: TemporalOrder) -> Self {
        self.config.temporal_order = order;
        self
    }

    /// Set the CFL factor. Must lie in `(0, 1]`.
    pub fn cfl(mut self, cfl: f64) -> Self {
        self.config.cfl = cfl;
        self
    }

    /// Set the stable-step ceiling. Must be > 0.
    pub fn max_time_step(mut self, dt: f64) -> Self {
        self.config.max_time_step = dt;
        self
    }

    /// Set the stagnant-flow sentinel. Must be finite and > 0.
    pub fn large_time_step(mut self, dt: f64) -> Self {
        self.config.large_time_step = dt;
        self
    }

    /// Set the flow mode.
    pub fn flow_mode(mut self, mode: FlowMode) -> Self {
        self.config.flow_mode = mode;
        self
    }

    /// Set the limiter.
    pub fn limiter(mut self, limiter: LimiterKind) -> Self {
        self.config.limiter = limiter;
        self
    }

    /// Enable or disable internal checks.
    pub fn internal_checks(mut self, on: bool) -> Self {
        self.config.internal_checks = on;
        self
    }

    /// Set the internal-check tolerance. Must be finite and >= 0.
    pub fn check_tolerance(mut self, tol: f64) -> Self {
        self.config.check_tolerance = tol;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - first-order space is combined with second-order time
    /// - `cfl` is outside `(0, 1]`
    /// - either step limit is not > 0, or the sentinel is not finite
    /// - the tolerance is negative or not finite
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        let c = self.config;
        if c.spatial_order == SpatialOrder::First && c.temporal_order == TemporalOrder::Second {
            return Err(ConfigError::UnsupportedCombination {
                key: keys::TEMPORAL_ORDER,
                spatial: c.spatial_order.as_u32(),
                temporal: c.temporal_order.as_u32(),
            });
        }
        if !(c.cfl > 0.0 && c.cfl <= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: keys::CFL,
                reason: format!("must lie in (0, 1], got {}", c.cfl),
            });
        }
        if !(c.max_time_step > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: keys::MAX_TIME_STEP,
                reason: format!("must be > 0, got {}", c.max_time_step),
            });
        }
        if !(c.large_time_step.is_finite() && c.large_time_step > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: keys::LARGE_TIME_STEP,
                reason: format!("must be finite and > 0, got {}", c.large_time_step),
            });
        }
        if !(c.check_tolerance.is_finite() && c.check_tolerance >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: keys::TOLERANCE,
                reason: format!("must be finite and >= 0, got {}", c.check_tolerance),
            });
        }
        Ok(c)
    }
}

use std::fmt;

/// Error taxonomy for the planning core.
///
/// Tree-arena mutators fail loudly: `debug_assert!` in debug builds, an
/// explicit `InvariantViolation` in release. The planner either fills a
/// fresh plan completely or returns an error without touching the previous
/// contingency plan.
#[derive(Debug, Clone)]
pub enum SpicompError {
    /// A tree operation would break a structural invariant: unknown frame
    /// id, duplicated child option, dangling parent link, and so on.
    InvariantViolation(String),
    /// A drone could not reach its assigned pixel within the kinematic
    /// bound (`MAX_DRONE_FLIGHT_DISTANCE_PER_FRAME` per frame step).
    PlanInfeasible(String),
    /// A configuration value was missing or failed to parse.
    ConfigError(String),
    /// Reserved: the PRNG never exhausts in this design, so this variant is
    /// never constructed. Kept so the taxonomy matches the design doc.
    #[allow(dead_code)]
    RngExhausted(String),
}

impl fmt::Display for SpicompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpicompError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            SpicompError::PlanInfeasible(msg) => write!(f, "plan infeasible: {msg}"),
            SpicompError::ConfigError(msg) => write!(f, "config error: {msg}"),
            SpicompError::RngExhausted(msg) => write!(f, "rng exhausted: {msg}"),
        }
    }
}

impl std::error::Error for SpicompError {}

pub type Result<T> = std::result::Result<T, SpicompError>;

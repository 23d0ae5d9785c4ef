use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{kind} period #{index} has start age {start_age} after end age {end_age}")]
    InvalidPeriod {
        kind: &'static str,
        index: usize,
        start_age: u32,
        end_age: u32,
    },

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },

    #[error("{field} must be >= 0, got {value}")]
    NegativeAmount { field: String, value: f64 },

    #[error("safe withdrawal rate must be > 0, got {0}")]
    NonPositiveSwr(f64),

    #[error("combined federal + state tax rate must be in [0, 1), got {0}")]
    TaxRateOutOfRange(f64),

    #[error("asset allocations must sum to 1, got {0}")]
    AllocationSum(f64),

    #[error("birth date {birth} is after the simulation start date {start}")]
    BirthAfterStart { birth: String, start: String },

    #[error("retirement age {retirement_age} exceeds life expectancy {life_expectancy}")]
    RetirementAfterLifeExpectancy {
        retirement_age: u32,
        life_expectancy: u32,
    },

    #[error("life expectancy {life_expectancy} exceeds the maximum of {max}")]
    LifeExpectancyOutOfRange { life_expectancy: u32, max: u32 },

    #[error("Monte Carlo standard deviation must be >= 0, got {0}")]
    NegativeStdDev(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("number of Monte Carlo runs must be > 0")]
    NoRuns,

    #[error("number of Monte Carlo runs {requested} exceeds the limit of {limit}")]
    TooManyRuns { requested: u32, limit: u32 },

    #[error("projection horizon is empty: no months between start date and life expectancy")]
    EmptyHorizon,

    #[error("non-finite {field} at age {age}")]
    NonFinite { field: &'static str, age: u32 },

    #[error("simulation cancelled after {completed_runs} runs")]
    Cancelled { completed_runs: u32 },

    #[error("cannot compute a quantile of an empty sample")]
    EmptySample,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

pub type EngineResult<T> = Result<T, EngineError>;

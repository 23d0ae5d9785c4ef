mod calendar;
mod engine;
mod error;
mod milestones;
mod monte_carlo;
mod periods;
mod portfolio;
mod stats;
#[cfg(test)]
mod test_support;
mod types;
mod validate;
mod withdrawal;

pub use engine::project;
pub use error::{ConfigurationError, EngineError, EngineResult, SimulationError};
pub use milestones::{BucketSplit, Milestones, summarize_milestones};
pub use monte_carlo::{
    CancellationToken, MAX_ANNUAL_RETURN, MIN_ANNUAL_RETURN, run_monte_carlo,
    run_monte_carlo_cancellable, run_monte_carlo_with_rng,
};
pub use periods::{Period, active, resolve};
pub use portfolio::{CONTRIBUTION_TAX_DEFERRED_SHARE, CONTRIBUTION_TAXABLE_SHARE, PortfolioState};
pub use stats::{median, quantile};
pub use types::{
    AdditionalIncomeEvent, AdditionalIncomeKind, AssetClass, ExpenseFrequency, ExpenseKind,
    ExpensePeriod, Growth, IncomePeriod, IrregularExpense, MonteCarloConfig, MonteCarloResult,
    MonthlyCompounding, PercentileBand, ReportingMode, ReturnAssumptions, SavingsAmount,
    SavingsPeriod, SimulationConfig, SocialSecurity, Snapshot, StartingBalances,
};
pub use validate::{
    MAX_LIFE_EXPECTANCY, MAX_MONTE_CARLO_RUNS, validate_config, validate_monte_carlo,
};
pub use withdrawal::{Withdrawal, fixed_gross, solve_for_net};

//! Monte Carlo projection.
//!
//! Each run replays the deterministic month flow with a pre-retirement return
//! drawn once per simulated year. Runs stop the first month the portfolio is
//! exhausted; the survivors and the cross-run balance distribution per
//! reported age are aggregated afterwards.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info};

use super::engine::ProjectionContext;
use super::error::{EngineResult, SimulationError};
use super::portfolio::PortfolioState;
use super::stats::{median, quantile_in_place};
use super::types::{MonteCarloConfig, MonteCarloResult, PercentileBand, SimulationConfig};
use super::validate::{validate_config, validate_monte_carlo};

pub const MIN_ANNUAL_RETURN: f64 = -0.95;
pub const MAX_ANNUAL_RETURN: f64 = 2.5;

/// Runs between two cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 64;

/// Cooperative cancellation shared between a caller and a running simulation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
struct RunOutcome {
    survived: bool,
    ending_balance: f64,
    trajectory: Vec<f64>,
}

/// Box–Muller over a uniform source, keeping the second value of each pair.
#[derive(Debug, Default)]
struct NormalDraws {
    cached: Option<f64>,
}

impl NormalDraws {
    fn standard_normal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if let Some(z) = self.cached.take() {
            return z;
        }

        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached = Some(r * theta.sin());
        r * theta.cos()
    }
}

fn sample_annual_return<R: Rng + ?Sized>(
    mc: &MonteCarloConfig,
    normals: &mut NormalDraws,
    rng: &mut R,
) -> f64 {
    let z = normals.standard_normal(rng);
    (mc.mean_return + mc.std_dev * z).clamp(MIN_ANNUAL_RETURN, MAX_ANNUAL_RETURN)
}

fn derive_seed(base_seed: u64, run: u32) -> u64 {
    splitmix64(base_seed ^ ((run as u64) << 32) ^ run as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Whole-year ages at which each run records its balance. Month 0 is either
/// the today row or the first simulated month.
fn reported_ages(ctx: &ProjectionContext<'_>) -> Vec<u32> {
    (0..=ctx.horizon_months)
        .step_by(12)
        .map(|month| (ctx.age_in_months(month) / 12) as u32)
        .collect()
}

fn simulate_run<R: Rng + ?Sized>(
    ctx: &ProjectionContext<'_>,
    mc: &MonteCarloConfig,
    points: usize,
    rng: &mut R,
) -> Result<RunOutcome, SimulationError> {
    let config = ctx.config;
    let post_retirement_rate = config.returns.post_retirement / 12.0;
    let mut normals = NormalDraws::default();
    let mut portfolio = PortfolioState::from_starting(&config.balances);
    let mut trajectory = Vec::with_capacity(points);
    if config.include_today_row {
        trajectory.push(portfolio.total());
    }

    let mut ever_positive = portfolio.total() > 0.0;
    let mut cumulative_inflation = 1.0;
    let mut monthly_return = 0.0;
    let first_month = ctx.first_month();
    for month in first_month..=ctx.horizon_months {
        if month > 0 && month % 12 == 0 {
            cumulative_inflation *= 1.0 + config.inflation_rate;
        }
        if (month - first_month) % 12 == 0 {
            let annual = sample_annual_return(mc, &mut normals, rng);
            monthly_return = mc.compounding.monthly_rate(annual);
        }

        let flows = ctx.month_flows(month, cumulative_inflation);
        let rate = if flows.age < config.retirement_age {
            monthly_return
        } else {
            post_retirement_rate
        };
        flows.apply(&mut portfolio, rate);

        let total = portfolio.total();
        if !total.is_finite() {
            return Err(SimulationError::NonFinite {
                field: "totalInvestments",
                age: flows.age,
            });
        }
        if total <= 0.0 && (flows.age >= config.retirement_age || ever_positive) {
            trajectory.resize(points, 0.0);
            return Ok(RunOutcome {
                survived: false,
                ending_balance: 0.0,
                trajectory,
            });
        }
        ever_positive |= total > 0.0;

        if month % 12 == 0 {
            trajectory.push(total);
        }
    }

    Ok(RunOutcome {
        survived: true,
        ending_balance: portfolio.total(),
        trajectory,
    })
}

fn prepare<'a>(
    config: &'a SimulationConfig,
    mc: &MonteCarloConfig,
) -> EngineResult<ProjectionContext<'a>> {
    validate_config(config)?;
    validate_monte_carlo(mc)?;
    Ok(ProjectionContext::new(config)?)
}

/// Runs `mc.num_runs` independent simulations and aggregates them.
pub fn run_monte_carlo(
    config: &SimulationConfig,
    mc: &MonteCarloConfig,
) -> EngineResult<(MonteCarloResult, Vec<PercentileBand>)> {
    run_monte_carlo_cancellable(config, mc, &CancellationToken::new())
}

/// [`run_monte_carlo`], stopping with [`SimulationError::Cancelled`] once
/// `token` is cancelled.
///
/// Every run draws from its own `Pcg64Mcg` seeded from the base seed and the
/// run index, so a seeded call returns the same result whether or not the
/// runs execute in parallel.
pub fn run_monte_carlo_cancellable(
    config: &SimulationConfig,
    mc: &MonteCarloConfig,
    token: &CancellationToken,
) -> EngineResult<(MonteCarloResult, Vec<PercentileBand>)> {
    let ctx = prepare(config, mc)?;
    let base_seed = mc.seed.unwrap_or_else(rand::random);
    let ages = reported_ages(&ctx);
    info!(
        runs = mc.num_runs,
        seed = base_seed,
        mean_return = mc.mean_return,
        std_dev = mc.std_dev,
        "running Monte Carlo simulation"
    );

    let completed = AtomicU32::new(0);
    let run_one = |run: u32| -> Result<RunOutcome, SimulationError> {
        if run % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return Err(SimulationError::Cancelled {
                completed_runs: completed.load(Ordering::Relaxed),
            });
        }
        let mut rng = Pcg64Mcg::seed_from_u64(derive_seed(base_seed, run));
        let outcome = simulate_run(&ctx, mc, ages.len(), &mut rng)?;
        completed.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<RunOutcome> = (0..mc.num_runs)
        .into_par_iter()
        .map(run_one)
        .collect::<Result<_, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<RunOutcome> = (0..mc.num_runs)
        .map(run_one)
        .collect::<Result<_, _>>()?;

    Ok(aggregate(&outcomes, &ages)?)
}

/// Sequential runs that all draw from one injected random source.
pub fn run_monte_carlo_with_rng<R: Rng + ?Sized>(
    config: &SimulationConfig,
    mc: &MonteCarloConfig,
    rng: &mut R,
) -> EngineResult<(MonteCarloResult, Vec<PercentileBand>)> {
    let ctx = prepare(config, mc)?;
    let ages = reported_ages(&ctx);
    let outcomes: Vec<RunOutcome> = (0..mc.num_runs)
        .map(|_| simulate_run(&ctx, mc, ages.len(), &mut *rng))
        .collect::<Result<_, _>>()?;
    Ok(aggregate(&outcomes, &ages)?)
}

fn aggregate(
    outcomes: &[RunOutcome],
    ages: &[u32],
) -> Result<(MonteCarloResult, Vec<PercentileBand>), SimulationError> {
    let num_runs = outcomes.len() as u32;
    let survived_runs = outcomes.iter().filter(|o| o.survived).count() as u32;
    let endings: Vec<f64> = outcomes.iter().map(|o| o.ending_balance).collect();

    let result = MonteCarloResult {
        success_rate: survived_runs as f64 / num_runs as f64 * 100.0,
        median_ending_balance: median(&endings)?,
        min_ending_balance: endings.iter().copied().fold(f64::INFINITY, f64::min),
        max_ending_balance: endings.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        num_runs,
        survived_runs,
    };

    let mut column = Vec::with_capacity(outcomes.len());
    let mut bands = Vec::with_capacity(ages.len());
    for (index, &age) in ages.iter().enumerate() {
        column.clear();
        column.extend(outcomes.iter().filter_map(|o| o.trajectory.get(index)));
        bands.push(PercentileBand {
            age,
            p10: quantile_in_place(&mut column, 0.10)?,
            p50: quantile_in_place(&mut column, 0.50)?,
            p90: quantile_in_place(&mut column, 0.90)?,
        });
    }

    debug!(
        runs = num_runs,
        survived = survived_runs,
        success_rate = result.success_rate,
        median_ending_balance = result.median_ending_balance,
        "Monte Carlo aggregation complete"
    );
    Ok((result, bands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::project;
    use crate::core::error::EngineError;
    use crate::core::test_support::{sample_config, zero_growth_config};
    use crate::core::types::{
        ExpenseKind, ExpensePeriod, MonthlyCompounding, ReportingMode, SavingsAmount,
    };

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn mc(mean_return: f64, std_dev: f64, num_runs: u32) -> MonteCarloConfig {
        MonteCarloConfig {
            mean_return,
            std_dev,
            num_runs,
            seed: Some(42),
            compounding: MonthlyCompounding::Geometric,
        }
    }

    #[test]
    fn zero_volatility_matches_deterministic_projection() {
        let mut config = sample_config();
        config.balances.total_override = Some(1_500_000.0);
        let rows = project(&config, ReportingMode::YearlyFromStart).expect("valid config");
        let deterministic_ending = rows.last().expect("rows").total_investments;

        let mut settings = mc(config.returns.effective(), 0.0, 5);
        settings.compounding = MonthlyCompounding::Simple;
        let (result, bands) = run_monte_carlo(&config, &settings).expect("valid config");

        assert_approx_tol(result.success_rate, 100.0, 1e-12);
        assert_approx_tol(
            result.median_ending_balance,
            deterministic_ending,
            deterministic_ending * 1e-9,
        );
        assert_eq!(bands.len(), rows.len());
        for (band, row) in bands.iter().zip(&rows) {
            assert_eq!(band.age, row.age_years);
            let tol = row.total_investments.max(1.0) * 1e-9;
            assert_approx_tol(band.p50, row.total_investments, tol);
        }
    }

    #[test]
    fn simulated_month_zero_lines_up_with_projection_rows() {
        let mut config = sample_config();
        config.include_today_row = false;
        config.balances.total_override = Some(1_500_000.0);
        let rows = project(&config, ReportingMode::YearlyFromStart).expect("valid config");

        let mut settings = mc(config.returns.effective(), 0.0, 3);
        settings.compounding = MonthlyCompounding::Simple;
        let (_, bands) = run_monte_carlo(&config, &settings).expect("valid config");

        assert_eq!(bands.len(), rows.len());
        assert_eq!(bands[0].age, 34);
        for (band, row) in bands.iter().zip(&rows) {
            assert_eq!(band.age, row.age_years);
            let tol = row.total_investments.max(1.0) * 1e-9;
            assert_approx_tol(band.p50, row.total_investments, tol);
        }
    }

    #[test]
    fn overflowing_balances_surface_as_errors() {
        let mut config = zero_growth_config();
        config.savings_periods[0].amount = SavingsAmount::Dollar(f64::MAX);

        let err = run_monte_carlo(&config, &mc(0.0, 0.0, 4))
            .expect_err("contributions overflow within two years");
        assert!(matches!(
            err,
            EngineError::Simulation(SimulationError::NonFinite {
                field: "totalInvestments",
                ..
            })
        ));

        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let err = run_monte_carlo_with_rng(&config, &mc(0.0, 0.0, 4), &mut rng)
            .expect_err("same overflow with an injected source");
        assert!(matches!(
            err,
            EngineError::Simulation(SimulationError::NonFinite { .. })
        ));
    }

    #[test]
    fn guaranteed_income_always_succeeds() {
        let mut config = zero_growth_config();
        config.retirement_age = 38;
        config.social_security.start_age = 38;
        config.social_security.monthly_amount = 3_000.0;
        config.expense_periods = vec![ExpensePeriod {
            start_age: 35,
            end_age: 40,
            kind: ExpenseKind::Fixed {
                annual_amount: 30_000.0,
            },
        }];

        let (result, _) = run_monte_carlo(&config, &mc(0.07, 0.5, 200)).expect("valid config");
        assert_eq!(result.survived_runs, 200);
        assert_approx_tol(result.success_rate, 100.0, 1e-12);
    }

    #[test]
    fn depleted_runs_fail_and_report_zero_afterwards() {
        let mut config = zero_growth_config();
        config.retirement_age = 35;
        config.savings_periods.clear();
        config.expense_periods = vec![ExpensePeriod {
            start_age: 35,
            end_age: 40,
            kind: ExpenseKind::Fixed {
                annual_amount: 60_000.0,
            },
        }];

        let (result, bands) = run_monte_carlo(&config, &mc(0.07, 0.15, 50)).expect("valid");
        assert_eq!(result.survived_runs, 0);
        assert_approx_tol(result.success_rate, 0.0, 1e-12);
        assert_approx_tol(result.median_ending_balance, 0.0, 1e-12);
        assert_approx_tol(result.max_ending_balance, 0.0, 1e-12);

        assert_eq!(bands[0].age, 35);
        assert_approx_tol(bands[0].p50, 10_000.0, 1e-9);
        for band in &bands[1..] {
            assert_approx_tol(band.p90, 0.0, 1e-12);
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = sample_config();
        let settings = mc(0.07, 0.15, 300);
        let first = run_monte_carlo(&config, &settings).expect("valid config");
        let second = run_monte_carlo(&config, &settings).expect("valid config");
        assert_eq!(first, second);

        let other = run_monte_carlo(
            &config,
            &MonteCarloConfig {
                seed: Some(43),
                ..settings
            },
        )
        .expect("valid config");
        assert_ne!(first.1, other.1);
    }

    #[test]
    fn injected_rng_drives_every_draw() {
        let config = sample_config();
        let settings = mc(0.06, 0.12, 40);
        let a = run_monte_carlo_with_rng(&config, &settings, &mut Pcg64Mcg::seed_from_u64(9))
            .expect("valid config");
        let b = run_monte_carlo_with_rng(&config, &settings, &mut Pcg64Mcg::seed_from_u64(9))
            .expect("valid config");
        assert_eq!(a, b);
        assert_eq!(a.0.num_runs, 40);
    }

    #[test]
    fn bands_are_ordered_and_cover_every_reported_age() {
        let config = sample_config();
        let (_, bands) = run_monte_carlo(&config, &mc(0.07, 0.2, 200)).expect("valid config");
        // today row plus one point per year up to 90
        assert_eq!(bands.len(), 1 + (90 - 34));
        for pair in bands.windows(2) {
            assert_eq!(pair[1].age, pair[0].age + 1);
        }
        for band in &bands {
            assert!(band.p10 <= band.p50 && band.p50 <= band.p90);
        }
    }

    #[test]
    fn cancelled_token_stops_the_simulation() {
        let token = CancellationToken::new();
        token.cancel();
        let err = run_monte_carlo_cancellable(&sample_config(), &mc(0.07, 0.15, 1_000), &token)
            .expect_err("cancelled before the first run");
        assert!(matches!(
            err,
            EngineError::Simulation(SimulationError::Cancelled { .. })
        ));
    }

    #[test]
    fn zero_runs_is_rejected() {
        assert_eq!(
            run_monte_carlo(&sample_config(), &mc(0.07, 0.15, 0)),
            Err(EngineError::Simulation(SimulationError::NoRuns))
        );
    }

    #[test]
    fn sampled_returns_are_clamped() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let mut normals = NormalDraws::default();
        let wild = mc(0.0, 100.0, 1);
        for _ in 0..1_000 {
            let r = sample_annual_return(&wild, &mut normals, &mut rng);
            assert!((MIN_ANNUAL_RETURN..=MAX_ANNUAL_RETURN).contains(&r));
        }
    }

    #[test]
    fn standard_normal_has_unit_moments() {
        let mut rng = Pcg64Mcg::seed_from_u64(2024);
        let mut normals = NormalDraws::default();
        let n = 50_000;
        let draws: Vec<f64> = (0..n)
            .map(|_| normals.standard_normal(&mut rng))
            .collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert_approx_tol(mean, 0.0, 0.03);
        assert_approx_tol(var, 1.0, 0.05);
    }

    #[test]
    fn derive_seed_changes_per_run() {
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_ne!(derive_seed(42, 7), derive_seed(43, 7));
    }

    #[test]
    fn geometric_compounding_recovers_annual_rate() {
        let monthly = MonthlyCompounding::Geometric.monthly_rate(0.07);
        assert_approx_tol((1.0 + monthly).powi(12) - 1.0, 0.07, 1e-12);
        assert_approx_tol(MonthlyCompounding::Simple.monthly_rate(0.06), 0.005, 1e-15);
    }
}

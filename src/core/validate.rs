use tracing::warn;

use super::error::{ConfigurationError, SimulationError};
use super::periods::Period;
use super::types::{
    AdditionalIncomeKind, ExpenseKind, MonteCarloConfig, SavingsAmount, SimulationConfig,
};

/// Drift from 1.0 beyond which an asset mix is rejected outright.
pub const ALLOCATION_REJECT_TOLERANCE: f64 = 0.01;
/// Drift below which an asset mix is treated as exact.
const ALLOCATION_WARN_TOLERANCE: f64 = 1e-9;

/// Oldest age a projection may run to.
pub const MAX_LIFE_EXPECTANCY: u32 = 150;

/// Upper bound on Monte Carlo runs per call.
pub const MAX_MONTE_CARLO_RUNS: u32 = 1_000_000;

pub fn validate_config(config: &SimulationConfig) -> Result<(), ConfigurationError> {
    if config.birth_date > config.start_date {
        return Err(ConfigurationError::BirthAfterStart {
            birth: config.birth_date.to_string(),
            start: config.start_date.to_string(),
        });
    }

    if config.retirement_age > config.life_expectancy {
        return Err(ConfigurationError::RetirementAfterLifeExpectancy {
            retirement_age: config.retirement_age,
            life_expectancy: config.life_expectancy,
        });
    }

    if config.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(ConfigurationError::LifeExpectancyOutOfRange {
            life_expectancy: config.life_expectancy,
            max: MAX_LIFE_EXPECTANCY,
        });
    }

    for (name, rate) in [
        ("federalTaxRate", config.federal_tax_rate),
        ("stateTaxRate", config.state_tax_rate),
        ("inflationRate", config.inflation_rate),
        ("safeWithdrawalRate", config.safe_withdrawal_rate),
        ("returns.preRetirement", config.returns.pre_retirement),
        ("returns.postRetirement", config.returns.post_retirement),
    ] {
        finite(name, rate)?;
    }

    if config.safe_withdrawal_rate <= 0.0 {
        return Err(ConfigurationError::NonPositiveSwr(
            config.safe_withdrawal_rate,
        ));
    }

    let flat = config.flat_tax_rate();
    if config.federal_tax_rate < 0.0 || config.state_tax_rate < 0.0 || flat >= 1.0 {
        return Err(ConfigurationError::TaxRateOutOfRange(flat));
    }

    money("socialSecurity.monthlyAmount", config.social_security.monthly_amount)?;
    money("balances.taxable", config.balances.taxable)?;
    money("balances.taxDeferred", config.balances.tax_deferred)?;
    money("balances.taxFree", config.balances.tax_free)?;
    if let Some(total) = config.balances.total_override {
        money("balances.totalOverride", total)?;
    }
    if let Some(annual) = config.withdrawal_override_annual {
        money("withdrawalOverrideAnnual", annual)?;
    }

    validate_asset_mix(config)?;

    for (index, p) in config.income_periods.iter().enumerate() {
        check_range("income", index, p)?;
        money(&format!("incomePeriods[{index}].amount"), p.amount)?;
    }

    for (index, p) in config.savings_periods.iter().enumerate() {
        check_range("savings", index, p)?;
        let value = match p.amount {
            SavingsAmount::Dollar(v) | SavingsAmount::PercentOfTakeHome(v) => v,
        };
        money(&format!("savingsPeriods[{index}].amount"), value)?;
    }

    for (index, p) in config.expense_periods.iter().enumerate() {
        check_range("expense", index, p)?;
        let value = match p.kind {
            ExpenseKind::Fixed { annual_amount } => annual_amount,
            ExpenseKind::Replacement { rate } => rate,
        };
        money(&format!("expensePeriods[{index}]"), value)?;
    }

    for (index, event) in config.additional_income.iter().enumerate() {
        if let AdditionalIncomeKind::Annual { .. } = event.kind {
            check_range("additional income", index, event)?;
        }
        money(&format!("additionalIncome[{index}].amount"), event.amount)?;
    }

    for (index, expense) in config.irregular_expenses.iter().enumerate() {
        check_range("irregular expense", index, expense)?;
        money(&format!("irregularExpenses[{index}].amount"), expense.amount)?;
    }

    Ok(())
}

pub fn validate_monte_carlo(mc: &MonteCarloConfig) -> Result<(), super::error::EngineError> {
    finite("meanReturn", mc.mean_return)?;
    finite("stdDev", mc.std_dev)?;
    if mc.std_dev < 0.0 {
        return Err(ConfigurationError::NegativeStdDev(mc.std_dev).into());
    }
    if mc.num_runs == 0 {
        return Err(SimulationError::NoRuns.into());
    }
    if mc.num_runs > MAX_MONTE_CARLO_RUNS {
        return Err(SimulationError::TooManyRuns {
            requested: mc.num_runs,
            limit: MAX_MONTE_CARLO_RUNS,
        }
        .into());
    }
    Ok(())
}

fn validate_asset_mix(config: &SimulationConfig) -> Result<(), ConfigurationError> {
    if config.returns.asset_classes.is_empty() {
        return Ok(());
    }

    for asset in &config.returns.asset_classes {
        money(&format!("assetClasses[{}].allocation", asset.name), asset.allocation)?;
        finite(
            &format!("assetClasses[{}].expectedReturn", asset.name),
            asset.expected_return,
        )?;
    }

    let sum: f64 = config
        .returns
        .asset_classes
        .iter()
        .map(|a| a.allocation)
        .sum();
    let drift = (sum - 1.0).abs();
    if drift > ALLOCATION_REJECT_TOLERANCE {
        return Err(ConfigurationError::AllocationSum(sum));
    }
    if drift > ALLOCATION_WARN_TOLERANCE {
        warn!(allocation_sum = sum, "asset allocations do not sum exactly to 1");
    }
    Ok(())
}

fn check_range<P: Period>(
    kind: &'static str,
    index: usize,
    period: &P,
) -> Result<(), ConfigurationError> {
    if period.start_age() > period.end_age() {
        return Err(ConfigurationError::InvalidPeriod {
            kind,
            index,
            start_age: period.start_age(),
            end_age: period.end_age(),
        });
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() {
        return Err(ConfigurationError::NonFinite {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn money(field: &str, value: f64) -> Result<(), ConfigurationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigurationError::NegativeAmount {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

use tracing::{debug, info};

use super::calendar::{age_display, month_after, months_between};
use super::error::{EngineResult, SimulationError};
use super::periods::{Period, active, resolve};
use super::portfolio::PortfolioState;
use super::types::{
    AdditionalIncomeKind, ExpenseFrequency, ExpenseKind, ReportingMode, SavingsAmount,
    SimulationConfig, Snapshot,
};
use super::validate::validate_config;
use super::withdrawal::{Withdrawal, fixed_gross, solve_for_net};

/// Values derived once from a config and shared by every simulated month,
/// for both the deterministic and the Monte Carlo engine.
#[derive(Debug)]
pub(crate) struct ProjectionContext<'a> {
    pub config: &'a SimulationConfig,
    pub start_age_months: i64,
    pub horizon_months: i64,
    pub current_age: u32,
    pub effective_return: f64,
    pub flat_tax_rate: f64,
    retirement_base_income: f64,
    fire_at_retirement: f64,
}

/// Everything that happens to cash in one simulated month, monthly amounts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MonthFlows {
    pub age: u32,
    pub age_in_months: i64,
    pub adjusted_income: f64,
    pub take_home: f64,
    pub savings: f64,
    pub expenses: f64,
    pub social_security: f64,
    pub recurring_income: f64,
    pub one_time_income: f64,
    pub irregular_expenses: f64,
    pub withdrawal: Withdrawal,
}

impl MonthFlows {
    /// Growth, then contributions, then the withdrawal, then lump sums.
    pub fn apply(&self, portfolio: &mut PortfolioState, monthly_rate: f64) {
        portfolio.grow_at(monthly_rate);
        portfolio.contribute(self.savings);
        portfolio.withdraw_pro_rata(self.withdrawal.gross);
        portfolio.add_taxable(self.one_time_income);
        portfolio.charge_taxable(self.irregular_expenses);
    }
}

impl<'a> ProjectionContext<'a> {
    pub fn new(config: &'a SimulationConfig) -> Result<Self, SimulationError> {
        let start_age_months = months_between(config.birth_date, config.start_date);
        let horizon_months = config.life_expectancy as i64 * 12 - start_age_months;
        if horizon_months < 1 {
            return Err(SimulationError::EmptyHorizon);
        }

        let mut ctx = Self {
            config,
            start_age_months,
            horizon_months,
            current_age: (start_age_months / 12) as u32,
            effective_return: config.returns.effective(),
            flat_tax_rate: config.flat_tax_rate(),
            retirement_base_income: 0.0,
            fire_at_retirement: 0.0,
        };
        ctx.retirement_base_income = config
            .retirement_age
            .checked_sub(1)
            .map(|last_working_age| ctx.nominal_income(last_working_age))
            .unwrap_or(0.0);

        let years_to_retirement = config.retirement_age as i32 - ctx.current_age as i32;
        let retirement_expenses =
            ctx.todays_expenses() * (1.0 + config.inflation_rate).powi(years_to_retirement);
        ctx.fire_at_retirement = retirement_expenses / config.safe_withdrawal_rate;
        Ok(ctx)
    }

    /// Month 0 is simulated only when it is not reported as the today row.
    pub fn first_month(&self) -> i64 {
        if self.config.include_today_row { 1 } else { 0 }
    }

    pub fn age_in_months(&self, month: i64) -> i64 {
        self.start_age_months + month
    }

    pub fn fire_at_retirement(&self) -> f64 {
        self.fire_at_retirement
    }

    /// Sum of every income period covering `age`, before inflation.
    pub fn nominal_income(&self, age: u32) -> f64 {
        active(&self.config.income_periods, age)
            .map(|p| p.amount * p.growth.factor(age - p.start_age))
            .sum()
    }

    /// Income a replacement-rate expense is measured against: the live
    /// inflated income while working, then the last working year's nominal
    /// income.
    fn expense_base_income(&self, age: u32, cumulative_inflation: f64) -> f64 {
        if age < self.config.retirement_age {
            self.nominal_income(age) * cumulative_inflation
        } else {
            self.retirement_base_income
        }
    }

    /// Annual expenses at the current age in today's money.
    pub fn todays_expenses(&self) -> f64 {
        self.annual_expenses(self.current_age, 1.0)
    }

    fn annual_expenses(&self, age: u32, cumulative_inflation: f64) -> f64 {
        match resolve(&self.config.expense_periods, age).map(|p| p.kind) {
            Some(ExpenseKind::Fixed { annual_amount }) => annual_amount * cumulative_inflation,
            Some(ExpenseKind::Replacement { rate }) => {
                self.expense_base_income(age, cumulative_inflation) * rate * cumulative_inflation
            }
            None => 0.0,
        }
    }

    pub fn fire_number(&self, annual_expenses: f64) -> f64 {
        annual_expenses / self.config.safe_withdrawal_rate
    }

    /// Balance needed at `age` to reach the retirement FIRE number by growth
    /// alone at the pre-retirement effective return.
    pub fn coast_fire(&self, age: u32) -> f64 {
        let years = self.config.retirement_age as i32 - age as i32;
        self.fire_at_retirement / (1.0 + self.effective_return).powi(years)
    }

    pub fn deterministic_monthly_rate(&self, age: u32) -> f64 {
        if age < self.config.retirement_age {
            self.effective_return / 12.0
        } else {
            self.config.returns.post_retirement / 12.0
        }
    }

    pub fn is_reporting_month(&self, month: i64, mode: ReportingMode) -> bool {
        match mode {
            ReportingMode::YearlyFromStart => month % 12 == 0,
            ReportingMode::CalendarJanuary => month_after(self.config.start_date, month).1 == 1,
        }
    }

    /// Income, savings, expenses and the withdrawal for simulated `month`.
    pub fn month_flows(&self, month: i64, cumulative_inflation: f64) -> MonthFlows {
        let config = self.config;
        let age_in_months = self.age_in_months(month);
        let age = (age_in_months / 12) as u32;
        let retired = age >= config.retirement_age;
        let on_birthday = age_in_months % 12 == 0;

        let adjusted_income = if retired {
            0.0
        } else {
            self.nominal_income(age) * cumulative_inflation
        };
        let federal_tax = adjusted_income * config.federal_tax_rate;
        let state_tax = adjusted_income * config.state_tax_rate;
        let take_home = adjusted_income - federal_tax - state_tax;

        let savings = match resolve(&config.savings_periods, age) {
            Some(period) if !retired => match period.amount {
                SavingsAmount::PercentOfTakeHome(pct) => take_home * pct / 12.0,
                SavingsAmount::Dollar(amount) => {
                    let grown = amount * period.growth.factor(age - period.start_age);
                    if period.growth.is_compounding() {
                        grown * cumulative_inflation / 12.0
                    } else {
                        grown / 12.0
                    }
                }
            },
            _ => 0.0,
        };

        let expenses = self.annual_expenses(age, cumulative_inflation) / 12.0;

        let social_security = if age >= config.social_security.start_age {
            config.social_security.monthly_amount * cumulative_inflation
        } else {
            0.0
        };

        let mut recurring_income = 0.0;
        let mut one_time_income = 0.0;
        for event in &config.additional_income {
            match event.kind {
                AdditionalIncomeKind::Annual { .. } if event.contains(age) => {
                    recurring_income += event.amount * cumulative_inflation / 12.0;
                }
                AdditionalIncomeKind::OneTime { age: at, inflate } if at == age && on_birthday => {
                    one_time_income += if inflate {
                        event.amount * cumulative_inflation
                    } else {
                        event.amount
                    };
                }
                _ => {}
            }
        }

        let irregular_expenses = if on_birthday {
            config
                .irregular_expenses
                .iter()
                .filter(|e| match e.frequency {
                    ExpenseFrequency::OneTime => e.start_age == age,
                    ExpenseFrequency::Annual => e.contains(age),
                })
                .map(|e| {
                    if e.inflate {
                        e.amount * cumulative_inflation
                    } else {
                        e.amount
                    }
                })
                .sum()
        } else {
            0.0
        };

        let withdrawal = if !retired {
            Withdrawal::default()
        } else if let Some(annual) = config.withdrawal_override_annual {
            fixed_gross(annual / 12.0, self.flat_tax_rate)
        } else {
            solve_for_net(
                expenses - social_security - recurring_income,
                self.flat_tax_rate,
            )
        };

        MonthFlows {
            age,
            age_in_months,
            adjusted_income,
            take_home,
            savings,
            expenses,
            social_security,
            recurring_income,
            one_time_income,
            irregular_expenses,
            withdrawal,
        }
    }
}

/// Deterministic month-by-month projection from the start date to life
/// expectancy, reported at `mode` boundaries.
///
/// Month 0 is the start date. With the today row it is reported unprojected
/// and months `1..=horizon` are simulated; without it month 0 is simulated
/// too and reported like any other month. Balances clamp at zero and the
/// loop never stops early.
pub fn project(config: &SimulationConfig, mode: ReportingMode) -> EngineResult<Vec<Snapshot>> {
    validate_config(config)?;
    let ctx = ProjectionContext::new(config)?;
    info!(
        horizon_months = ctx.horizon_months,
        current_age = ctx.current_age,
        ?mode,
        "running deterministic projection"
    );

    let mut portfolio = PortfolioState::from_starting(&config.balances);
    let mut snapshots = Vec::with_capacity(ctx.horizon_months as usize / 12 + 2);
    if config.include_today_row {
        snapshots.push(checked(today_snapshot(&ctx, &portfolio))?);
    }

    let mut cumulative_inflation = 1.0;
    for month in ctx.first_month()..=ctx.horizon_months {
        if month > 0 && month % 12 == 0 {
            cumulative_inflation *= 1.0 + config.inflation_rate;
        }
        let flows = ctx.month_flows(month, cumulative_inflation);
        flows.apply(&mut portfolio, ctx.deterministic_monthly_rate(flows.age));

        if ctx.is_reporting_month(month, mode) {
            let year = month_after(config.start_date, month).0;
            snapshots.push(checked(month_snapshot(&ctx, &flows, &portfolio, year))?);
        }
    }

    debug!(
        rows = snapshots.len(),
        ending_balance = portfolio.total(),
        "projection complete"
    );
    Ok(snapshots)
}

fn today_snapshot(ctx: &ProjectionContext<'_>, portfolio: &PortfolioState) -> Snapshot {
    let config = ctx.config;
    let income = if ctx.current_age < config.retirement_age {
        ctx.nominal_income(ctx.current_age)
    } else {
        0.0
    };
    let expenses = ctx.todays_expenses();
    Snapshot {
        age: age_display(ctx.start_age_months),
        age_years: ctx.current_age,
        year: config.start_date.year(),
        annual_income: income,
        take_home_pay: income * (1.0 - ctx.flat_tax_rate),
        annual_expenses: expenses,
        annual_savings: 0.0,
        total_investments: portfolio.total(),
        fire_number: ctx.fire_number(expenses),
        coast_fire: ctx.coast_fire(ctx.current_age),
        additional_income: 0.0,
        retirement_income: 0.0,
        social_security_income: 0.0,
        withdrawals: 0.0,
        taxes_on_withdrawals: 0.0,
        taxable: portfolio.taxable(),
        tax_deferred: portfolio.tax_deferred(),
        tax_free: portfolio.tax_free(),
    }
}

fn month_snapshot(
    ctx: &ProjectionContext<'_>,
    flows: &MonthFlows,
    portfolio: &PortfolioState,
    year: i16,
) -> Snapshot {
    let annual_expenses = flows.expenses * 12.0;
    let retirement_income =
        flows.social_security + flows.recurring_income + flows.withdrawal.net();
    Snapshot {
        age: age_display(flows.age_in_months),
        age_years: flows.age,
        year,
        annual_income: flows.adjusted_income,
        take_home_pay: flows.take_home,
        annual_expenses,
        annual_savings: flows.savings * 12.0,
        total_investments: portfolio.total(),
        fire_number: ctx.fire_number(annual_expenses),
        coast_fire: ctx.coast_fire(flows.age),
        additional_income: flows.recurring_income * 12.0 + flows.one_time_income,
        retirement_income: retirement_income * 12.0,
        social_security_income: flows.social_security * 12.0,
        withdrawals: flows.withdrawal.gross * 12.0,
        taxes_on_withdrawals: flows.withdrawal.tax * 12.0,
        taxable: portfolio.taxable(),
        tax_deferred: portfolio.tax_deferred(),
        tax_free: portfolio.tax_free(),
    }
}

fn checked(snapshot: Snapshot) -> Result<Snapshot, SimulationError> {
    let fields = [
        ("annualIncome", snapshot.annual_income),
        ("takeHomePay", snapshot.take_home_pay),
        ("annualExpenses", snapshot.annual_expenses),
        ("annualSavings", snapshot.annual_savings),
        ("totalInvestments", snapshot.total_investments),
        ("fireNumber", snapshot.fire_number),
        ("coastFire", snapshot.coast_fire),
        ("additionalIncome", snapshot.additional_income),
        ("retirementIncome", snapshot.retirement_income),
        ("socialSecurityIncome", snapshot.social_security_income),
        ("withdrawals", snapshot.withdrawals),
        ("taxesOnWithdrawals", snapshot.taxes_on_withdrawals),
    ];
    if let Some((field, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(SimulationError::NonFinite {
            field,
            age: snapshot.age_years,
        });
    }
    Ok(snapshot)
}

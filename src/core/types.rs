use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Growth {
    #[default]
    Fixed,
    #[serde(alias = "growth")]
    Compounding { rate: f64 },
}

impl Growth {
    /// Multiplier after `years` whole years of growth.
    pub fn factor(self, years: u32) -> f64 {
        match self {
            Growth::Fixed => 1.0,
            Growth::Compounding { rate } => (1.0 + rate).powi(years as i32),
        }
    }

    pub fn is_compounding(self) -> bool {
        matches!(self, Growth::Compounding { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomePeriod {
    pub start_age: u32,
    pub end_age: u32,
    /// Annual gross income in today's money.
    pub amount: f64,
    #[serde(default)]
    pub growth: Growth,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum SavingsAmount {
    /// Annual dollar amount.
    Dollar(f64),
    /// Fraction of after-tax income, e.g. 0.25.
    #[serde(alias = "percent")]
    PercentOfTakeHome(f64),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPeriod {
    pub start_age: u32,
    pub end_age: u32,
    pub amount: SavingsAmount,
    #[serde(default)]
    pub growth: Growth,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExpenseKind {
    #[serde(rename_all = "camelCase")]
    Fixed { annual_amount: f64 },
    #[serde(alias = "replacement-rate")]
    Replacement { rate: f64 },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePeriod {
    pub start_age: u32,
    pub end_age: u32,
    #[serde(flatten)]
    pub kind: ExpenseKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AdditionalIncomeKind {
    #[serde(rename_all = "camelCase")]
    Annual { start_age: u32, end_age: u32 },
    #[serde(rename_all = "camelCase", alias = "one_time")]
    OneTime {
        age: u32,
        #[serde(default)]
        inflate: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalIncomeEvent {
    #[serde(default)]
    pub name: String,
    pub amount: f64,
    #[serde(flatten)]
    pub kind: AdditionalIncomeKind,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpenseFrequency {
    #[serde(alias = "one_time", alias = "oneTime")]
    OneTime,
    Annual,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrregularExpense {
    #[serde(default)]
    pub name: String,
    pub frequency: ExpenseFrequency,
    pub start_age: u32,
    pub end_age: u32,
    pub amount: f64,
    #[serde(default)]
    pub inflate: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetClass {
    pub name: String,
    pub allocation: f64,
    pub expected_return: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReturnAssumptions {
    /// Single pre-retirement rate, used when no asset classes are given.
    pub pre_retirement: f64,
    pub post_retirement: f64,
    pub asset_classes: Vec<AssetClass>,
}

impl Default for ReturnAssumptions {
    fn default() -> Self {
        Self {
            pre_retirement: 0.07,
            post_retirement: 0.04,
            asset_classes: Vec::new(),
        }
    }
}

impl ReturnAssumptions {
    /// Blended pre-retirement return.
    pub fn effective(&self) -> f64 {
        if self.asset_classes.is_empty() {
            self.pre_retirement
        } else {
            self.asset_classes
                .iter()
                .map(|a| a.allocation * a.expected_return)
                .sum()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartingBalances {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
    /// Replaces the three balances with a single taxable amount.
    pub total_override: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialSecurity {
    /// Monthly benefit in today's money.
    pub monthly_amount: f64,
    pub start_age: u32,
}

impl Default for SocialSecurity {
    fn default() -> Self {
        Self {
            monthly_amount: 0.0,
            start_age: 67,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub birth_date: Date,
    /// The "today" the projection starts from.
    pub start_date: Date,
    pub federal_tax_rate: f64,
    pub state_tax_rate: f64,
    pub inflation_rate: f64,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    #[serde(default)]
    pub social_security: SocialSecurity,
    pub safe_withdrawal_rate: f64,
    #[serde(default)]
    pub returns: ReturnAssumptions,
    #[serde(default)]
    pub balances: StartingBalances,
    #[serde(default)]
    pub income_periods: Vec<IncomePeriod>,
    #[serde(default)]
    pub savings_periods: Vec<SavingsPeriod>,
    #[serde(default)]
    pub expense_periods: Vec<ExpensePeriod>,
    #[serde(default)]
    pub additional_income: Vec<AdditionalIncomeEvent>,
    #[serde(default)]
    pub irregular_expenses: Vec<IrregularExpense>,
    /// Fixed annual portfolio withdrawal in retirement, bypassing the solver.
    #[serde(default)]
    pub withdrawal_override_annual: Option<f64>,
    #[serde(default = "default_true")]
    pub include_today_row: bool,
}

fn default_true() -> bool {
    true
}

impl SimulationConfig {
    pub fn flat_tax_rate(&self) -> f64 {
        self.federal_tax_rate + self.state_tax_rate
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportingMode {
    /// Every 12 simulated months from the start date.
    #[default]
    #[serde(alias = "yearly")]
    YearlyFromStart,
    /// Every calendar January.
    #[serde(alias = "january")]
    CalendarJanuary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub age: String,
    pub age_years: u32,
    pub year: i16,
    pub annual_income: f64,
    pub take_home_pay: f64,
    pub annual_expenses: f64,
    pub annual_savings: f64,
    pub total_investments: f64,
    pub fire_number: f64,
    pub coast_fire: f64,
    pub additional_income: f64,
    pub retirement_income: f64,
    pub social_security_income: f64,
    pub withdrawals: f64,
    pub taxes_on_withdrawals: f64,
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthlyCompounding {
    /// `(1 + r)^(1/12) - 1`
    #[default]
    Geometric,
    /// `r / 12`, matching the deterministic projection.
    Simple,
}

impl MonthlyCompounding {
    pub fn monthly_rate(self, annual: f64) -> f64 {
        match self {
            MonthlyCompounding::Geometric => (1.0 + annual).powf(1.0 / 12.0) - 1.0,
            MonthlyCompounding::Simple => annual / 12.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloConfig {
    pub mean_return: f64,
    pub std_dev: f64,
    pub num_runs: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub compounding: MonthlyCompounding,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    /// Percentage of runs that never depleted, 0..=100.
    pub success_rate: f64,
    pub median_ending_balance: f64,
    pub min_ending_balance: f64,
    pub max_ending_balance: f64,
    pub num_runs: u32,
    pub survived_runs: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub age: u32,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

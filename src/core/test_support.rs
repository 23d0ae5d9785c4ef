use jiff::civil::date;

use super::types::{
    ExpenseKind, ExpensePeriod, Growth, IncomePeriod, ReturnAssumptions, SavingsAmount,
    SavingsPeriod, SimulationConfig, SocialSecurity, StartingBalances,
};

/// A 34-year-old saving toward retirement at 65 with a 60k spend.
pub fn sample_config() -> SimulationConfig {
    SimulationConfig {
        birth_date: date(1991, 7, 13),
        start_date: date(2025, 7, 13),
        federal_tax_rate: 0.22,
        state_tax_rate: 0.05,
        inflation_rate: 0.03,
        retirement_age: 65,
        life_expectancy: 90,
        social_security: SocialSecurity {
            monthly_amount: 2_500.0,
            start_age: 67,
        },
        safe_withdrawal_rate: 0.04,
        returns: ReturnAssumptions {
            pre_retirement: 0.07,
            post_retirement: 0.04,
            asset_classes: Vec::new(),
        },
        balances: StartingBalances {
            taxable: 30_000.0,
            tax_deferred: 100_000.0,
            tax_free: 100_000.0,
            total_override: None,
        },
        income_periods: vec![IncomePeriod {
            start_age: 34,
            end_age: 64,
            amount: 170_000.0,
            growth: Growth::Fixed,
        }],
        savings_periods: vec![SavingsPeriod {
            start_age: 34,
            end_age: 64,
            amount: SavingsAmount::Dollar(25_000.0),
            growth: Growth::Fixed,
        }],
        expense_periods: vec![ExpensePeriod {
            start_age: 34,
            end_age: 90,
            kind: ExpenseKind::Fixed {
                annual_amount: 60_000.0,
            },
        }],
        additional_income: Vec::new(),
        irregular_expenses: Vec::new(),
        withdrawal_override_annual: None,
        include_today_row: true,
    }
}

/// Age 35 on 2025-01-01, retiring and dying at 40, with no returns,
/// inflation, taxes or expenses. Saves 12k a year into a 10k taxable start.
pub fn zero_growth_config() -> SimulationConfig {
    SimulationConfig {
        birth_date: date(1990, 1, 1),
        start_date: date(2025, 1, 1),
        federal_tax_rate: 0.0,
        state_tax_rate: 0.0,
        inflation_rate: 0.0,
        retirement_age: 40,
        life_expectancy: 40,
        social_security: SocialSecurity::default(),
        safe_withdrawal_rate: 0.04,
        returns: ReturnAssumptions {
            pre_retirement: 0.0,
            post_retirement: 0.0,
            asset_classes: Vec::new(),
        },
        balances: StartingBalances {
            taxable: 10_000.0,
            ..StartingBalances::default()
        },
        income_periods: vec![IncomePeriod {
            start_age: 30,
            end_age: 39,
            amount: 120_000.0,
            growth: Growth::Fixed,
        }],
        savings_periods: vec![SavingsPeriod {
            start_age: 35,
            end_age: 39,
            amount: SavingsAmount::Dollar(12_000.0),
            growth: Growth::Fixed,
        }],
        expense_periods: Vec::new(),
        additional_income: Vec::new(),
        irregular_expenses: Vec::new(),
        withdrawal_override_annual: None,
        include_today_row: true,
    }
}

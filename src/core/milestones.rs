use serde::Serialize;

use super::engine::ProjectionContext;
use super::error::EngineResult;
use super::types::{SimulationConfig, Snapshot};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSplit {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
}

/// Headline figures read off a projection.
///
/// Ages are whole years; `None` means the projection never reaches the
/// milestone (or has no row at retirement).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestones {
    pub current_age: u32,
    pub years_to_retirement: u32,
    pub fire_at_retirement: f64,
    pub coast_fire_today: f64,
    pub portfolio_at_retirement: Option<f64>,
    pub fire_achievable: bool,
    pub fire_age: Option<u32>,
    pub years_to_fire: Option<u32>,
    pub coast_fire_age: Option<u32>,
    pub years_to_coast_fire: Option<u32>,
    pub years_of_safe_withdrawals: Option<f64>,
    pub withdrawal_rate_at_retirement: Option<f64>,
    /// Largest peak-to-trough fall in total investments after retirement.
    pub max_drawdown: f64,
    pub buckets_at_retirement: Option<BucketSplit>,
}

pub fn summarize_milestones(
    config: &SimulationConfig,
    snapshots: &[Snapshot],
) -> EngineResult<Milestones> {
    let ctx = ProjectionContext::new(config)?;
    let current_age = ctx.current_age;
    let retirement_age = config.retirement_age;
    let fire_at_retirement = ctx.fire_at_retirement();

    let at_retirement = snapshots.iter().find(|s| s.age_years >= retirement_age);
    let portfolio_at_retirement = at_retirement.map(|s| s.total_investments);

    let fire_age = snapshots
        .iter()
        .find(|s| s.fire_number > 0.0 && s.total_investments >= s.fire_number)
        .map(|s| s.age_years);
    let coast_fire_age = snapshots
        .iter()
        .filter(|s| s.age_years < retirement_age)
        .find(|s| s.total_investments >= s.coast_fire)
        .map(|s| s.age_years);

    let years_of_safe_withdrawals = at_retirement
        .filter(|s| s.annual_expenses > 0.0)
        .map(|s| s.total_investments / s.annual_expenses);
    let withdrawal_rate_at_retirement = at_retirement
        .filter(|s| s.total_investments > 0.0)
        .map(|s| s.annual_expenses / s.total_investments);

    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;
    for s in snapshots.iter().filter(|s| s.age_years >= retirement_age) {
        peak = peak.max(s.total_investments);
        max_drawdown = max_drawdown.max(peak - s.total_investments);
    }

    Ok(Milestones {
        current_age,
        years_to_retirement: retirement_age.saturating_sub(current_age),
        fire_at_retirement,
        coast_fire_today: ctx.coast_fire(current_age),
        portfolio_at_retirement,
        fire_achievable: portfolio_at_retirement.is_some_and(|p| p >= fire_at_retirement),
        fire_age,
        years_to_fire: fire_age.map(|age| age.saturating_sub(current_age)),
        coast_fire_age,
        years_to_coast_fire: coast_fire_age.map(|age| age.saturating_sub(current_age)),
        years_of_safe_withdrawals,
        withdrawal_rate_at_retirement,
        max_drawdown,
        buckets_at_retirement: at_retirement.map(|s| BucketSplit {
            taxable: s.taxable,
            tax_deferred: s.tax_deferred,
            tax_free: s.tax_free,
        }),
    })
}

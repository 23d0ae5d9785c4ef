use super::types::StartingBalances;

/// Share of each new contribution routed to the tax-deferred bucket.
pub const CONTRIBUTION_TAX_DEFERRED_SHARE: f64 = 0.7;
/// Share of each new contribution routed to the taxable bucket.
pub const CONTRIBUTION_TAXABLE_SHARE: f64 = 0.3;

/// The three account buckets. Each balance stays >= 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioState {
    taxable: f64,
    tax_deferred: f64,
    tax_free: f64,
}

impl PortfolioState {
    pub fn new(taxable: f64, tax_deferred: f64, tax_free: f64) -> Self {
        Self {
            taxable: taxable.max(0.0),
            tax_deferred: tax_deferred.max(0.0),
            tax_free: tax_free.max(0.0),
        }
    }

    /// Opening balances; a total override lands entirely in taxable.
    pub fn from_starting(balances: &StartingBalances) -> Self {
        match balances.total_override {
            Some(total) => Self::new(total, 0.0, 0.0),
            None => Self::new(
                balances.taxable,
                balances.tax_deferred,
                balances.tax_free,
            ),
        }
    }

    pub fn taxable(&self) -> f64 {
        self.taxable
    }

    pub fn tax_deferred(&self) -> f64 {
        self.tax_deferred
    }

    pub fn tax_free(&self) -> f64 {
        self.tax_free
    }

    pub fn total(&self) -> f64 {
        self.taxable + self.tax_deferred + self.tax_free
    }

    /// Spread `amount` over the buckets by their current share of the total.
    /// Nothing happens when the portfolio is empty.
    pub fn apply_growth(&mut self, amount: f64) {
        let total = self.total();
        if total <= 0.0 {
            return;
        }
        self.taxable = (self.taxable + self.taxable / total * amount).max(0.0);
        self.tax_deferred = (self.tax_deferred + self.tax_deferred / total * amount).max(0.0);
        self.tax_free = (self.tax_free + self.tax_free / total * amount).max(0.0);
    }

    /// Growth at a monthly rate applied to the current total.
    pub fn grow_at(&mut self, monthly_rate: f64) {
        let amount = self.total() * monthly_rate;
        self.apply_growth(amount);
    }

    /// New savings under the fixed tax-deferred / taxable split.
    pub fn contribute(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        self.tax_deferred += amount * CONTRIBUTION_TAX_DEFERRED_SHARE;
        self.taxable += amount * CONTRIBUTION_TAXABLE_SHARE;
    }

    /// Take `amount` from all buckets in proportion to their balances.
    /// Returns what was actually removed, which is less than `amount` only
    /// when the portfolio runs dry.
    pub fn withdraw_pro_rata(&mut self, amount: f64) -> f64 {
        let total = self.total();
        if amount <= 0.0 || total <= 0.0 {
            return 0.0;
        }
        let ratio = (amount / total).min(1.0);
        self.taxable = (self.taxable - self.taxable * ratio).max(0.0);
        self.tax_deferred = (self.tax_deferred - self.tax_deferred * ratio).max(0.0);
        self.tax_free = (self.tax_free - self.tax_free * ratio).max(0.0);
        total - self.total()
    }

    pub fn add_taxable(&mut self, amount: f64) {
        self.taxable = (self.taxable + amount).max(0.0);
    }

    /// Charge an expense against the taxable bucket only, never below zero.
    pub fn charge_taxable(&mut self, amount: f64) {
        self.taxable = (self.taxable - amount).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn growth_is_split_by_current_share() {
        let mut p = PortfolioState::new(100.0, 300.0, 600.0);
        p.apply_growth(100.0);
        assert_approx(p.taxable(), 110.0);
        assert_approx(p.tax_deferred(), 330.0);
        assert_approx(p.tax_free(), 660.0);
    }

    #[test]
    fn growth_on_empty_portfolio_is_a_no_op() {
        let mut p = PortfolioState::default();
        p.grow_at(0.01);
        assert_approx(p.total(), 0.0);
    }

    #[test]
    fn contributions_follow_fixed_split() {
        let mut p = PortfolioState::default();
        p.contribute(1_000.0);
        assert_approx(p.tax_deferred(), 700.0);
        assert_approx(p.taxable(), 300.0);
        assert_approx(p.tax_free(), 0.0);
    }

    #[test]
    fn withdrawal_is_pro_rata_and_clamps_when_overdrawn() {
        let mut p = PortfolioState::new(100.0, 100.0, 200.0);
        let taken = p.withdraw_pro_rata(200.0);
        assert_approx(taken, 200.0);
        assert_approx(p.taxable(), 50.0);
        assert_approx(p.tax_deferred(), 50.0);
        assert_approx(p.tax_free(), 100.0);

        let taken = p.withdraw_pro_rata(1_000.0);
        assert_approx(taken, 200.0);
        assert_approx(p.total(), 0.0);
    }

    #[test]
    fn taxable_charge_never_goes_negative() {
        let mut p = PortfolioState::new(50.0, 500.0, 0.0);
        p.charge_taxable(80.0);
        assert_approx(p.taxable(), 0.0);
        assert_approx(p.tax_deferred(), 500.0);
    }

    #[test]
    fn total_override_lands_in_taxable() {
        let balances = StartingBalances {
            taxable: 10.0,
            tax_deferred: 20.0,
            tax_free: 30.0,
            total_override: Some(1_000.0),
        };
        let p = PortfolioState::from_starting(&balances);
        assert_approx(p.taxable(), 1_000.0);
        assert_approx(p.total(), 1_000.0);
    }

    proptest! {
        #[test]
        fn prop_flows_keep_buckets_non_negative_and_summed(
            taxable in 0.0f64..1e6,
            deferred in 0.0f64..1e6,
            free in 0.0f64..1e6,
            rate in -0.1f64..0.1,
            contribution in 0.0f64..1e5,
            withdrawal in 0.0f64..3e6,
            charge in 0.0f64..1e6
        ) {
            let mut p = PortfolioState::new(taxable, deferred, free);
            p.grow_at(rate);
            p.contribute(contribution);
            p.withdraw_pro_rata(withdrawal);
            p.charge_taxable(charge);

            prop_assert!(p.taxable() >= 0.0);
            prop_assert!(p.tax_deferred() >= 0.0);
            prop_assert!(p.tax_free() >= 0.0);
            let sum = p.taxable() + p.tax_deferred() + p.tax_free();
            prop_assert!((sum - p.total()).abs() <= 1e-6);
        }
    }
}

/// Gross portfolio withdrawal for one month and the tax it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Withdrawal {
    pub gross: f64,
    pub tax: f64,
}

impl Withdrawal {
    pub fn net(self) -> f64 {
        self.gross - self.tax
    }
}

/// Gross-up a net shortfall under a flat tax rate.
///
/// Solves `gross - gross * rate = shortfall`, so the withdrawal leaves exactly
/// `shortfall` after tax. A non-positive shortfall needs no withdrawal.
pub fn solve_for_net(shortfall: f64, flat_tax_rate: f64) -> Withdrawal {
    if shortfall <= 0.0 {
        return Withdrawal::default();
    }
    let gross = shortfall / (1.0 - flat_tax_rate);
    Withdrawal {
        gross,
        tax: gross * flat_tax_rate,
    }
}

/// A caller-fixed gross withdrawal taxed at the flat rate.
pub fn fixed_gross(gross: f64, flat_tax_rate: f64) -> Withdrawal {
    Withdrawal {
        gross,
        tax: gross * flat_tax_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn grosses_up_shortfall_at_flat_rate() {
        let w = solve_for_net(5_000.0, 0.27);
        assert_approx_tol(w.gross, 6_849.32, 0.01);
        assert_approx_tol(w.tax, 1_849.32, 0.01);
        assert_approx_tol(w.net(), 5_000.0, 1e-9);
    }

    #[test]
    fn covered_shortfall_needs_no_withdrawal() {
        assert_eq!(solve_for_net(0.0, 0.27), Withdrawal::default());
        assert_eq!(solve_for_net(-250.0, 0.27), Withdrawal::default());
    }

    #[test]
    fn fixed_gross_is_taxed_without_gross_up() {
        let w = fixed_gross(1_000.0, 0.25);
        assert_approx_tol(w.gross, 1_000.0, 1e-12);
        assert_approx_tol(w.tax, 250.0, 1e-12);
    }

    proptest! {
        #[test]
        fn prop_net_of_solved_withdrawal_matches_shortfall(
            shortfall in 0.01f64..1e6,
            rate in 0.0f64..0.9
        ) {
            let w = solve_for_net(shortfall, rate);
            prop_assert!((w.net() - shortfall).abs() <= 1e-6 * shortfall.max(1.0));
            prop_assert!(w.gross >= shortfall);
        }
    }
}

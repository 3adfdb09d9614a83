use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Relates the number of pending cells to the credit balance. One credit
/// pays for one saved cell.
pub struct CreditGate;

impl CreditGate {
    /// Fails with the exact deficit if `credits` cannot pay for `pending` cells.
    pub fn check(pending: usize, credits: u64) -> Result<()> {
        let needed = pending as u64;
        if credits < needed {
            return Err(EngineError::InsufficientCredits {
                needed,
                available: credits,
                deficit: Self::deficit(pending, credits),
            });
        }
        Ok(())
    }

    /// Credits missing to save `pending` cells, 0 if the balance suffices.
    pub fn deficit(pending: usize, credits: u64) -> u64 {
        (pending as u64).saturating_sub(credits)
    }

    /// Balance left after saving `pending` cells, `None` if unaffordable.
    pub fn balance_after(pending: usize, credits: u64) -> Option<u64> {
        credits.checked_sub(pending as u64)
    }
}

/// Price multiplier of a plan, relative to the payment fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier {
    pub numerator: u64,
    pub denominator: u64,
}

impl Multiplier {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self { numerator, denominator }
    }

    pub const fn whole(value: u64) -> Self {
        Self::new(value, 1)
    }

    /// `amount * self`, rounded down. A zero denominator yields zero.
    pub fn apply(&self, amount: u128) -> u128 {
        if self.denominator == 0 {
            return 0;
        }
        amount.saturating_mul(self.numerator as u128) / self.denominator as u128
    }
}

/// A purchasable credit bundle as published by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPlan {
    pub credits: u64,
    pub multiplier: Multiplier,
}

/// A plan priced in raw token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanQuote {
    pub credits: u64,
    pub per_credit: u128,
    pub price: u128,
    /// Saving per credit relative to the first plan, in whole percent.
    pub savings_pct: u32,
}

/// Prices every plan against the payment `fee`. The first plan is the
/// reference for the savings figure.
pub fn quote_plans(plans: &[CreditPlan], fee: u128) -> Vec<PlanQuote> {
    let mut quotes: Vec<PlanQuote> = plans
        .iter()
        .map(|plan| {
            let per_credit = plan.multiplier.apply(fee);
            PlanQuote {
                credits: plan.credits,
                per_credit,
                price: per_credit.saturating_mul(plan.credits as u128),
                savings_pct: 0,
            }
        })
        .collect();

    let Some(base) = quotes.first().map(|q| q.per_credit) else {
        return quotes;
    };
    if base == 0 {
        return quotes;
    }
    for quote in &mut quotes {
        let saving = (base as f64 - quote.per_credit as f64) / base as f64 * 100.0;
        quote.savings_pct = saving.round().max(0.0) as u32;
    }
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_reports_exact_deficit() {
        assert!(CreditGate::check(10, 10).is_ok());
        assert_eq!(
            CreditGate::check(12, 5),
            Err(EngineError::InsufficientCredits {
                needed: 12,
                available: 5,
                deficit: 7
            })
        );
        assert_eq!(CreditGate::deficit(12, 5), 7);
        assert_eq!(CreditGate::deficit(2, 5), 0);
    }

    #[test]
    fn balance_after_save() {
        assert_eq!(CreditGate::balance_after(3, 10), Some(7));
        assert_eq!(CreditGate::balance_after(11, 10), None);
    }

    #[test]
    fn quotes_compare_against_first_plan() {
        let plans = [
            CreditPlan {
                credits: 100,
                multiplier: Multiplier::whole(10),
            },
            CreditPlan {
                credits: 1000,
                multiplier: Multiplier::new(15, 2),
            },
            CreditPlan {
                credits: 10,
                multiplier: Multiplier::whole(12),
            },
        ];
        let quotes = quote_plans(&plans, 10_000);

        assert_eq!(quotes[0].per_credit, 100_000);
        assert_eq!(quotes[0].price, 10_000_000);
        assert_eq!(quotes[0].savings_pct, 0);

        assert_eq!(quotes[1].per_credit, 75_000);
        assert_eq!(quotes[1].price, 75_000_000);
        assert_eq!(quotes[1].savings_pct, 25);

        // More expensive than the base plan never shows a negative saving.
        assert_eq!(quotes[2].savings_pct, 0);
    }

    #[test]
    fn empty_plan_list() {
        assert!(quote_plans(&[], 10_000).is_empty());
    }
}

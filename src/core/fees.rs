//! Court fee tables.
//!
//! A [`FeeTable`] is an ordered list of half-open claim-value brackets
//! `[lower, upper)` starting at zero, the last one unbounded. The table is
//! checked once when built, so evaluating it can only fail on bad input.

use crate::domain::model::{FeeResult, Money};
use crate::utils::error::{DeadlineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeeFormula {
    Flat {
        amount: Money,
    },
    /// `basis_points` of the claim value (500 = 5%), rounded half-up to the
    /// penny and clamped to `cap`.
    Percentage {
        basis_points: u32,
        cap: Option<Money>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBracket {
    pub lower: Money,
    /// Exclusive. `None` only on the last bracket.
    pub upper: Option<Money>,
    pub formula: FeeFormula,
}

impl FeeBracket {
    fn contains(&self, value: Money) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value < upper)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeTable {
    brackets: Vec<FeeBracket>,
}

impl FeeTable {
    pub fn new(brackets: Vec<FeeBracket>) -> Result<Self> {
        let invalid = |message: String| Err(DeadlineError::InvalidFeeTable { message });

        let Some(first) = brackets.first() else {
            return invalid("table has no brackets".to_string());
        };
        if first.lower != Money::ZERO {
            return invalid(format!("first bracket starts at {}, not £0.00", first.lower));
        }

        for (index, bracket) in brackets.iter().enumerate() {
            let is_last = index + 1 == brackets.len();
            match (bracket.upper, is_last) {
                (None, false) => {
                    return invalid(format!("bracket {} is unbounded but not last", index));
                }
                (Some(upper), true) => {
                    return invalid(format!("last bracket ends at {}; it must be unbounded", upper));
                }
                (Some(upper), false) if upper <= bracket.lower => {
                    return invalid(format!("bracket {} is empty or inverted", index));
                }
                _ => {}
            }
            if let (Some(upper), Some(next)) = (bracket.upper, brackets.get(index + 1)) {
                if next.lower != upper {
                    return invalid(format!(
                        "bracket {} ends at {} but bracket {} starts at {}",
                        index,
                        upper,
                        index + 1,
                        next.lower
                    ));
                }
            }
            match bracket.formula {
                FeeFormula::Flat { amount } if amount < Money::ZERO => {
                    return invalid(format!("bracket {} has a negative fee", index));
                }
                FeeFormula::Percentage { cap: Some(cap), .. } if cap < Money::ZERO => {
                    return invalid(format!("bracket {} has a negative cap", index));
                }
                _ => {}
            }
        }

        Ok(Self { brackets })
    }

    /// HMCTS Form EX50 issue fees for money claims.
    pub fn ex50() -> Self {
        let flat = |lower: i64, upper: i64, fee: i64| FeeBracket {
            lower: Money::from_pence(lower),
            upper: Some(Money::from_pence(upper)),
            formula: FeeFormula::Flat {
                amount: Money::from_pounds(fee),
            },
        };
        // Bands are "up to and including" whole pounds, hence the extra penny.
        Self {
            brackets: vec![
                flat(0, 30_001, 35),
                flat(30_001, 50_001, 50),
                flat(50_001, 100_001, 70),
                flat(100_001, 150_001, 80),
                flat(150_001, 300_001, 115),
                flat(300_001, 500_001, 205),
                flat(500_001, 1_000_001, 455),
                FeeBracket {
                    lower: Money::from_pence(1_000_001),
                    upper: None,
                    formula: FeeFormula::Percentage {
                        basis_points: 500,
                        cap: Some(Money::from_pounds(10_000)),
                    },
                },
            ],
        }
    }

    pub fn brackets(&self) -> &[FeeBracket] {
        &self.brackets
    }
}

impl Default for FeeTable {
    fn default() -> Self {
        Self::ex50()
    }
}

pub fn compute_fee(claim_value: Money, table: &FeeTable) -> Result<FeeResult> {
    if claim_value <= Money::ZERO {
        return Err(DeadlineError::InvalidClaimValue {
            value_pence: claim_value.pence(),
        });
    }

    let (bracket_matched, bracket) = table
        .brackets
        .iter()
        .enumerate()
        .find(|(_, bracket)| bracket.contains(claim_value))
        .ok_or_else(|| DeadlineError::InvalidFeeTable {
            message: format!("no bracket covers {}", claim_value),
        })?;

    let (fee_amount, capped) = match bracket.formula {
        FeeFormula::Flat { amount } => (amount, false),
        FeeFormula::Percentage { basis_points, cap } => {
            let raw = percentage_of(claim_value, basis_points);
            match cap {
                Some(cap) if raw > cap => (cap, true),
                _ => (raw, false),
            }
        }
    };

    tracing::debug!(
        "Fee for {} is {} (bracket {}, capped: {})",
        claim_value,
        fee_amount,
        bracket_matched,
        capped
    );

    Ok(FeeResult {
        claim_value,
        fee_amount,
        bracket_matched,
        capped,
    })
}

fn percentage_of(value: Money, basis_points: u32) -> Money {
    let scaled = i128::from(value.pence()) * i128::from(basis_points);
    let rounded = (scaled + 5_000) / 10_000;
    Money::from_pence(i64::try_from(rounded).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(pounds: i64) -> FeeResult {
        compute_fee(Money::from_pounds(pounds), &FeeTable::ex50()).unwrap()
    }

    #[test]
    fn test_ex50_table_is_valid() {
        let table = FeeTable::ex50();
        assert_eq!(FeeTable::new(table.brackets().to_vec()).unwrap(), table);
    }

    #[test]
    fn test_flat_brackets_include_their_upper_pound() {
        assert_eq!(fee(300).fee_amount, Money::from_pounds(35));
        assert_eq!(fee(500).fee_amount, Money::from_pounds(50));
        assert_eq!(fee(1_000).fee_amount, Money::from_pounds(70));
        assert_eq!(fee(5_000).fee_amount, Money::from_pounds(205));
        assert_eq!(fee(10_000).fee_amount, Money::from_pounds(455));

        let just_over = compute_fee(Money::from_pence(30_001), &FeeTable::ex50()).unwrap();
        assert_eq!(just_over.fee_amount, Money::from_pounds(50));
        assert_eq!(just_over.bracket_matched, 1);
    }

    #[test]
    fn test_percentage_below_cap() {
        let result = fee(15_000);
        assert_eq!(result.fee_amount, Money::from_pounds(750));
        assert!(!result.capped);
        assert_eq!(result.bracket_matched, 7);
    }

    #[test]
    fn test_percentage_exactly_at_cap_is_not_capped() {
        let result = fee(200_000);
        assert_eq!(result.fee_amount, Money::from_pounds(10_000));
        assert!(!result.capped);
    }

    #[test]
    fn test_percentage_above_cap() {
        let result = fee(250_000);
        assert_eq!(result.fee_amount, Money::from_pounds(10_000));
        assert!(result.capped);
        assert_eq!(result.claim_value, Money::from_pounds(250_000));
    }

    #[test]
    fn test_percentage_rounds_half_up_to_the_penny() {
        // 5% of £10,000.10 is £500.005.
        let result = compute_fee(Money::from_pence(1_000_010), &FeeTable::ex50()).unwrap();
        assert_eq!(result.fee_amount, Money::from_pence(50_001));
    }

    #[test]
    fn test_non_positive_claims_are_rejected() {
        let table = FeeTable::ex50();
        assert!(matches!(
            compute_fee(Money::ZERO, &table),
            Err(DeadlineError::InvalidClaimValue { value_pence: 0 })
        ));
        assert!(matches!(
            compute_fee(Money::from_pounds(-100), &table),
            Err(DeadlineError::InvalidClaimValue { value_pence: -10_000 })
        ));
    }

    #[test]
    fn test_table_construction_rejects_gaps_and_overlaps() {
        let flat = |lower: i64, upper: Option<i64>| FeeBracket {
            lower: Money::from_pounds(lower),
            upper: upper.map(Money::from_pounds),
            formula: FeeFormula::Flat {
                amount: Money::from_pounds(10),
            },
        };

        assert!(FeeTable::new(vec![]).is_err());
        assert!(FeeTable::new(vec![flat(1, None)]).is_err());
        assert!(FeeTable::new(vec![flat(0, Some(100))]).is_err());
        assert!(FeeTable::new(vec![flat(0, None), flat(100, None)]).is_err());
        assert!(FeeTable::new(vec![flat(0, Some(100)), flat(150, None)]).is_err());
        assert!(FeeTable::new(vec![flat(0, Some(100)), flat(50, None)]).is_err());
        assert!(FeeTable::new(vec![flat(0, Some(0)), flat(0, None)]).is_err());
        assert!(FeeTable::new(vec![flat(0, Some(100)), flat(100, None)]).is_ok());
    }

    #[test]
    fn test_uncapped_percentage() {
        let table = FeeTable::new(vec![FeeBracket {
            lower: Money::ZERO,
            upper: None,
            formula: FeeFormula::Percentage {
                basis_points: 1_000,
                cap: None,
            },
        }])
        .unwrap();

        let result = compute_fee(Money::from_pounds(1_000_000), &table).unwrap();
        assert_eq!(result.fee_amount, Money::from_pounds(100_000));
        assert!(!result.capped);
    }
}

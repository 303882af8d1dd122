use crate::models::{Direction, FinancialMovement, Period, SheetSummary};
use crate::tolerance::{mismatch_message, within_tolerance};

/// Accumulates one running balance across all sheets in ascending period
/// order. Carry-over only works if sheets are fed sequentially; the caller
/// must never process sheets out of order or in parallel.
///
/// Mismatches at any checkpoint are reporting signals for human review,
/// never hard failures: historical source data legitimately contains small
/// discrepancies that predate the system.
pub struct Reconciler {
    balance: f64,
    pub warnings: Vec<String>,
    pub mismatches: usize,
}

impl Reconciler {
    pub fn new(opening_balance: f64) -> Self {
        Self {
            balance: opening_balance,
            warnings: Vec::new(),
            mismatches: 0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Run one sheet through the three checkpoints: carry-over before the
    /// movements, per-movement row balances, and the period-end marker
    /// after. Returns the sheet's audit entry for the summary.
    pub fn process_sheet(
        &mut self,
        sheet_name: &str,
        period: Period,
        prior_balance: Option<f64>,
        period_end_balance: Option<f64>,
        movements: &mut [FinancialMovement],
    ) -> SheetSummary {
        let starting_balance = self.balance;

        if let Some(prior) = prior_balance {
            if !within_tolerance(prior, starting_balance) {
                self.mismatches += 1;
                self.warnings.push(mismatch_message(
                    &format!("Carry-over into sheet \"{sheet_name}\" ({period})"),
                    prior,
                    starting_balance,
                ));
            }
        }

        for movement in movements.iter_mut() {
            match movement.direction {
                Direction::Income => self.balance += movement.amount,
                Direction::Expense => self.balance -= movement.amount,
            }
            if let Some(row_balance) = movement.expected_balance {
                movement.found_balance = Some(self.balance);
                if !within_tolerance(row_balance, self.balance) {
                    movement.balance_mismatch = true;
                    self.mismatches += 1;
                    self.warnings.push(mismatch_message(
                        &format!(
                            "Row balance for movement {} in sheet \"{sheet_name}\"",
                            movement.movement_number
                        ),
                        row_balance,
                        self.balance,
                    ));
                }
            }
        }

        if let Some(end) = period_end_balance {
            if !within_tolerance(end, self.balance) {
                self.mismatches += 1;
                self.warnings.push(mismatch_message(
                    &format!("Period-end balance for sheet \"{sheet_name}\" ({period})"),
                    end,
                    self.balance,
                ));
            }
        }

        SheetSummary {
            period: period.to_string(),
            movement_count: movements.len(),
            starting_balance,
            prior_period_balance_detected: prior_balance,
            period_end_balance_detected: period_end_balance,
            calculated_ending_balance: self.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn movement(direction: Direction, amount: f64, row_balance: Option<f64>) -> FinancialMovement {
        FinancialMovement {
            movement_number: "2025-10-002".to_string(),
            date: "2025-10-05".to_string(),
            direction,
            amount,
            description: "CUOTA".to_string(),
            income_source: Some("CUOTAS".to_string()),
            expense_category: None,
            source_name: "ledger.xlsx".to_string(),
            sheet_name: "CORTE OCTUBRE 31-25".to_string(),
            row_number: 2,
            fingerprint: "f".to_string(),
            balance_mismatch: false,
            expected_balance: row_balance,
            found_balance: None,
        }
    }

    #[test]
    fn test_running_balance_updates_by_direction() {
        let mut rec = Reconciler::new(100.0);
        let mut movements = vec![
            movement(Direction::Income, 500.0, None),
            movement(Direction::Expense, 200.0, None),
        ];
        let summary = rec.process_sheet(
            "CORTE OCTUBRE 31-25",
            Period::new(2025, 10),
            None,
            None,
            &mut movements,
        );
        assert_eq!(rec.balance(), 400.0);
        assert_eq!(summary.starting_balance, 100.0);
        assert_eq!(summary.calculated_ending_balance, 400.0);
        assert_eq!(rec.mismatches, 0);
    }

    #[test]
    fn test_carry_over_match_produces_no_warning() {
        let mut rec = Reconciler::new(100.0);
        rec.process_sheet(
            "CORTE FEBRERO 2025",
            Period::new(2025, 2),
            Some(100.0),
            None,
            &mut [],
        );
        assert!(rec.warnings.is_empty());
    }

    #[test]
    fn test_carry_over_mismatch_warns_once() {
        let mut rec = Reconciler::new(100.0);
        rec.process_sheet(
            "CORTE FEBRERO 2025",
            Period::new(2025, 2),
            Some(101.0),
            None,
            &mut [],
        );
        assert_eq!(rec.warnings.len(), 1);
        assert_eq!(rec.mismatches, 1);
        assert!(rec.warnings[0].contains("Carry-over"));
        assert!(rec.warnings[0].contains("2025-02"));
    }

    #[test]
    fn test_row_balance_mismatch_flags_movement() {
        let mut rec = Reconciler::new(0.0);
        let mut movements = vec![movement(Direction::Income, 500.0, Some(510.0))];
        rec.process_sheet(
            "CORTE OCTUBRE 31-25",
            Period::new(2025, 10),
            None,
            None,
            &mut movements,
        );
        assert!(movements[0].balance_mismatch);
        assert_eq!(movements[0].expected_balance, Some(510.0));
        assert_eq!(movements[0].found_balance, Some(500.0));
        assert_eq!(rec.mismatches, 1);
    }

    #[test]
    fn test_row_balance_within_tolerance_not_flagged() {
        let mut rec = Reconciler::new(0.0);
        let mut movements = vec![movement(Direction::Income, 500.0, Some(500.25))];
        rec.process_sheet(
            "CORTE OCTUBRE 31-25",
            Period::new(2025, 10),
            None,
            None,
            &mut movements,
        );
        assert!(!movements[0].balance_mismatch);
        // Found value is still recorded for the audit trail.
        assert_eq!(movements[0].found_balance, Some(500.0));
        assert_eq!(rec.mismatches, 0);
    }

    #[test]
    fn test_period_end_mismatch_warns() {
        let mut rec = Reconciler::new(0.0);
        let mut movements = vec![movement(Direction::Income, 500.0, None)];
        rec.process_sheet(
            "CORTE OCTUBRE 31-25",
            Period::new(2025, 10),
            None,
            Some(700.0),
            &mut movements,
        );
        assert_eq!(rec.warnings.len(), 1);
        assert!(rec.warnings[0].contains("Period-end"));
    }

    #[test]
    fn test_carry_over_chains_across_sheets() {
        let mut rec = Reconciler::new(0.0);
        let mut october = vec![movement(Direction::Income, 1000.0, Some(1000.0))];
        rec.process_sheet(
            "CORTE OCTUBRE 31-25",
            Period::new(2025, 10),
            None,
            None,
            &mut october,
        );
        let mut november = vec![movement(Direction::Expense, 200.0, Some(800.0))];
        let summary = rec.process_sheet(
            "CORTE NOVIEMBRE 30-25",
            Period::new(2025, 11),
            Some(1000.0),
            Some(800.0),
            &mut november,
        );
        assert_eq!(rec.warnings.len(), 0);
        assert_eq!(rec.mismatches, 0);
        assert_eq!(summary.starting_balance, 1000.0);
        assert_eq!(summary.calculated_ending_balance, 800.0);
    }
}

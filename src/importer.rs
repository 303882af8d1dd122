use std::io::Cursor;

use calamine::{Data, Range, Reader};
use rusqlite::Connection;

use crate::classifier::classify;
use crate::db::{get_account, load_catalogs};
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::models::{Direction, FinancialMovement, ImportSummary};
use crate::persister::persist_batch;
use crate::reconciler::Reconciler;
use crate::rows::parse_sheet;
use crate::sheets::classify_sheets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    DryRun,
    Apply,
}

impl ImportMode {
    pub fn is_dry_run(&self) -> bool {
        *self == Self::DryRun
    }
}

/// Run the whole import pipeline against a workbook byte stream. The
/// summary is always returned, even when the import aborts; only
/// store-level failures surface as `Err`.
pub fn import_workbook(
    conn: &mut Connection,
    bytes: &[u8],
    source_name: &str,
    account_code: &str,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let mut workbook = match calamine::open_workbook_auto_from_rs(Cursor::new(bytes)) {
        Ok(workbook) => workbook,
        Err(e) => {
            let mut summary = ImportSummary::empty();
            summary
                .errors
                .push(format!("Cannot open workbook \"{source_name}\": {e}"));
            summary.message = "Import aborted: workbook is not readable".to_string();
            return Ok(summary);
        }
    };

    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());
    for name in &names {
        let range = workbook
            .worksheet_range(name)
            .unwrap_or_else(|_| Range::new((0, 0), (0, 0)));
        sheets.push((name.clone(), range));
    }

    import_ranges(conn, &sheets, source_name, account_code, mode)
}

/// Pipeline entry point below the workbook decoding: classify sheets, parse
/// rows, classify and fingerprint movements, reconcile in period order,
/// then hand the whole batch to the persister.
pub fn import_ranges(
    conn: &mut Connection,
    sheets: &[(String, Range<Data>)],
    source_name: &str,
    account_code: &str,
    mode: ImportMode,
) -> Result<ImportSummary> {
    let (account_id, opening_balance) = get_account(conn, account_code)?;
    let catalogs = load_catalogs(conn)?;

    let mut summary = ImportSummary::empty();

    let names: Vec<String> = sheets.iter().map(|(name, _)| name.clone()).collect();
    let classified = match classify_sheets(&names) {
        Ok(classified) => classified,
        Err(err) => {
            summary.errors.push(err);
            summary.message = "Import aborted: sheet classification failed".to_string();
            return Ok(summary);
        }
    };

    let mut reconciler = Reconciler::new(opening_balance);
    let mut batch: Vec<FinancialMovement> = Vec::new();

    for sheet in &classified {
        let Some((_, range)) = sheets.iter().find(|(name, _)| *name == sheet.name) else {
            continue;
        };

        let parse = parse_sheet(&sheet.name, range);
        summary.total_rows_processed += parse.rows_processed;
        summary.warnings.extend(parse.warnings);

        let mut movements: Vec<FinancialMovement> = parse
            .movements
            .iter()
            .map(|pm| {
                let code = classify(&pm.description, pm.direction);
                let (income_source, expense_category) = match pm.direction {
                    Direction::Income => (Some(code.to_string()), None),
                    Direction::Expense => (None, Some(code.to_string())),
                };
                FinancialMovement {
                    movement_number: format!("{}-{:03}", sheet.period, pm.row_number),
                    date: pm.date.clone(),
                    direction: pm.direction,
                    amount: pm.amount,
                    description: pm.description.clone(),
                    income_source,
                    expense_category,
                    source_name: source_name.to_string(),
                    sheet_name: sheet.name.clone(),
                    row_number: pm.row_number,
                    fingerprint: fingerprint(
                        &pm.date,
                        &pm.description,
                        pm.direction,
                        pm.amount,
                        pm.row_balance,
                        &sheet.name,
                    ),
                    balance_mismatch: false,
                    expected_balance: pm.row_balance,
                    found_balance: None,
                }
            })
            .collect();

        let sheet_summary = reconciler.process_sheet(
            &sheet.name,
            sheet.period,
            parse.prior_balance,
            parse.period_end_balance,
            &mut movements,
        );
        summary.per_sheet.insert(sheet.name.clone(), sheet_summary);
        batch.extend(movements);
    }

    summary.warnings.append(&mut reconciler.warnings);
    summary.balance_mismatches = reconciler.mismatches;
    summary.final_calculated_balance = reconciler.balance();

    let outcome = persist_batch(conn, account_id, &batch, &catalogs, mode.is_dry_run())?;
    summary.movements_imported = outcome.imported;
    summary.movements_skipped = outcome.skipped;
    summary.errors.extend(outcome.errors);

    if !mode.is_dry_run() && outcome.imported > 0 {
        conn.execute(
            "INSERT INTO imports (source_name, account_id, sheet_count, record_count, skipped_count, mismatch_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                source_name,
                account_id,
                classified.len() as i64,
                outcome.imported as i64,
                outcome.skipped as i64,
                summary.balance_mismatches as i64,
            ],
        )?;
    }

    summary.success = summary.errors.is_empty();
    let prefix = if mode.is_dry_run() { "Dry-run: " } else { "" };
    summary.message = if summary.success {
        format!(
            "{prefix}{} movement(s) imported, {} duplicate(s) skipped, {} balance mismatch(es); final balance {:.2}",
            summary.movements_imported,
            summary.movements_skipped,
            summary.balance_mismatches,
            summary.final_calculated_balance,
        )
    } else {
        format!(
            "{prefix}import completed with {} error(s); {} movement(s) imported",
            summary.errors.len(),
            summary.movements_imported,
        )
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::Period;
    use crate::persister::lock_period;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO accounts (code, name, opening_balance) VALUES ('CAJA', 'Caja general', 0)",
            [],
        )
        .unwrap();
        (dir, conn)
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn range_of(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (height.saturating_sub(1), width.saturating_sub(1)));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                if cell != Data::Empty {
                    range.set_value((r as u32, c as u32), cell);
                }
            }
        }
        range
    }

    fn header_row() -> Vec<Data> {
        vec![s("FECHA"), s("CONCEPTO"), s("INGRESOS"), s("EGRESOS"), s("SALDO")]
    }

    /// The two-sheet scenario: October with one income row, November with a
    /// carry-over marker and one expense row.
    fn two_sheet_workbook() -> Vec<(String, Range<Data>)> {
        let october = range_of(vec![
            header_row(),
            vec![s("05/10/2025"), s("CUOTA SOCIOS"), Data::Float(1000.0), Data::Empty, Data::Float(1000.0)],
        ]);
        let november = range_of(vec![
            header_row(),
            vec![Data::Empty, s("SALDO ANTERIOR"), Data::Empty, Data::Empty, Data::Float(1000.0)],
            vec![s("12/11/2025"), s("PAGO PAPELERIA"), Data::Empty, Data::Float(200.0), Data::Float(800.0)],
            vec![Data::Empty, s("SALDO ACTUAL AL 30 DE NOVIEMBRE"), Data::Empty, Data::Empty, Data::Float(800.0)],
        ]);
        vec![
            ("CORTE OCTUBRE 31-25".to_string(), october),
            ("CORTE NOVIEMBRE 30-25".to_string(), november),
        ]
    }

    fn movement_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM movements", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_end_to_end_two_sheet_import() {
        let (_dir, mut conn) = test_db();
        let sheets = two_sheet_workbook();
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert!(summary.success, "errors: {:?}", summary.errors);
        assert_eq!(summary.movements_imported, 2);
        assert_eq!(summary.movements_skipped, 0);
        assert_eq!(summary.balance_mismatches, 0);
        assert_eq!(summary.final_calculated_balance, 800.0);
        assert_eq!(summary.per_sheet.len(), 2);
        let october = &summary.per_sheet["CORTE OCTUBRE 31-25"];
        assert_eq!(october.period, "2025-10");
        assert_eq!(october.starting_balance, 0.0);
        assert_eq!(october.calculated_ending_balance, 1000.0);
        let november = &summary.per_sheet["CORTE NOVIEMBRE 30-25"];
        assert_eq!(november.period, "2025-11");
        assert_eq!(november.prior_period_balance_detected, Some(1000.0));
        assert_eq!(november.period_end_balance_detected, Some(800.0));
        assert_eq!(movement_count(&conn), 2);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let (_dir, mut conn) = test_db();
        let sheets = two_sheet_workbook();
        let first =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert_eq!(first.movements_imported, 2);
        let second =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert_eq!(second.movements_imported, 0);
        assert_eq!(second.movements_skipped, 2);
        assert_eq!(movement_count(&conn), 2);
    }

    #[test]
    fn test_dry_run_parity() {
        let (_dir, mut conn) = test_db();
        let sheets = two_sheet_workbook();
        let dry =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::DryRun).unwrap();
        assert_eq!(movement_count(&conn), 0);
        assert!(dry.message.starts_with("Dry-run:"));
        let apply =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert_eq!(dry.movements_imported, apply.movements_imported);
        assert_eq!(dry.movements_skipped, apply.movements_skipped);
        assert_eq!(dry.final_calculated_balance, apply.final_calculated_balance);
        assert_eq!(movement_count(&conn), 2);
    }

    #[test]
    fn test_unrecognized_sheet_is_fatal() {
        let (_dir, mut conn) = test_db();
        let mut sheets = two_sheet_workbook();
        sheets.push(("Hoja de trabajo".to_string(), range_of(vec![vec![s("x")]])));
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert!(!summary.success);
        assert_eq!(summary.movements_imported, 0);
        assert!(summary.errors[0].contains("Hoja de trabajo"));
        assert_eq!(movement_count(&conn), 0);
    }

    #[test]
    fn test_summary_sheet_is_skipped_silently() {
        let (_dir, mut conn) = test_db();
        let mut sheets = two_sheet_workbook();
        sheets.push(("RESUMEN ANUAL".to_string(), range_of(vec![vec![s("x")]])));
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert!(summary.success, "errors: {:?}", summary.errors);
        assert_eq!(summary.movements_imported, 2);
        assert!(!summary.per_sheet.contains_key("RESUMEN ANUAL"));
    }

    #[test]
    fn test_locked_period_rejected_others_committed() {
        let (_dir, mut conn) = test_db();
        lock_period(&conn, Period::new(2025, 11)).unwrap();
        let sheets = two_sheet_workbook();
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert!(!summary.success);
        assert_eq!(summary.movements_imported, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("2025-11"));
        assert_eq!(movement_count(&conn), 1);
    }

    #[test]
    fn test_carry_over_mismatch_produces_one_warning() {
        let (_dir, mut conn) = test_db();
        let october = range_of(vec![
            header_row(),
            vec![s("05/10/2025"), s("CUOTA SOCIOS"), Data::Float(100.0), Data::Empty, Data::Float(100.0)],
        ]);
        let november = range_of(vec![
            header_row(),
            vec![Data::Empty, s("SALDO ANTERIOR"), Data::Empty, Data::Empty, Data::Float(101.0)],
            vec![s("12/11/2025"), s("PAGO LIMPIEZA"), Data::Empty, Data::Float(50.0), Data::Empty],
        ]);
        let sheets = vec![
            ("CORTE OCTUBRE 31-25".to_string(), october),
            ("CORTE NOVIEMBRE 30-25".to_string(), november),
        ];
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert!(summary.success); // mismatches are warnings, not failures
        let carry_over: Vec<&String> = summary
            .warnings
            .iter()
            .filter(|w| w.contains("Carry-over"))
            .collect();
        assert_eq!(carry_over.len(), 1);
        assert_eq!(summary.balance_mismatches, 1);
    }

    #[test]
    fn test_mismatched_movement_is_flagged_and_persisted_with_balances() {
        let (_dir, mut conn) = test_db();
        let october = range_of(vec![
            header_row(),
            vec![s("05/10/2025"), s("CUOTA SOCIOS"), Data::Float(500.0), Data::Empty, Data::Float(510.0)],
        ]);
        let sheets = vec![("CORTE OCTUBRE 31-25".to_string(), october)];
        let summary =
            import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        assert_eq!(summary.balance_mismatches, 1);
        let (flagged, expected, found): (i64, f64, f64) = conn
            .query_row(
                "SELECT balance_mismatch, expected_balance, found_balance FROM movements LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(flagged, 1);
        assert_eq!(expected, 510.0);
        assert_eq!(found, 500.0);
    }

    #[test]
    fn test_movements_are_classified_with_fallback() {
        let (_dir, mut conn) = test_db();
        let october = range_of(vec![
            header_row(),
            vec![s("05/10/2025"), s("TRASPASO SIN REFERENCIA"), Data::Float(500.0), Data::Empty, Data::Empty],
            vec![s("06/10/2025"), s("PAGO VARIOS"), Data::Empty, Data::Float(100.0), Data::Empty],
        ]);
        let sheets = vec![("CORTE OCTUBRE 31-25".to_string(), october)];
        import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        let fallback_income: i64 = conn
            .query_row(
                "SELECT count(*) FROM movements m JOIN income_sources s ON m.income_source_id = s.id \
                 WHERE s.code = 'OTROS_INGRESOS'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let fallback_expense: i64 = conn
            .query_row(
                "SELECT count(*) FROM movements m JOIN expense_categories c ON m.expense_category_id = c.id \
                 WHERE c.code = 'OTROS_EGRESOS'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(fallback_income, 1);
        assert_eq!(fallback_expense, 1);
    }

    #[test]
    fn test_import_log_written_on_apply_only() {
        let (_dir, mut conn) = test_db();
        let sheets = two_sheet_workbook();
        import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::DryRun).unwrap();
        let after_dry: i64 = conn
            .query_row("SELECT count(*) FROM imports", [], |r| r.get(0))
            .unwrap();
        assert_eq!(after_dry, 0);
        import_ranges(&mut conn, &sheets, "ledger.xlsx", "CAJA", ImportMode::Apply).unwrap();
        let after_apply: i64 = conn
            .query_row("SELECT count(*) FROM imports", [], |r| r.get(0))
            .unwrap();
        assert_eq!(after_apply, 1);
    }

    #[test]
    fn test_unreadable_workbook_bytes_return_failed_summary() {
        let (_dir, mut conn) = test_db();
        let summary =
            import_workbook(&mut conn, b"not an xlsx", "garbage.xlsx", "CAJA", ImportMode::Apply)
                .unwrap();
        assert!(!summary.success);
        assert!(!summary.errors.is_empty());
    }

    #[test]
    fn test_unknown_account_is_an_error() {
        let (_dir, mut conn) = test_db();
        let sheets = two_sheet_workbook();
        let result = import_ranges(&mut conn, &sheets, "ledger.xlsx", "NOPE", ImportMode::Apply);
        assert!(result.is_err());
    }
}

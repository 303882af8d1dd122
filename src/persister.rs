use std::collections::{BTreeSet, HashSet};

use rusqlite::Connection;

use crate::db::Catalogs;
use crate::error::{Result, TesoroError};
use crate::models::{Direction, FinancialMovement, Period};

// ---------------------------------------------------------------------------
// Period locks
// ---------------------------------------------------------------------------

/// Read-only lock query exposed to the rest of the system.
pub fn is_period_locked(conn: &Connection, year: i32, month: u32) -> Result<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT 1 FROM period_locks WHERE year = ?1 AND month = ?2")?;
    Ok(stmt.exists(rusqlite::params![year, month])?)
}

pub fn lock_period(conn: &Connection, period: Period) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO period_locks (year, month) VALUES (?1, ?2)",
        rusqlite::params![period.year, period.month],
    )?;
    Ok(())
}

pub fn unlock_period(conn: &Connection, period: Period) -> Result<()> {
    conn.execute(
        "DELETE FROM period_locks WHERE year = ?1 AND month = ?2",
        rusqlite::params![period.year, period.month],
    )?;
    Ok(())
}

pub fn locked_periods(conn: &Connection) -> Result<Vec<Period>> {
    let mut stmt = conn.prepare("SELECT year, month FROM period_locks ORDER BY year, month")?;
    let periods = stmt
        .query_map([], |row| Ok(Period::new(row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(periods)
}

// ---------------------------------------------------------------------------
// Idempotent batch write
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub imported: usize,
    pub skipped: usize,
    /// One error string per locked period that rejected movements.
    pub errors: Vec<String>,
}

fn existing_fingerprint(conn: &Connection, fingerprint: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM movements WHERE fingerprint = ?1")?;
    Ok(stmt.exists([fingerprint])?)
}

fn catalog_ids(
    movement: &FinancialMovement,
    catalogs: &Catalogs,
) -> Result<(Option<i64>, Option<i64>)> {
    match movement.direction {
        Direction::Income => {
            let code = movement.income_source.as_deref().unwrap_or_default();
            let id = catalogs
                .income_sources
                .get(code)
                .copied()
                .ok_or_else(|| TesoroError::Other(format!("Unknown income source code: {code}")))?;
            Ok((Some(id), None))
        }
        Direction::Expense => {
            let code = movement.expense_category.as_deref().unwrap_or_default();
            let id = catalogs.expense_categories.get(code).copied().ok_or_else(|| {
                TesoroError::Other(format!("Unknown expense category code: {code}"))
            })?;
            Ok((None, Some(id)))
        }
    }
}

/// Write one import invocation's batch. Movements falling in a locked
/// period are rejected per period (fail-closed: none of a locked period's
/// movements are written). The rest partition into new and duplicate by
/// fingerprint; new movements commit in a single transaction, so a failure
/// mid-batch leaves the store unchanged.
///
/// In dry-run mode only the lookup/partition step runs and the counts come
/// back as if the commit had happened.
pub fn persist_batch(
    conn: &mut Connection,
    account_id: i64,
    movements: &[FinancialMovement],
    catalogs: &Catalogs,
    dry_run: bool,
) -> Result<PersistOutcome> {
    let mut outcome = PersistOutcome::default();

    let mut locked: BTreeSet<Period> = BTreeSet::new();
    let mut periods: BTreeSet<Period> = BTreeSet::new();
    for movement in movements {
        if let Some(period) = movement.period() {
            periods.insert(period);
        }
    }
    for period in &periods {
        if is_period_locked(conn, period.year, period.month)? {
            locked.insert(*period);
        }
    }

    let eligible: Vec<&FinancialMovement> = movements
        .iter()
        .filter(|m| m.period().map_or(true, |p| !locked.contains(&p)))
        .collect();

    for period in &locked {
        let rejected = movements
            .iter()
            .filter(|m| m.period() == Some(*period))
            .count();
        outcome.errors.push(format!(
            "Period {period} is closed: {rejected} movement(s) rejected"
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut fresh: Vec<&FinancialMovement> = Vec::new();
    for movement in eligible {
        // A fingerprint repeated within the same batch is a duplicate too.
        if !seen.insert(movement.fingerprint.as_str())
            || existing_fingerprint(conn, &movement.fingerprint)?
        {
            outcome.skipped += 1;
        } else {
            fresh.push(movement);
        }
    }

    if dry_run {
        outcome.imported = fresh.len();
        return Ok(outcome);
    }

    let tx = conn.transaction()?;
    for movement in &fresh {
        let (income_source_id, expense_category_id) = catalog_ids(movement, catalogs)?;
        tx.execute(
            "INSERT INTO movements (account_id, movement_number, date, direction, amount, \
             description, income_source_id, expense_category_id, source_name, sheet_name, \
             row_number, fingerprint, balance_mismatch, expected_balance, found_balance) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                account_id,
                movement.movement_number,
                movement.date,
                movement.direction.as_str(),
                movement.amount,
                movement.description,
                income_source_id,
                expense_category_id,
                movement.source_name,
                movement.sheet_name,
                movement.row_number,
                movement.fingerprint,
                movement.balance_mismatch as i32,
                movement.expected_balance,
                movement.found_balance,
            ],
        )?;
    }
    tx.commit()?;

    outcome.imported = fresh.len();
    Ok(outcome)
}

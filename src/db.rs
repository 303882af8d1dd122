use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, TesoroError};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    opening_balance REAL NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS income_sources (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expense_categories (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS movements (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    movement_number TEXT NOT NULL,
    date TEXT NOT NULL,
    direction TEXT NOT NULL CHECK (direction IN ('income', 'expense')),
    amount REAL NOT NULL,
    description TEXT NOT NULL,
    income_source_id INTEGER,
    expense_category_id INTEGER,
    source_name TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    row_number INTEGER NOT NULL,
    fingerprint TEXT NOT NULL UNIQUE,
    balance_mismatch INTEGER NOT NULL DEFAULT 0,
    expected_balance REAL,
    found_balance REAL,
    imported_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (income_source_id) REFERENCES income_sources(id),
    FOREIGN KEY (expense_category_id) REFERENCES expense_categories(id)
);

CREATE TABLE IF NOT EXISTS period_locks (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    locked_at TEXT DEFAULT (datetime('now')),
    UNIQUE (year, month)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    source_name TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    sheet_count INTEGER,
    record_count INTEGER,
    skipped_count INTEGER,
    mismatch_count INTEGER,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
";

// (code, name)
const DEFAULT_INCOME_SOURCES: &[(&str, &str)] = &[
    ("CUOTAS", "Cuotas de socios"),
    ("APORTACIONES", "Aportaciones extraordinarias"),
    ("INTERESES", "Intereses y rendimientos"),
    ("DONATIVOS", "Donativos"),
    ("OTROS_INGRESOS", "Otros ingresos"),
];

const DEFAULT_EXPENSE_CATEGORIES: &[(&str, &str)] = &[
    ("PAPELERIA", "Papelería y copias"),
    ("HONORARIOS", "Honorarios profesionales"),
    ("MANTENIMIENTO", "Mantenimiento y reparaciones"),
    ("FESTEJOS", "Festejos y eventos"),
    ("COMISIONES", "Comisiones bancarias"),
    ("APOYOS", "Apoyos y ayudas"),
    ("OTROS_EGRESOS", "Otros egresos"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM income_sources", [], |row| row.get(0))?;
    if count == 0 {
        for (code, name) in DEFAULT_INCOME_SOURCES {
            conn.execute(
                "INSERT INTO income_sources (code, name) VALUES (?1, ?2)",
                rusqlite::params![code, name],
            )?;
        }
    }

    let count: i64 = conn.query_row("SELECT count(*) FROM expense_categories", [], |row| row.get(0))?;
    if count == 0 {
        for (code, name) in DEFAULT_EXPENSE_CATEGORIES {
            conn.execute(
                "INSERT INTO expense_categories (code, name) VALUES (?1, ?2)",
                rusqlite::params![code, name],
            )?;
        }
    }
    Ok(())
}

/// Read-only code→id maps handed to the pipeline at invocation start.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub income_sources: HashMap<String, i64>,
    pub expense_categories: HashMap<String, i64>,
}

fn load_code_map(conn: &Connection, table: &str) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare(&format!("SELECT code, id FROM {table}"))?;
    let map = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(map)
}

pub fn load_catalogs(conn: &Connection) -> Result<Catalogs> {
    Ok(Catalogs {
        income_sources: load_code_map(conn, "income_sources")?,
        expense_categories: load_code_map(conn, "expense_categories")?,
    })
}

/// Account lookup by code. The account is read-only to the import core; its
/// opening balance seeds the reconciliation.
pub fn get_account(conn: &Connection, code: &str) -> Result<(i64, f64)> {
    let mut stmt = conn.prepare("SELECT id, opening_balance FROM accounts WHERE code = ?1")?;
    stmt.query_row([code], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))
        .map_err(|_| TesoroError::UnknownAccount(code.to_string()))
}

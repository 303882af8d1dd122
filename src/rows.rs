use calamine::{Data, Range};

use crate::fingerprint::normalize_description;
use crate::models::{Direction, MarkerKind, ParsedMovement};

// Header row must carry all four of date/description/income/expense within
// the first HEADER_SCAN_ROWS rows; the balance column is optional.
const HEADER_SCAN_ROWS: usize = 20;

const DATE_LABELS: &[&str] = &["FECHA"];
const DESCRIPTION_LABELS: &[&str] = &["CONCEPTO", "DESCRIPCION"];
const INCOME_LABELS: &[&str] = &["INGRESO", "ENTRADA"];
const EXPENSE_LABELS: &[&str] = &["EGRESO", "SALIDA"];
const BALANCE_LABELS: &[&str] = &["SALDO"];

const PRIOR_BALANCE_PHRASE: &str = "SALDO ANTERIOR";
// The dated phrase is a superset of the plain one and must be checked first.
const PERIOD_END_DATED_PHRASE: &str = "SALDO ACTUAL AL";
const PERIOD_END_PHRASE: &str = "SALDO ACTUAL";

const SKIP_PHRASES: &[&str] = &[
    "TOTAL INGRESOS",
    "TOTAL DE INGRESOS",
    "TOTAL EGRESOS",
    "TOTAL DE EGRESOS",
    "TOTAL DEPOSITOS",
    "SUMAS",
    "TOTALES",
];

// ---------------------------------------------------------------------------
// Cell readers: typed parse-with-fallback, never panicking
// ---------------------------------------------------------------------------

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        _ => None,
    }
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

pub fn read_amount(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Ledger dates in text cells are day/month/year, with `/` or `-`
/// separators and two- or four-digit years.
pub fn parse_date_dmy(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split(['/', '-']).collect();
    if parts.len() != 3 {
        return None;
    }
    let d: u32 = parts[0].trim().parse().ok()?;
    let m: u32 = parts[1].trim().parse().ok()?;
    let y: i32 = parts[2].trim().parse().ok()?;
    let y = if parts[2].trim().len() == 2 { 2000 + y } else { y };
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub fn read_date(cell: &Data) -> Option<String> {
    match cell {
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if serial > 0.0 {
                Some(excel_serial_to_date(serial))
            } else {
                None
            }
        }
        Data::Float(f) if *f > 0.0 => Some(excel_serial_to_date(*f)),
        Data::Int(i) if *i > 0 => Some(excel_serial_to_date(*i as f64)),
        Data::String(s) => parse_date_dmy(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    pub date: usize,
    pub description: usize,
    pub income: usize,
    pub expense: usize,
    pub balance: Option<usize>,
}

fn label_matches(text: &str, labels: &[&str]) -> bool {
    labels.iter().any(|l| text.contains(l))
}

/// Scan the first rows for one containing all expected column labels and
/// record each label's column index.
pub fn find_header(range: &Range<Data>) -> Option<(usize, HeaderMap)> {
    for (row_idx, row) in range.rows().take(HEADER_SCAN_ROWS).enumerate() {
        let mut date = None;
        let mut description = None;
        let mut income = None;
        let mut expense = None;
        let mut balance = None;
        for (col, cell) in row.iter().enumerate() {
            let Some(text) = cell_text(cell) else { continue };
            let upper = text.to_uppercase();
            if date.is_none() && label_matches(&upper, DATE_LABELS) {
                date = Some(col);
            } else if description.is_none() && label_matches(&upper, DESCRIPTION_LABELS) {
                description = Some(col);
            } else if income.is_none() && label_matches(&upper, INCOME_LABELS) {
                income = Some(col);
            } else if expense.is_none() && label_matches(&upper, EXPENSE_LABELS) {
                expense = Some(col);
            } else if balance.is_none() && label_matches(&upper, BALANCE_LABELS) {
                balance = Some(col);
            }
        }
        if let (Some(date), Some(description), Some(income), Some(expense)) =
            (date, description, income, expense)
        {
            return Some((
                row_idx,
                HeaderMap {
                    date,
                    description,
                    income,
                    expense,
                    balance,
                },
            ));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Sheet walk
// ---------------------------------------------------------------------------

/// Everything read out of one classified sheet: candidate movements, the
/// transient balance markers and row-level warnings.
#[derive(Debug, Default)]
pub struct SheetParse {
    pub rows_processed: usize,
    pub movements: Vec<ParsedMovement>,
    pub prior_balance: Option<f64>,
    pub period_end_balance: Option<f64>,
    pub warnings: Vec<String>,
}

fn marker_kind(normalized: &str) -> Option<MarkerKind> {
    if normalized.starts_with(PRIOR_BALANCE_PHRASE) {
        Some(MarkerKind::PriorPeriodBalance)
    } else if normalized.starts_with(PERIOD_END_DATED_PHRASE) {
        Some(MarkerKind::PeriodEndBalance)
    } else if normalized.starts_with(PERIOD_END_PHRASE) {
        Some(MarkerKind::PeriodEndBalance)
    } else {
        None
    }
}

fn is_skip_phrase(normalized: &str) -> bool {
    SKIP_PHRASES.iter().any(|p| normalized.starts_with(p))
}

static EMPTY_CELL: Data = Data::Empty;

fn cell_at<'a>(row: &'a [Data], col: usize) -> &'a Data {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

/// Walk a classified sheet: locate the header, then emit movement
/// candidates and balance markers row by row. Row-level problems become
/// warnings, never errors.
pub fn parse_sheet(sheet_name: &str, range: &Range<Data>) -> SheetParse {
    let mut parse = SheetParse::default();

    let Some((header_idx, header)) = find_header(range) else {
        parse.warnings.push(format!(
            "Sheet \"{sheet_name}\": no header row found, sheet contributes no movements"
        ));
        return parse;
    };

    let start_row = range.start().map(|(r, _)| r).unwrap_or(0);
    for (offset, row) in range.rows().enumerate().skip(header_idx + 1) {
        parse.rows_processed += 1;
        let row_number = start_row + offset as u32 + 1;

        let Some(description) = cell_text(cell_at(row, header.description)) else {
            continue;
        };
        let normalized = normalize_description(&description);

        if let Some(kind) = marker_kind(&normalized) {
            let value = header
                .balance
                .and_then(|col| read_amount(cell_at(row, col)))
                .or_else(|| read_amount(cell_at(row, header.income)));
            match value {
                Some(v) => match kind {
                    MarkerKind::PriorPeriodBalance => {
                        if parse.prior_balance.is_none() {
                            parse.prior_balance = Some(v);
                        }
                    }
                    MarkerKind::PeriodEndBalance => parse.period_end_balance = Some(v),
                },
                None => parse.warnings.push(format!(
                    "Sheet \"{sheet_name}\" row {row_number}: balance marker \"{description}\" has no readable value"
                )),
            }
            continue;
        }

        if is_skip_phrase(&normalized) {
            continue;
        }

        let Some(date) = read_date(cell_at(row, header.date)) else {
            parse.warnings.push(format!(
                "Sheet \"{sheet_name}\" row {row_number}: unparseable date, row skipped"
            ));
            continue;
        };

        let income = read_amount(cell_at(row, header.income)).unwrap_or(0.0);
        let expense = read_amount(cell_at(row, header.expense)).unwrap_or(0.0);
        let (direction, amount) = match (income > 0.0, expense > 0.0) {
            (true, false) => (Direction::Income, income),
            (false, true) => (Direction::Expense, expense),
            (true, true) => {
                parse.warnings.push(format!(
                    "Sheet \"{sheet_name}\" row {row_number}: both income and expense amounts present, row skipped"
                ));
                continue;
            }
            (false, false) => continue,
        };

        let row_balance = header.balance.and_then(|col| read_amount(cell_at(row, col)));

        parse.movements.push(ParsedMovement {
            date,
            description,
            direction,
            amount,
            row_balance,
            row_number,
        });
    }

    parse
}

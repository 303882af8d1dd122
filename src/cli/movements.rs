use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::get_data_dir;

pub fn run(limit: usize) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    let mut stmt = conn.prepare(
        "SELECT m.movement_number, m.date, m.direction, m.amount, m.description, \
                COALESCE(s.code, c.code), m.balance_mismatch \
         FROM movements m \
         LEFT JOIN income_sources s ON m.income_source_id = s.id \
         LEFT JOIN expense_categories c ON m.expense_category_id = c.id \
         ORDER BY m.date DESC, m.id DESC LIMIT ?1",
    )?;
    let rows: Vec<(String, String, String, f64, String, String, bool)> = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["Number", "Date", "Direction", "Amount", "Description", "Code", "Mismatch"]);
    for (number, date, direction, amount, description, code, mismatch) in rows {
        table.add_row(vec![
            Cell::new(number),
            Cell::new(date),
            Cell::new(direction),
            Cell::new(money(amount)),
            Cell::new(description),
            Cell::new(code),
            Cell::new(if mismatch { "yes" } else { "" }),
        ]);
    }
    println!("Movements\n{table}");
    Ok(())
}

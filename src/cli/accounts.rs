use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::get_data_dir;

pub fn add(code: &str, name: &str, opening_balance: f64) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    conn.execute(
        "INSERT INTO accounts (code, name, opening_balance) VALUES (?1, ?2, ?3)",
        rusqlite::params![code, name, opening_balance],
    )?;
    println!("Added account: {code} ({name})");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    let mut stmt = conn.prepare("SELECT id, code, name, opening_balance FROM accounts")?;
    let rows: Vec<(i64, String, String, f64)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Name", "Opening Balance"]);
    for (id, code, name, opening) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(code),
            Cell::new(name),
            Cell::new(money(opening)),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("tesoro.db");

    if !settings.organization.is_empty() {
        println!("Organization: {}", settings.organization);
    }
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;

        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let movements: i64 = conn.query_row("SELECT count(*) FROM movements", [], |r| r.get(0))?;
        let mismatched: i64 = conn.query_row(
            "SELECT count(*) FROM movements WHERE balance_mismatch = 1",
            [],
            |r| r.get(0),
        )?;
        let locked: i64 = conn.query_row("SELECT count(*) FROM period_locks", [], |r| r.get(0))?;

        println!();
        println!("Accounts:        {accounts}");
        println!("Movements:       {movements}");
        println!("Mismatched:      {mismatched}");
        println!("Locked periods:  {locked}");

        let last_import: Option<(String, String)> = conn
            .query_row(
                "SELECT source_name, import_date FROM imports ORDER BY id DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .ok();
        if let Some((source, date)) = last_import {
            println!("Last import:     {source} ({date})");
        }
    } else {
        println!();
        println!("Database not found. Run `tesoro init` to set up.");
    }

    Ok(())
}

use crate::cli::parse_period;
use crate::db::get_connection;
use crate::error::Result;
use crate::persister::{lock_period, locked_periods, unlock_period};
use crate::settings::get_data_dir;

pub fn lock(period: &str) -> Result<()> {
    let period = parse_period(period)?;
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    lock_period(&conn, period)?;
    println!("Locked period {period}");
    Ok(())
}

pub fn unlock(period: &str) -> Result<()> {
    let period = parse_period(period)?;
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    unlock_period(&conn, period)?;
    println!("Unlocked period {period}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    let periods = locked_periods(&conn)?;
    if periods.is_empty() {
        println!("No locked periods.");
        return Ok(());
    }
    println!("Locked periods:");
    for period in periods {
        println!("  {period}");
    }
    Ok(())
}

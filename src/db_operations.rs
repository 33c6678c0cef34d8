//! Persistence for click counts and geocoded addresses. Connections are
//! opened per call; the database path comes from `DB_FILENAME`, and while it
//! is unset every operation degrades to a no-op so the catalog still works
//! without any persistence.

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::constants::DB_FILENAME;
use crate::geo::Coordinate;

fn open() -> Result<Option<Connection>> {
    match DB_FILENAME.get() {
        Some(filename) => Ok(Some(Connection::open(filename)?)),
        None => {
            log::debug!("no database configured, skipping persistence");
            Ok(None)
        }
    }
}

pub fn check_or_create_db_tables() -> Result<()> {
    let Some(conn) = open()? else { return Ok(()) };

    conn.prepare(
        "create table if not exists clicks (
            mensa_id text primary key not null unique,
            count integer not null
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists geocache (
            address text primary key not null unique,
            lat real not null,
            long real not null
        )",
    )?
    .execute([])?;

    Ok(())
}

pub fn increase_clicks(mensa_id: &str) -> Result<()> {
    let Some(conn) = open()? else { return Ok(()) };
    conn.prepare(
        "insert into clicks (mensa_id, count) values (?1, 1)
        on conflict (mensa_id) do update set count = count + 1",
    )?
    .execute(params![mensa_id])?;
    Ok(())
}

pub fn get_clicks(mensa_id: &str) -> Result<Option<i64>> {
    let Some(conn) = open()? else { return Ok(None) };
    let mut stmt = conn.prepare("select count from clicks where mensa_id = ?1")?;
    stmt.query_row(params![mensa_id], |row| row.get(0)).optional()
}

pub fn read_geo_cache(address: &str) -> Result<Option<Coordinate>> {
    let Some(conn) = open()? else { return Ok(None) };
    let mut stmt = conn.prepare("select lat, long from geocache where address = ?1")?;
    stmt.query_row(params![address], |row| {
        Ok(Coordinate {
            lat: row.get(0)?,
            lon: row.get(1)?,
        })
    })
    .optional()
}

pub fn update_geo_cache(address: &str, coordinate: Coordinate) -> Result<()> {
    let Some(conn) = open()? else { return Ok(()) };
    conn.prepare(
        "insert into geocache (address, lat, long) values (?1, ?2, ?3)
        on conflict (address) do update set lat = ?2, long = ?3",
    )?
    .execute(params![address, coordinate.lat, coordinate.lon])?;
    Ok(())
}

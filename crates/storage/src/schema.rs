use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Numeric columns keep their affinity but accept the `<br>`-joined text a
// merged record stores in them.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS complaint (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    victim_name TEXT,
    victim_gender TEXT,
    victim_age INTEGER,
    victim_email TEXT,
    victim_mobile_numbers TEXT,
    acknowledgment_no TEXT UNIQUE,
    cctns_no TEXT,
    fir_no TEXT,
    date_of_complaint TEXT,
    date_of_incident TEXT,
    time TEXT,
    category_of_complaint TEXT,
    sub_category_of_complaint TEXT,
    police_station TEXT,
    investigation_officer TEXT,
    lost_amount REAL,
    lien_amount REAL,
    it_act TEXT,
    bns TEXT,
    action_taken TEXT,
    forward_date TEXT,
    out_no TEXT,
    suspect_name TEXT,
    suspect_gender TEXT,
    suspect_age TEXT,
    suspect_email TEXT,
    suspect_mobile_numbers TEXT,
    suspect_social_handles TEXT,
    suspect_acc_no TEXT,
    ifsc_code TEXT,
    suspect_address TEXT,
    description TEXT,
    file_name TEXT,
    file_path TEXT
);
CREATE INDEX IF NOT EXISTS idx_complaint_date ON complaint (date_of_complaint);
";

use crate::client::VerificationOutcome;
use crate::extract::email_domain;
use crate::provider::VerificationStatus;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

pub const SOURCE_FINDER: &str = "finder";
pub const SOURCE_VERIFIER: &str = "verifier";

/// One row of the append-only verification log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub email: String,
    pub status: VerificationStatus,
    pub detail: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// One deduplicated valid address.
#[derive(Debug, Clone)]
pub struct ValidEmail {
    pub email: String,
    pub domain: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Counters for the stats command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_verified: u64,
    pub valid: u64,
    pub risky: u64,
    pub stored_valid: u64,
}

/// Local persistence for verification results: an append-only log read
/// newest-first, and a case-insensitively deduplicated valid-address index
/// grouped by domain. Last write wins; no transactional guarantees beyond a
/// single batch insert.
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open result store: {db_path}"))?;
        Self::init_database(&conn)?;
        Ok(Self { conn })
    }

    fn init_database(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS verification_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                status TEXT NOT NULL,
                detail TEXT NOT NULL,
                source TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS valid_emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                domain TEXT NOT NULL,
                source TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Append outcomes to the verification log. Existing rows are never
    /// touched.
    pub fn append_log(&self, outcomes: &[VerificationOutcome], source: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for outcome in outcomes {
            tx.execute(
                "INSERT INTO verification_log (email, status, detail, source, timestamp)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    outcome.address,
                    outcome.status.to_string(),
                    outcome.detail,
                    source,
                    outcome.timestamp.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Newest-first slice of the log, optionally filtered by status.
    pub fn recent_log(
        &self,
        limit: usize,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, status, detail, source, timestamp FROM verification_log
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY id DESC LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(
                params![status.map(|s| s.to_string()), limit.min(i64::MAX as usize) as i64],
                |row| {
                    Ok(LogEntry {
                        email: row.get(0)?,
                        status: row
                            .get::<_, String>(1)?
                            .parse()
                            .unwrap_or(VerificationStatus::Unknown),
                        detail: row.get(2)?,
                        source: row.get(3)?,
                        timestamp: parse_timestamp(&row.get::<_, String>(4)?),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Add the Valid outcomes to the valid-address index. Addresses are
    /// lowercased before insert so the UNIQUE constraint deduplicates
    /// case-insensitively. Returns how many rows were actually new.
    pub fn add_valid(&self, outcomes: &[VerificationOutcome], source: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        for outcome in outcomes {
            if outcome.status != VerificationStatus::Valid {
                continue;
            }
            let email = outcome.address.to_lowercase();
            let domain = email_domain(&email).unwrap_or_default();
            inserted += tx.execute(
                "INSERT OR IGNORE INTO valid_emails (email, domain, source, timestamp)
                 VALUES (?, ?, ?, ?)",
                params![email, domain, source, outcome.timestamp.to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Stored valid addresses, newest first.
    pub fn valid_emails(&self, limit: usize) -> Result<Vec<ValidEmail>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, domain, source, timestamp FROM valid_emails
             ORDER BY id DESC LIMIT ?",
        )?;

        let emails = stmt
            .query_map(params![limit.min(i64::MAX as usize) as i64], |row| {
                Ok(ValidEmail {
                    email: row.get(0)?,
                    domain: row.get(1)?,
                    source: row.get(2)?,
                    timestamp: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(emails)
    }

    /// Stored valid addresses bucketed by domain, domains sorted.
    pub fn valid_by_domain(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, email FROM valid_emails ORDER BY domain, email",
        )?;

        let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (domain, email) = row?;
            buckets.entry(domain).or_default().push(email);
        }

        Ok(buckets)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<u64> {
            Ok(self.conn.query_row(sql, [], |row| row.get::<_, i64>(0))? as u64)
        };

        Ok(StoreStats {
            total_verified: count("SELECT COUNT(*) FROM verification_log")?,
            valid: count("SELECT COUNT(*) FROM verification_log WHERE status = 'Valid'")?,
            risky: count("SELECT COUNT(*) FROM verification_log WHERE status = 'Risky'")?,
            stored_valid: count("SELECT COUNT(*) FROM valid_emails")?,
        })
    }

    /// Drop the log and the stored valid addresses.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM verification_log", [])?;
        self.conn.execute("DELETE FROM valid_emails", [])?;
        Ok(())
    }
}

/// Timestamps are written as RFC 3339, but a hand-edited or corrupted row
/// must not panic a read; an unparseable one reads as the current time.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Render log entries as CSV, doubling embedded quotes in the detail column.
pub fn log_to_csv(entries: &[LogEntry]) -> String {
    let mut out = String::from("email,status,detail,source,timestamp\n");
    for entry in entries {
        out.push_str(&format!(
            "{},{},\"{}\",{},{}\n",
            entry.email,
            entry.status,
            entry.detail.replace('"', "\"\""),
            entry.source,
            entry.timestamp.to_rfc3339(),
        ));
    }
    out
}

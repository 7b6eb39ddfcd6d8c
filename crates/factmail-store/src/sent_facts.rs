use async_trait::async_trait;
use chrono::{DateTime, Utc};

use factmail_core::{FactCategory, SentFactRecord};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::traits::SentFactLog;

const TABLE: &str = "sent_facts";

/// Append-only `sent_facts` log.
pub struct SentFactRepo {
    db: Database,
}

impl SentFactRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert all records in one transaction.
    pub fn append(&self, records: &[SentFactRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO sent_facts (fact, category, source, sent_at) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for record in records {
                    stmt.execute(rusqlite::params![
                        record.fact,
                        record.category.label(),
                        record.source,
                        row_helpers::format_timestamp(&record.sent_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
    }

    /// Records sent at or after `cutoff`, newest first.
    pub fn recent_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SentFactRecord>, StoreError> {
        let cutoff = row_helpers::format_timestamp(&cutoff);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT fact, category, source, sent_at FROM sent_facts
                 WHERE sent_at >= ?1
                 ORDER BY sent_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([cutoff], |row| Ok(row_to_record(row)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().collect()
        })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sent_facts", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<SentFactRecord, StoreError> {
    let fact: String = row_helpers::get(row, 0, TABLE, "fact")?;
    let category: String = row_helpers::get(row, 1, TABLE, "category")?;
    let source: Option<String> = row_helpers::get_opt(row, 2, TABLE, "source")?;
    let sent_at: String = row_helpers::get(row, 3, TABLE, "sent_at")?;

    Ok(SentFactRecord {
        fact,
        category: FactCategory::from(category),
        source,
        sent_at: row_helpers::parse_timestamp(&sent_at, TABLE, "sent_at")?,
    })
}

#[async_trait]
impl SentFactLog for SentFactRepo {
    async fn recent_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SentFactRecord>, StoreError> {
        SentFactRepo::recent_since(self, cutoff)
    }

    async fn append(&self, records: &[SentFactRecord]) -> Result<usize, StoreError> {
        SentFactRepo::append(self, records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn repo() -> SentFactRepo {
        SentFactRepo::new(Database::in_memory().unwrap())
    }

    fn record(fact: &str, sent_at: DateTime<Utc>) -> SentFactRecord {
        SentFactRecord {
            fact: fact.into(),
            category: FactCategory::RealEstate,
            source: Some("IRS Publication 527".into()),
            sent_at,
        }
    }

    #[test]
    fn append_and_count() {
        let repo = repo();
        let now = Utc::now();
        let n = repo
            .append(&[record("a", now), record("b", now), record("c", now)])
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn append_empty_is_noop() {
        let repo = repo();
        assert_eq!(repo.append(&[]).unwrap(), 0);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn window_excludes_old_records_and_orders_newest_first() {
        let repo = repo();
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 13, 0, 0).unwrap();
        repo.append(&[
            record("ancient", now - Duration::days(90)),
            record("older", now - Duration::days(10)),
            record("newer", now - Duration::days(1)),
        ])
        .unwrap();

        let recent = repo.recent_since(now - Duration::days(60)).unwrap();
        let texts: Vec<_> = recent.iter().map(|r| r.fact.as_str()).collect();
        assert_eq!(texts, vec!["newer", "older"]);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let repo = repo();
        let cutoff = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        repo.append(&[record("edge", cutoff)]).unwrap();
        assert_eq!(repo.recent_since(cutoff).unwrap().len(), 1);
    }

    #[test]
    fn round_trips_fields() {
        let repo = repo();
        let sent_at = Utc.with_ymd_and_hms(2026, 6, 1, 13, 0, 0).unwrap();
        let mut r = record("x", sent_at);
        r.category = FactCategory::Other("Politics".into());
        r.source = None;
        repo.append(std::slice::from_ref(&r)).unwrap();

        let back = repo.recent_since(sent_at - Duration::days(1)).unwrap();
        assert_eq!(back, vec![r]);
    }

    #[test]
    fn corrupt_timestamp_surfaces_as_corrupt_row() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sent_facts (fact, category, source, sent_at) VALUES ('f', 'Health & Wellness', NULL, '9999-bogus')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let repo = SentFactRepo::new(db);
        let err = repo
            .recent_since(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { column: "sent_at", .. }));
    }

    #[tokio::test]
    async fn trait_methods_delegate() {
        let repo = repo();
        let log: &dyn SentFactLog = &repo;
        let now = Utc::now();
        assert_eq!(log.append(&[record("t", now)]).await.unwrap(), 1);
        let recent = log.recent_since(now - Duration::days(1)).await.unwrap();
        assert_eq!(recent.len(), 1);
    }
}

use async_trait::async_trait;
use chrono::Utc;

use factmail_core::Subscriber;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::traits::RecipientDirectory;

/// Subscriber addresses in the `emails` table.
pub struct SubscriberRepo {
    db: Database,
}

impl SubscriberRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All subscribers, oldest first.
    pub fn list(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT email FROM emails ORDER BY id ASC")?;
            let rows = stmt
                .query_map([], |row| Ok(row_helpers::get::<String>(row, 0, "emails", "email")))?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|email| email.map(|email| Subscriber { email }))
                .collect()
        })
    }

    /// Add an address. Returns `false` if it was already present.
    pub fn add(&self, email: &str) -> Result<bool, StoreError> {
        let email = email.trim();
        let now = row_helpers::format_timestamp(&Utc::now());
        self.db.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO emails (email, created_at) VALUES (?1, ?2)",
                rusqlite::params![email, now],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Remove an address. Returns `NotFound` if it was not subscribed.
    pub fn remove(&self, email: &str) -> Result<(), StoreError> {
        let email = email.trim();
        self.db.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM emails WHERE email = ?1", [email])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("subscriber {email}")));
            }
            Ok(())
        })
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }
}

#[async_trait]
impl RecipientDirectory for SubscriberRepo {
    async fn list_recipients(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|s| s.email).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SubscriberRepo {
        SubscriberRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn add_and_list() {
        let repo = repo();
        assert!(repo.add("a@example.com").unwrap());
        assert!(repo.add("b@example.com").unwrap());

        let emails: Vec<_> = repo.list().unwrap().into_iter().map(|s| s.email).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let repo = repo();
        assert!(repo.add("a@example.com").unwrap());
        assert!(!repo.add(" a@example.com ").unwrap());
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn remove_existing_and_missing() {
        let repo = repo();
        repo.add("a@example.com").unwrap();
        repo.remove("a@example.com").unwrap();
        assert_eq!(repo.count().unwrap(), 0);

        let err = repo.remove("a@example.com").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_directory_is_ok() {
        let repo = repo();
        assert!(repo.list_recipients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn directory_lists_addresses() {
        let repo = repo();
        repo.add("x@example.com").unwrap();
        assert_eq!(repo.list_recipients().await.unwrap(), vec!["x@example.com"]);
    }
}

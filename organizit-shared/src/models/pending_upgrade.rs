/// Pending upgrade records
///
/// A pending upgrade binds a payment reference issued at initialize time to
/// the user who requested it, so a later verify can be correlated without
/// any web session. Records expire after a fixed TTL. Once an upgrade goes
/// through, the user's records are marked consumed rather than deleted, so a
/// paid reference can never be presented again by anyone.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE pending_upgrades (
///     reference VARCHAR(64) PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     consumed_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Reference issued for one upgrade attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingUpgrade {
    /// Client-visible reference (e.g. `PAY_3KX9...`)
    pub reference: String,

    /// User the reference was issued to
    pub user_id: Uuid,

    /// When the reference was issued
    pub created_at: DateTime<Utc>,

    /// After this instant the reference can no longer be verified
    pub expires_at: DateTime<Utc>,

    /// Set when the reference produced an upgrade
    pub consumed_at: Option<DateTime<Utc>>,
}

impl PendingUpgrade {
    /// Creates a record issued now that lives for `ttl`
    pub fn new(reference: impl Into<String>, user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            reference: reference.into(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Expired and never used, so safe to drop
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed() && self.is_expired_at(now)
    }
}

const PENDING_COLUMNS: &str = "reference, user_id, created_at, expires_at, consumed_at";

impl PendingUpgrade {
    /// Inserts or replaces a pending upgrade
    ///
    /// The user's stale references (expired, never consumed) are dropped in
    /// the same call, so repeated initializations do not pile up rows.
    pub async fn save(pool: &PgPool, record: &PendingUpgrade) -> Result<(), sqlx::Error> {
        Self::purge_stale_for_user(pool, record.user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO pending_upgrades (reference, user_id, created_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (reference) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                consumed_at = EXCLUDED.consumed_at
            "#,
        )
        .bind(&record.reference)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.consumed_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Finds a pending upgrade by reference (expired and consumed ones included)
    pub async fn find(pool: &PgPool, reference: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PENDING_COLUMNS} FROM pending_upgrades WHERE reference = $1");

        sqlx::query_as::<_, PendingUpgrade>(&query)
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a single reference
    pub async fn delete(pool: &PgPool, reference: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_upgrades WHERE reference = $1")
            .bind(reference)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks every unconsumed reference issued to a user as consumed
    pub async fn consume_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE pending_upgrades
            SET consumed_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a user's expired, unconsumed references
    pub async fn purge_stale_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM pending_upgrades
            WHERE user_id = $1 AND consumed_at IS NULL AND expires_at <= NOW()
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pending_upgrade_not_expired() {
        let record = PendingUpgrade::new("PAY_ABC", Uuid::new_v4(), Duration::minutes(30));
        assert!(!record.is_expired());
        assert_eq!(record.expires_at - record.created_at, Duration::minutes(30));
    }

    #[test]
    fn test_pending_upgrade_expiry_boundary() {
        let record = PendingUpgrade::new("PAY_ABC", Uuid::new_v4(), Duration::minutes(30));
        assert!(!record.is_expired_at(record.expires_at - Duration::seconds(1)));
        assert!(record.is_expired_at(record.expires_at));
        assert!(record.is_expired_at(record.expires_at + Duration::minutes(1)));
    }

    #[test]
    fn test_consumed_record_is_never_stale() {
        let mut record = PendingUpgrade::new("PAY_ABC", Uuid::new_v4(), Duration::minutes(30));
        let later = record.expires_at + Duration::hours(1);
        assert!(!record.is_consumed());
        assert!(record.is_stale_at(later));

        record.consumed_at = Some(record.created_at);
        assert!(record.is_consumed());
        assert!(!record.is_stale_at(later));
        assert!(!record.is_stale_at(record.created_at));
    }
}

//! Client supplied idempotency keys for `createRequest` and `contribute`.
//!
//! A key is looked up and recorded inside the same transaction as the write it
//! protects, so a replay either sees the committed write or none at all.

use crate::{
    entities::{IdempotencyKey, idempotency_key},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Operation name stored for `createRequest`.
pub const CREATE_REQUEST: &str = "create_request";
/// Operation name stored for `contribute`.
pub const CONTRIBUTE: &str = "contribute";

const MAX_KEY_LENGTH: usize = 128;

/// Returns the pool request produced by an earlier call with `key`, if any.
///
/// # Errors
/// [`Error::Validation`] if the key is malformed or was used by another member or
/// for another operation.
pub async fn find_replay<C>(
    conn: &C,
    key: Option<&str>,
    member_id: i64,
    operation: &str,
) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let Some(key) = key else {
        return Ok(None);
    };
    validate_key(key)?;

    let Some(record) = IdempotencyKey::find()
        .filter(idempotency_key::Column::Key.eq(key))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    if record.user_id != member_id || record.operation != operation {
        return Err(Error::validation(
            "idempotency_key",
            "already used for a different operation",
        ));
    }
    Ok(Some(record.pool_request_id))
}

/// Records that `key` produced a write on `pool_request_id`.
pub async fn remember<C>(
    conn: &C,
    key: Option<&str>,
    member_id: i64,
    operation: &str,
    pool_request_id: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(key) = key else {
        return Ok(());
    };
    validate_key(key)?;

    idempotency_key::ActiveModel {
        key: Set(key.to_string()),
        user_id: Set(member_id),
        operation: Set(operation.to_string()),
        pool_request_id: Set(pool_request_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(Error::validation(
            "idempotency_key",
            format!("must be 1-{MAX_KEY_LENGTH} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_no_key_is_never_a_replay() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(find_replay(&db, None, 1, CONTRIBUTE).await?, None);
        remember(&db, None, 1, CONTRIBUTE, 5).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_remembered_key_replays() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(find_replay(&db, Some("abc"), 1, CONTRIBUTE).await?, None);
        remember(&db, Some("abc"), 1, CONTRIBUTE, 5).await?;
        assert_eq!(find_replay(&db, Some("abc"), 1, CONTRIBUTE).await?, Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn test_key_reuse_by_other_member_or_operation() -> Result<()> {
        let db = setup_test_db().await?;
        remember(&db, Some("abc"), 1, CONTRIBUTE, 5).await?;

        let other_member = find_replay(&db, Some("abc"), 2, CONTRIBUTE).await;
        assert!(matches!(other_member, Err(Error::Validation { .. })));

        let other_operation = find_replay(&db, Some("abc"), 1, CREATE_REQUEST).await;
        assert!(matches!(other_operation, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_key_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = find_replay(&db, Some("  "), 1, CONTRIBUTE).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}

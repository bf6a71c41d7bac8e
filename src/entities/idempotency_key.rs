//! Idempotency key entity - Remembers which client keys already produced a write.
//! Lets clients replay a timed-out `createRequest`/`contribute` without a second
//! side effect.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Idempotency record model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idempotency_keys")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Client supplied key
    #[sea_orm(unique)]
    pub key: String,
    /// Member that used the key
    pub user_id: i64,
    /// Operation the key was used for (e.g., `"contribute"`)
    pub operation: String,
    /// Pool request affected by the original call
    pub pool_request_id: i64,
    /// When the key was first seen
    pub created_at: DateTimeUtc,
}

/// Idempotency keys have no foreign keys; they outlive the rows they mention
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Shared test utilities for the pool service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test members, savings and requests with sensible defaults.

use crate::{
    core::{
        PoolRules, PoolService,
        ledger::{self, NewEntry},
        member, money,
        request::RequestDetails,
    },
    entities::{self, KambioKind},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test member with the given name.
pub async fn create_test_member(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::member::Model> {
    member::create_member(db, name).await
}

/// Sets up a test environment with one member.
/// Returns (db, member) for ledger and balance tests.
pub async fn setup_with_member(name: &str) -> Result<(DatabaseConnection, entities::member::Model)> {
    let db = setup_test_db().await?;
    let member = create_test_member(&db, name).await?;
    Ok((db, member))
}

/// Credits `cents` of savings to a member as a plain `save` entry.
///
/// Skips the monthly aggregate; use `PoolService::log_kambio` when that matters.
pub async fn give_savings(
    db: &DatabaseConnection,
    member_id: i64,
    cents: i64,
) -> Result<entities::kambio::Model> {
    ledger::append_entry(
        db,
        NewEntry::new(member_id, KambioKind::Save, cents, "Test savings"),
    )
    .await
}

/// Sets up a database and a service with default rules.
///
/// The service shares the database connection, so data written through `db` is
/// visible to it.
pub async fn setup_service() -> Result<(DatabaseConnection, PoolService)> {
    let db = setup_test_db().await?;
    let service = PoolService::new(db.clone(), PoolRules::default());
    Ok((db, service))
}

/// Creates a pool request for `cents` with a valid default description.
pub async fn create_test_request(
    service: &PoolService,
    member_id: i64,
    cents: i64,
) -> Result<RequestDetails> {
    service
        .create_request(member_id, money::from_cents(cents), "Test pool request", None)
        .await
}

/// Contributes exactly `cents` to a request.
pub async fn contribute_cents(
    service: &PoolService,
    request_id: i64,
    member_id: i64,
    cents: i64,
) -> Result<RequestDetails> {
    service
        .contribute(request_id, member_id, Some(money::from_cents(cents)), None)
        .await
}

//! Pool snapshot - everything the pool screen shows, read in one transaction.

use crate::{
    core::{
        PoolService,
        balance::{self, MemberSavings},
        member::{self, MemberSummary},
        request::{self, RequestDetails},
    },
    entities::RequestStatus,
    errors::Result,
};
use sea_orm::TransactionTrait;

/// `GET /pools/current` payload before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Every member with savings
    pub members: Vec<MemberSummary>,
    /// Requests still accepting contributions, newest first
    pub active_requests: Vec<RequestDetails>,
    /// Funded requests, newest first
    pub completed_requests: Vec<RequestDetails>,
    /// The caller's own savings
    pub user_savings: MemberSavings,
}

impl PoolService {
    /// Reads the pool as seen by `member_id`.
    pub async fn snapshot(&self, member_id: i64) -> Result<PoolSnapshot> {
        let txn = self.db.begin().await?;
        let user_savings = balance::member_savings(&txn, member_id).await?;
        let members = member::list_members_with_savings(&txn).await?;
        let active_requests = request::list_requests_by_status(&txn, RequestStatus::Active).await?;
        let completed_requests =
            request::list_requests_by_status(&txn, RequestStatus::Completed).await?;
        txn.commit().await?;

        Ok(PoolSnapshot {
            members,
            active_requests,
            completed_requests,
            user_savings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_snapshot_splits_requests_by_status() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;

        let funded = create_test_request(&service, requester.id, 1_000).await?;
        let open = create_test_request(&service, requester.id, 8_000).await?;
        let dropped = create_test_request(&service, requester.id, 2_000).await?;
        contribute_cents(&service, funded.request.id, contributor.id, 1_000).await?;
        contribute_cents(&service, open.request.id, contributor.id, 500).await?;
        service.delete_request(dropped.request.id, requester.id).await?;

        let snapshot = service.snapshot(contributor.id).await?;
        assert_eq!(snapshot.members.len(), 2);
        assert_eq!(snapshot.active_requests.len(), 1);
        assert_eq!(snapshot.active_requests[0].request.id, open.request.id);
        assert_eq!(snapshot.completed_requests.len(), 1);
        assert_eq!(snapshot.completed_requests[0].request.id, funded.request.id);
        assert_eq!(snapshot.user_savings.available_cents, 8_500);
        assert_eq!(snapshot.user_savings.committed_cents, 500);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_unknown_member() -> Result<()> {
        let (_db, service) = setup_service().await?;
        let result = service.snapshot(77).await;
        assert!(matches!(result, Err(Error::MemberNotFound { id: 77 })));
        Ok(())
    }
}

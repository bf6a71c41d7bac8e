use std::sync::Arc;

use crate::{
    api::{
        AppState,
        dto::{
            ContributeBody, ContributionRecordView, CreateRequestBody, MemberView, QuoteView,
            RefundSummaryView, RequestView, ShareView, SnapshotView,
        },
        error::ApiResult,
        extract::{ApiJson, ApiPath, CurrentMember, IdempotencyKey},
    },
    core::{member, request},
    errors::Error,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

async fn get_current(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<SnapshotView>> {
    let snapshot = state.service.snapshot(member_id).await?;
    Ok(Json(snapshot.into()))
}

async fn list_members(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<MemberView>>> {
    let members = member::list_members_with_savings(state.service.db()).await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    key: IdempotencyKey,
    ApiJson(body): ApiJson<CreateRequestBody>,
) -> ApiResult<(StatusCode, Json<RequestView>)> {
    let details = state
        .service
        .create_request(member_id, body.amount, &body.description, key.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RequestView>> {
    let details = request::get_request_details(state.service.db(), id).await?;
    Ok(Json(details.into()))
}

async fn calculate_contribution(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<QuoteView>> {
    let quote = state.service.calculate_contribution(id, member_id).await?;
    Ok(Json(quote.into()))
}

async fn distribution(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<ShareView>>> {
    let shares = state.service.distribution(id).await?;
    Ok(Json(shares.into_iter().map(Into::into).collect()))
}

async fn contribute(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    key: IdempotencyKey,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ContributeBody>,
) -> ApiResult<Json<RequestView>> {
    if body.request_id.is_some_and(|body_id| body_id != id) {
        return Err(Error::validation("requestId", "does not match the request in the path").into());
    }
    let details = state
        .service
        .contribute(id, member_id, body.amount, key.as_deref())
        .await?;
    Ok(Json(details.into()))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RefundSummaryView>> {
    let summary = state.service.delete_request(id, member_id).await?;
    Ok(Json(summary.into()))
}

async fn my_requests(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<Vec<RequestView>>> {
    let requests = request::list_requests_for_member(state.service.db(), member_id).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

async fn my_contributions(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<Vec<ContributionRecordView>>> {
    let records = request::list_contributions_for_member(state.service.db(), member_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pools/current", get(get_current))
        .route("/pools/members", get(list_members))
        .route("/pools/requests", post(create_request))
        .route("/pools/requests/my", get(my_requests))
        .route("/pools/contributions/my", get(my_contributions))
        .route("/pools/requests/{id}", get(get_request).delete(delete_request))
        .route(
            "/pools/requests/{id}/calculate-contribution",
            get(calculate_contribution),
        )
        .route("/pools/requests/{id}/contribute", post(contribute))
        .route("/pools/requests/{id}/distribution", get(distribution))
}

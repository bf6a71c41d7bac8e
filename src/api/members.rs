use std::sync::Arc;

use crate::{
    api::{
        AppState,
        dto::{CreateMemberBody, MemberView},
        error::ApiResult,
        extract::{ApiJson, CurrentMember},
    },
    core::member,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

async fn create_member(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateMemberBody>,
) -> ApiResult<(StatusCode, Json<MemberView>)> {
    let member = member::create_member(state.service.db(), &body.name).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<MemberView>> {
    let summary = member::member_summary(state.service.db(), member_id).await?;
    Ok(Json(summary.into()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/members", post(create_member))
        .route("/members/me", get(get_me))
}

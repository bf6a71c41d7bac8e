use std::sync::Arc;

use crate::{
    api::{
        AppState,
        dto::{CompleteGoalBody, CreateGoalBody, GoalView},
        error::ApiResult,
        extract::{ApiJson, ApiPath, CurrentMember},
    },
    core::goal,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

async fn create_goal(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    ApiJson(body): ApiJson<CreateGoalBody>,
) -> ApiResult<(StatusCode, Json<GoalView>)> {
    let goal = goal::create_goal(state.service.db(), member_id, &body.name, body.target_amount)
        .await?;
    Ok((StatusCode::CREATED, Json(goal.into())))
}

async fn my_goals(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<Vec<GoalView>>> {
    let goals = goal::list_goals(state.service.db(), member_id).await?;
    Ok(Json(goals.into_iter().map(Into::into).collect()))
}

async fn complete_goal(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CompleteGoalBody>,
) -> ApiResult<Json<GoalView>> {
    let goal = state
        .service
        .complete_goal(id, member_id, body.amount)
        .await?;
    Ok(Json(goal.into()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/goals", post(create_goal))
        .route("/goals/my", get(my_goals))
        .route("/goals/{id}/complete", post(complete_goal))
}

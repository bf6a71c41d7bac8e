use std::sync::Arc;

use crate::{
    api::{
        AppState,
        dto::{CreateKambioBody, KambioView, MonthlySavingsView},
        error::ApiResult,
        extract::{ApiJson, CurrentMember},
    },
    core::{
        kambio::{self, NewKambio},
        savings,
    },
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

async fn log_kambio(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
    ApiJson(body): ApiJson<CreateKambioBody>,
) -> ApiResult<(StatusCode, Json<KambioView>)> {
    let entry = state
        .service
        .log_kambio(
            member_id,
            NewKambio {
                amount: body.amount,
                description: body.description,
                goal_id: body.goal_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

async fn my_kambios(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<Vec<KambioView>>> {
    let entries = kambio::list_kambios(state.service.db(), member_id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

async fn monthly_savings(
    State(state): State<Arc<AppState>>,
    CurrentMember(member_id): CurrentMember,
) -> ApiResult<Json<Vec<MonthlySavingsView>>> {
    let rows = savings::monthly_savings(state.service.db(), member_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/kambios", post(log_kambio))
        .route("/kambios/my", get(my_kambios))
        .route("/savings/monthly", get(monthly_savings))
}

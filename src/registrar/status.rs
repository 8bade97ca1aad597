//! REST v1 system status.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::{RestApi, ServiceContext};
use crate::http::error::ApiResult;
use crate::store::SettingKey;

/// Serves `GET /status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusApi;

impl RestApi for StatusApi {
    fn routes(&self, ctx: &ServiceContext) -> Router {
        Router::new()
            .route("/status", get(get_status))
            .with_state(ctx.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub mode: &'static str,
    pub disallow_sign_up: bool,
}

async fn get_status(State(ctx): State<ServiceContext>) -> ApiResult<Json<SystemStatus>> {
    let disallow_sign_up = ctx
        .store
        .find(SettingKey::DisallowSignUp)
        .await?
        .is_some_and(|setting| setting.value == "true");

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        mode: ctx.mode.as_str(),
        disallow_sign_up,
    }))
}

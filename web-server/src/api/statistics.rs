// web-server/src/api/statistics.rs
use std::collections::BTreeMap;
use actix_web::{get, web, HttpResponse};
use common::Role;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::realtime::registry::ConnectionCount;

#[derive(Debug, Serialize)]
pub struct StatisticsSummary {
    pub staff_total: usize,
    pub staff_by_role: BTreeMap<Role, usize>,
    pub online_connections: usize,
}

#[get("")]
pub async fn summary(ctx: web::Data<AppContext>) -> Result<HttpResponse, ApiError> {
    let principals = ctx.accounts.principals().await;

    let mut staff_by_role: BTreeMap<Role, usize> = Role::ALL.into_iter().map(|r| (r, 0)).collect();
    for principal in &principals {
        *staff_by_role.entry(principal.role).or_default() += 1;
    }

    let online_connections = ctx
        .registry
        .send(ConnectionCount)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(StatisticsSummary {
        staff_total: principals.len(),
        staff_by_role,
        online_connections,
    }))
}

use std::net::IpAddr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::AdminState;
use crate::routing::TableStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub ready: bool,
    pub lists: usize,
    pub entries: TableStats,
}

#[derive(Serialize)]
pub struct Location {
    pub address: IpAddr,
    /// `None` when no prefix covers the address.
    pub location: Option<String>,
}

pub async fn get_ready(State(state): State<AdminState>) -> StatusCode {
    if state.adapter.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        ready: state.adapter.is_ready(),
        lists: state.adapter.list_count(),
        entries: state.table.stats(),
    })
}

pub async fn get_locate(State(state): State<AdminState>, Path(ip): Path<String>) -> Response {
    let address: IpAddr = match ip.parse() {
        Ok(address) => address,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("invalid IP address: {ip}") })),
            )
                .into_response()
        }
    };

    let location = state
        .table
        .locate(address)
        .map(|label| label.to_string());

    Json(Location { address, location }).into_response()
}

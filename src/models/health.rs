use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Symbols the collector refreshes
    pub tracked_symbols: Vec<String>,
}

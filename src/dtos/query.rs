//! Query DTOs - Data Transfer Objects for query strings

use serde::{Deserialize, Serialize};

/// Message pagination parameters
///
/// Missing values fall back to the configured defaults (50 / 0).
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PaginationQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

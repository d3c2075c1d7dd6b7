pub mod dictionaries;
pub mod employees;
pub mod health;
pub mod projects;
pub mod requests;

use serde::{Deserialize, Serialize};

/// `?populate=true` on single-record reads.
#[derive(Debug, Default, Deserialize)]
pub struct PopulateParams {
    #[serde(default)]
    pub populate: bool,
}

/// Body returned by link endpoints.
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> axum::Json<Self> {
        axum::Json(Self { success: true })
    }
}

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Common pagination query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct PaginationParams {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl PaginationParams {
    /// Clamp caller-supplied values into a sane window.
    pub fn normalized(&self) -> (u64, u64) {
        (self.page.max(1), self.per_page.clamp(1, 100))
    }
}

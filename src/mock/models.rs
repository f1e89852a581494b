use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthStatus {
    /// Status string (UP, DOWN, etc.)
    pub status: String,

    /// Service name
    pub name: String,

    /// Service version
    pub version: String,

    /// Current timestamp
    pub timestamp: String,
}

/// `skip`/`limit` query parameters of the list endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub skip: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: 10 }
    }
}

impl Pagination {
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items.iter().skip(self.skip).take(self.limit).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub id: u64,
    pub user_id: Option<u64>,
    pub product_id: Option<u64>,
    pub quantity: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `POST /orders`
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub user_id: Option<u64>,
    pub product_id: Option<u64>,
    #[serde(default = "default_quantity")]
    pub quantity: u64,
}

fn default_quantity() -> u64 {
    1
}

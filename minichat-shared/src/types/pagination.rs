use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COUNT: u32 = 20;
pub const MAX_COUNT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Cursor-style window over a timeline: the `count` entries closest to
/// `before`, returned in `sort` order.
#[derive(Debug, Clone, Deserialize)]
pub struct CursorParams {
    pub before: Option<DateTime<Utc>>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub sort: SortOrder,
}

fn default_count() -> u32 { DEFAULT_COUNT }

impl CursorParams {
    pub fn before_or_now(&self) -> DateTime<Utc> {
        self.before.unwrap_or_else(Utc::now)
    }

    /// Requested count clamped to `1..=max`.
    pub fn limit(&self, max: u32) -> u32 {
        self.count.clamp(1, max.max(1))
    }
}

impl Default for CursorParams {
    fn default() -> Self {
        Self { before: None, count: DEFAULT_COUNT, sort: SortOrder::Asc }
    }
}

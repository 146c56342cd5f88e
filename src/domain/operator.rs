//! Operator identity

use serde::{Deserialize, Serialize};

/// Signed-in operator, as reported by Discord's `/users/@me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Discord snowflake id
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Operator {
    /// Name shown in the dashboard header
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

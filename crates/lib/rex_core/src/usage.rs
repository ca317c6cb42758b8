//! Monthly usage statistics over a user's rooms.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::chat::ChatRoom;

/// Message total for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    /// `YYYY-MM`, from the room's creation time (UTC).
    pub month: String,
    pub total_messages: i64,
}

/// Sum `total_messages` per month of room creation, ascending by month.
pub fn monthly_usage(rooms: &[ChatRoom]) -> Vec<MonthlyUsage> {
    let mut by_month: BTreeMap<String, i64> = BTreeMap::new();
    for room in rooms {
        *by_month
            .entry(room.created_at.format("%Y-%m").to_string())
            .or_default() += room.total_messages;
    }
    by_month
        .into_iter()
        .map(|(month, total_messages)| MonthlyUsage {
            month,
            total_messages,
        })
        .collect()
}

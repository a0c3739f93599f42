use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::timestamp;

/// Status of a work order in the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::OnHold => "on_hold",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work order in the client's file format.
///
/// Only `orderNo` is mandatory at the type level. Inbound files must also
/// carry `isCanceled`, `isDeleted` and `creationDate`, which is checked by
/// [`validate_inbound`](crate::validate_inbound). Outbound copies produced by
/// [`to_external`](crate::to_external) fill every field except `deletedDate`.
///
/// Field order matches the order the client expects in outbound files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalWorkOrder {
    pub order_no: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_on_hold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_canceled: Option<bool>,
    /// Only meaningful on outbound copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_synced: Option<bool>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_date: Option<String>,
}

/// A work order as stored in the system of record.
///
/// `number` is the business key shared with [`ExternalWorkOrder::order_no`].
/// Missing timestamps in a stored document decode as the current instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalWorkOrder {
    pub number: i64,
    pub status: Status,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default = "OffsetDateTime::now_utc", with = "timestamp::serde")]
    pub created_at: OffsetDateTime,
    #[serde(default = "OffsetDateTime::now_utc", with = "timestamp::serde")]
    pub updated_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde::option"
    )]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_synced: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::serde::option"
    )]
    pub synced_at: Option<OffsetDateTime>,
}

impl InternalWorkOrder {
    /// Create a pending, unsynced work order stamped with the current time.
    pub fn new(number: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        InternalWorkOrder {
            number,
            status: Status::Pending,
            title: String::new(),
            description: String::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            is_synced: false,
            synced_at: None,
        }
    }

    /// Whether the fields that decide if an inbound copy needs writing
    /// (`description`, `status`, `title`, `deleted`) are equal.
    pub fn same_sync_fields(&self, other: &InternalWorkOrder) -> bool {
        self.description == other.description
            && self.status == other.status
            && self.title == other.title
            && self.deleted == other.deleted
    }
}

//! Field-level mapping between the client's boolean-flag records and the
//! system of record's enum-status records.
//!
//! Both directions are total: missing optional fields and unparseable dates
//! never fail, they fall back to empty strings, `false`, or the current
//! instant.

use crate::model::{ExternalWorkOrder, InternalWorkOrder, Status};
use crate::timestamp;

/// The four client status flags derived from a [`Status`].
///
/// `InProgress` has no flag of its own in the client vocabulary, so it maps
/// to all four flags being `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_pending: bool,
    pub is_done: bool,
    pub is_on_hold: bool,
    pub is_canceled: bool,
}

impl From<Status> for StatusFlags {
    fn from(status: Status) -> Self {
        StatusFlags {
            is_pending: status == Status::Pending,
            is_done: status == Status::Completed,
            is_on_hold: status == Status::OnHold,
            is_canceled: status == Status::Cancelled,
        }
    }
}

/// Resolve the effective status of a client record.
///
/// The flags are not mutually exclusive in client data, so the first match
/// in this order wins: done, on hold, canceled, explicitly not pending
/// (in progress), otherwise pending. `isDeleted` does not take part.
pub fn status_from_flags(external: &ExternalWorkOrder) -> Status {
    if external.is_done.unwrap_or(false) {
        Status::Completed
    } else if external.is_on_hold.unwrap_or(false) {
        Status::OnHold
    } else if external.is_canceled.unwrap_or(false) {
        Status::Cancelled
    } else if !external.is_pending.unwrap_or(true) {
        Status::InProgress
    } else {
        Status::Pending
    }
}

/// Translate a client record into the system-of-record shape.
///
/// The result is unsynced; the store decides the final `createdAt` /
/// `updatedAt` when it writes the record.
pub fn to_internal(external: &ExternalWorkOrder) -> InternalWorkOrder {
    let deleted = external.is_deleted.unwrap_or(false);
    let deleted_at = match (&external.deleted_date, deleted) {
        (Some(raw), true) => Some(timestamp::parse_or_now(Some(raw))),
        _ => None,
    };

    InternalWorkOrder {
        number: external.order_no,
        status: status_from_flags(external),
        title: external.summary.clone().unwrap_or_default(),
        description: external.description.clone().unwrap_or_default(),
        deleted,
        created_at: timestamp::parse_or_now(external.creation_date.as_deref()),
        updated_at: timestamp::parse_or_now(external.last_update_date.as_deref()),
        deleted_at,
        is_synced: false,
        synced_at: None,
    }
}

/// Translate a system-of-record work order into the client format.
///
/// Producing this representation is what synchronizes the record, so the
/// result always carries `isSynced: true`.
pub fn to_external(internal: &InternalWorkOrder) -> ExternalWorkOrder {
    let flags = StatusFlags::from(internal.status);
    let deleted_date = if internal.deleted {
        internal.deleted_at.map(timestamp::format)
    } else {
        None
    };

    ExternalWorkOrder {
        order_no: internal.number,
        summary: Some(internal.title.clone()),
        description: Some(internal.description.clone()),
        creation_date: Some(timestamp::format(internal.created_at)),
        last_update_date: Some(timestamp::format(internal.updated_at)),
        is_deleted: Some(internal.deleted),
        is_pending: Some(flags.is_pending),
        is_done: Some(flags.is_done),
        is_on_hold: Some(flags.is_on_hold),
        is_canceled: Some(flags.is_canceled),
        is_synced: Some(true),
        deleted_date,
    }
}

//! Acceptance policy for raw inbound records.

use serde_json::Value;

use crate::model::ExternalWorkOrder;

/// Fields every inbound record must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["orderNo", "isCanceled", "isDeleted", "creationDate"];

/// Why a raw inbound record was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("`orderNo` must be an integer, got {0}")]
    InvalidOrderNo(Value),

    #[error("malformed work order: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Turn a parsed inbound JSON object into a typed [`ExternalWorkOrder`].
///
/// The record is accepted only when `orderNo` is an integer, every known
/// field has the expected type, and the remaining [`REQUIRED_FIELDS`] are
/// present and non-null.
pub fn validate_inbound(raw: Value) -> Result<ExternalWorkOrder, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    match obj.get("orderNo") {
        None | Some(Value::Null) => return Err(ValidationError::MissingField("orderNo")),
        Some(v) if !v.is_i64() => return Err(ValidationError::InvalidOrderNo(v.clone())),
        Some(_) => {}
    }

    let order: ExternalWorkOrder = serde_json::from_value(raw)?;
    // Stricter than a presence check: a key set to `null` decodes to `None`
    // and is rejected as missing.
    if order.is_canceled.is_none() {
        return Err(ValidationError::MissingField("isCanceled"));
    }
    if order.is_deleted.is_none() {
        return Err(ValidationError::MissingField("isDeleted"));
    }
    if order.creation_date.is_none() {
        return Err(ValidationError::MissingField("creationDate"));
    }
    Ok(order)
}

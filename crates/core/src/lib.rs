//! Work-order data model and the pure translation between the client
//! (external) and system-of-record (internal) representations.
//!
//! Nothing in this crate performs I/O. Storage lives in `workbridge-storage`
//! and the filesystem adapter plus the sync loop live in `workbridge-sync`.

pub mod model;
pub mod timestamp;
pub mod translate;
pub mod validate;

pub use model::{ExternalWorkOrder, InternalWorkOrder, Status};
pub use translate::{status_from_flags, to_external, to_internal, StatusFlags};
pub use validate::{validate_inbound, ValidationError, REQUIRED_FIELDS};

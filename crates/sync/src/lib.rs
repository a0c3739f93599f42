pub mod external;
pub mod orchestrator;
pub mod report;

pub use external::{
    ExternalStore, ExternalStoreError, FsExternalStore, InboundBatch, InboundEntry, InboundPolicy,
    InboundPolicyKind, UnknownPolicy,
};
pub use orchestrator::Orchestrator;
pub use report::CycleReport;

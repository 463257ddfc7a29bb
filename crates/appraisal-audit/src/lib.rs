//! # appraisal-audit
//!
//! Audit trail for appraisal outcome actions.
//!
//! Every lifecycle step of an action execution is recorded as an
//! [`AuditEvent`], including operations that were refused:
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `ActionTriggered` | A rule fired and a pending execution was created |
//! | `ActionExecuted` | The action was performed |
//! | `ActionOverridden` | A second party approved skipping the action |
//! | `ActionDismissed` | An advisory action was dismissed |
//! | `ActionAcknowledged` | An executed action was acknowledged |
//! | `TransitionRejected` | A lifecycle operation was refused |
//!
//! Events go to a pluggable [`AuditStorage`]: JSON Lines file, console,
//! memory, or nowhere.

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{
    AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage,
};

//! Audit driver core: the value and record types, capability traits,
//! execution context and errors shared by the SQL analysis crate and the
//! connection decorator.

pub mod context;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use context::ExecContext;
pub use error::{
    AuditError, BuildError, Capability, CapabilityTarget, EngineError, EngineResult, Identity,
};
pub use record::{ModificationAction, ModificationRecord};
pub use traits::{Connection, Execer, Preparer, Queryer, Transactional};
pub use types::*;

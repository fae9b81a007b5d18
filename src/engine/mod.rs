// Data Engine Module
// Connection capabilities and the drivers implementing them

pub mod drivers;

pub use sqlaudit_core::error::{EngineError, EngineResult};
pub use sqlaudit_core::traits::{Connection, Execer, Preparer, Queryer, Transactional};
pub use sqlaudit_core::types::*;

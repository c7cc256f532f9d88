pub mod compose;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod flows;
pub mod http;
pub mod logger;
pub mod model;
pub mod prompt;
pub mod store;
pub mod utils;
pub mod vault;
pub mod workbench;

// Re-export commonly used types
pub use coordinator::{ConsistencyReport, PersistenceCoordinator, SaveOutcome};
pub use error::{PostcodeError, Result};
pub use workbench::Workbench;

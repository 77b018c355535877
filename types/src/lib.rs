// ========== Core Modules ==========
pub mod column; // Column types and bound values
pub mod consistency;
pub mod host; // Host identity and liveness
pub mod statement; // Prepared / bound / batch statements

// Export from column module
pub use column::{ColumnType, Value};

// Export from consistency module
pub use consistency::{ConsistencyLevel, ParseConsistencyError};

// Export from host module
pub use host::{Host, DEFAULT_PORT};

// Export from statement module
pub use statement::{
    BatchStatement, BoundStatement, ColumnSpec, PreparedStatement, SimpleStatement, Statement,
};

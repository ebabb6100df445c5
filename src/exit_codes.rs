//! Exit code standardization for poolcost
//!
//! - `0` = Success
//! - `2` = System error (failed fetch, network error, I/O)
//! - `3` = Configuration error (config parse error, unreadable price table)

use crate::error::PoolCostError;

/// Standard exit codes for poolcost
pub mod codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// System error (HTTP failure, network error)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error (bad config file, missing price data)
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a PoolCostError to an appropriate exit code
pub fn exit_code_for_error(error: &PoolCostError) -> i32 {
    use PoolCostError::*;
    match error {
        // The run cannot start without its configuration or price data
        Config(_) => codes::CONFIG_ERROR,
        PriceTable { .. } => codes::CONFIG_ERROR,

        Fetch { .. } => codes::SYSTEM_ERROR,
        Http(_) => codes::SYSTEM_ERROR,
        Parse(_) => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Map an anyhow error from the CLI layer, falling back to a system error
/// when it does not wrap a `PoolCostError`.
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PoolCostError>()
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}

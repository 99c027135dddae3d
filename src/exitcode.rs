//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (invalid tree change or snapshot)
pub const DATAERR: i32 = 65;

/// Referenced category or entry does not exist
pub const NOINPUT: i32 = 66;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure; retry later (tenant busy)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;

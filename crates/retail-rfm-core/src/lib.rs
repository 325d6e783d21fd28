pub mod cleaning;
pub mod error;
pub mod schema;
pub mod types;

#[cfg(feature = "kpi")]
pub mod kpi;

#[cfg(feature = "rfm")]
pub mod rfm;

pub use error::RfmError;
pub use types::*;

/// Standard result type for all retail-rfm operations
pub type RfmResult<T> = Result<T, RfmError>;

//! Integrity verification: digest checks, checksum-file parsing, and the concurrent
//! orchestration that aggregates them into a pass/fail verdict.

pub mod checksum_file;
pub mod digest;
pub mod error;
pub mod service;
pub mod types;

pub use error::{VerificationError, VerificationOutcome};
pub use service::verify_file;
pub use types::{MethodResult, VerificationConfig, VerificationResult};

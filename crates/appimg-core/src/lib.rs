pub mod collaborators;
pub mod config_store;
pub mod context;
pub mod desktop;
pub mod error;
pub mod file_ops;
pub mod icon;
pub mod orchestrator;
pub mod types;

pub use collaborators::{CatalogEntry, CatalogProvider, GlobalConfigProvider};
pub use context::InstallerContext;
pub use error::{InstallerError, InstallerResult};
pub use orchestrator::install;
pub use types::{
    AppConfigRecord, ErrorKind, IconPolicy, IconRecord, InstallOptions, InstallSource,
    PerTargetOutcome, StateRecord, Target, UrlOverrides, VerificationPolicy, VerificationRecord,
};

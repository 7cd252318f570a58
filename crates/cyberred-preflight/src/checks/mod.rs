//! The six shipped pre-flight checks named in spec.md §4.K.

pub mod data_store;
pub mod llm;
pub mod resources;
pub mod scope_file;
pub mod tls;

pub use data_store::{DataStoreCheck, DataStoreHealth};
pub use llm::{LlmHealth, LlmReachabilityCheck};
pub use resources::{DiskFreeCheck, MemoryAvailableCheck};
pub use scope_file::ScopeFileCheck;
pub use tls::TlsCertificateCheck;

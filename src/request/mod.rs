//! Request description and transport-configuration assembly.

pub mod assembler;
pub mod descriptor;

pub use assembler::{CookieStore, DEFAULT_TIMEOUT_SECS, ResolvedTransportConfig, assemble};
pub use descriptor::{HeaderList, RequestDescriptor};

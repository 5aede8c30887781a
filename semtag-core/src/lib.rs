//! semtag Core - Data Types
//!
//! Pure data structures shared by every other crate: component identity,
//! semantic versions, the four-segment tag wire format, embedded headers,
//! discovery rules and configuration. No git, no filesystem writes.

mod config;
mod discovery;
mod entities;
mod enums;
mod error;
mod header;
mod identity;
mod tag;
mod version;

pub use config::*;
pub use discovery::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use header::*;
pub use identity::*;
pub use tag::*;
pub use version::*;

//! Shared types and wire format for catdiff.
//!
//! Catalog documents ([`declcfg`]), typed bundle properties ([`property`]),
//! semver ranges ([`range`]) and the user-facing include configuration
//! ([`include`]).

pub mod declcfg;
pub mod include;
pub mod property;
pub mod range;

// Re-exports
pub use declcfg::{DeclarativeConfig, DeclcfgError};
pub use include::{Bound, Bounds, IncludeBundle, IncludeChannel, IncludeConfig, IncludePackage};
pub use property::{Gvk, Properties, Property};
pub use range::{RangeError, VersionRange};

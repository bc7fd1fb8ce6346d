pub mod diff;
pub mod images;
pub mod include;
pub mod model;
pub mod state;

pub use diff::{DEFAULT_FALLBACK_CHANNEL, DiffError, DiffGenerator};
pub use images::{ImageRef, related_images};
pub use include::DiffIncluder;
pub use model::{Model, ModelError};
pub use state::{StateError, include_config_from_catalog, update_include_config};

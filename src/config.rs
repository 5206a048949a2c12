//! Configuration loader and schema types.
//!
//! Settings are owned by the top-level application context and handed to
//! the subsystems that need them; nothing here is global.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;

//! Shared types for the companion host
//!
//! Wire formats exchanged with the renderer shell, the canonical guidance
//! content shape, and the logging conventions every binary uses.

pub mod endpoint;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use endpoint::derive_base_url;
pub use errors::*;
pub use messages::*;
pub use types::*;

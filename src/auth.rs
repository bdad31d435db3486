//! Bearer-credential middleware and the client-credentials token manager.

pub mod layer;
pub mod manager;
pub mod secret;

pub use layer::*;
pub use manager::*;
pub use secret::*;

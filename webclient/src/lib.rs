// exported modules
pub mod error;
pub mod model;
pub mod sign;

// client impl
pub mod client;

// re-exports
pub use client::RemoteJudgeClient;
pub use error::*;
pub use model::*;

pub mod client;
pub mod response;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::{Dispatcher, TransportOptions};
pub use response::{ErrorKind, Response, ResponseError, ResponseHeader};
pub use types::{Method, Status};

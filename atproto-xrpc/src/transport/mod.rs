//! Transport layer abstraction.
//!
//! A transport performs exactly one attempt of an XRPC call:
//! - HTTP via reqwest for real services
//! - A scripted mock for tests and diagnostics

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpTransport;
pub use mock::MockTransport;
pub use traits::XrpcTransport;

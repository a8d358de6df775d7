//! Framed TCP codec, wire verbs, and the job-identity handshake shared by
//! the coordinator and the worker.

pub mod endpoint;
pub mod error;
pub mod handshake;
pub mod listener;
pub mod verbs;

pub use endpoint::FramedEndpoint;
pub use error::ProtocolError;
pub use handshake::handshake;
pub use listener::Listener;
pub use verbs::Verb;

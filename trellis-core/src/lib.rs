// Core library for the Trellis container
// Component descriptors, discovery, bean registry, injection, routing and dispatch

pub mod application;
pub mod component;
pub mod container;
pub mod context;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod injector;
pub mod logging;
pub mod routing;

// Re-export commonly used types
pub use application::*;
pub use component::*;
pub use container::*;
pub use context::*;
pub use discovery::*;
pub use dispatcher::*;
pub use error::*;
pub use self::http::*;
pub use injector::*;
pub use routing::*;

// Used by `register_component!`
#[doc(hidden)]
pub use inventory;

//! Transformable Marker Server
//!
//! Registry of focus-tracked Box/Cylinder/Torus objects and interactive
//! markers for URDF models, publishing through an [`Outbox`] and resolving
//! frames through a [`TransformLookup`].

pub mod config;
pub mod marker_server;
pub mod model_marker;
pub mod outbox;
pub mod registry;
pub mod request;
pub mod tf;

pub use config::*;
pub use marker_server::*;
pub use model_marker::*;
pub use outbox::*;
pub use registry::*;
pub use request::*;
pub use tf::*;

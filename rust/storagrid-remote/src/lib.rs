#![warn(missing_docs)]

//! Remote access to object-storage containers through the storage-management
//! API.
//!
//! The [`ContainerReader`] assembles a container's full state from several
//! independently addressable sub-resources, fetching them concurrently and
//! reporting every failure rather than the first one. [`ContainerClient`] and
//! [`PolicyClient`] wrap the remaining container and access-policy calls. All
//! of them talk to the API through a [`Transport`], of which
//! [`RestTransport`] is the HTTP implementation and [`MemoryTransport`] the
//! scripted one used in tests.

mod client;
pub use client::*;

mod container;
pub use container::*;

mod error;
pub use error::*;

mod policy;
pub use policy::*;

mod reader;
pub use reader::*;

pub mod transport;
pub use transport::{
    AuthMethod, MemoryTransport, RestTransport, RestTransportConfig, Transport, TransportError,
};

pub use storagrid_policy::{PolicyDocument, PolicyError};

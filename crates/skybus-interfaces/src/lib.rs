//! Interface registry and payload validation.
//!
//! Interfaces are the typed contracts a device and the platform agree on.
//! Each one is described by a JSON descriptor carrying a name, a two-part
//! version, a (type, ownership, aggregation) triple and a list of endpoint
//! mappings. This crate turns descriptors into validated in-memory
//! interfaces, resolves concrete paths against parametric endpoint templates,
//! type-checks outgoing payloads and encodes the introspection line the
//! transport advertises on connect.
//!
//! What lives where:
//!
//! - [`descriptor`]: serde model of descriptor JSON
//! - [`interface`]: validated interfaces and the six behavioural families
//! - [`mapping`]: endpoint templates, matching and value checks
//! - [`registry`]: the installed set and its introspection encoding
//! - [`store`]: persistence seam for property values
//! - [`types`]: wire types and owned payload values

pub mod descriptor;
pub mod error;
pub mod interface;
pub mod mapping;
pub mod registry;
pub mod store;
pub mod types;

pub use descriptor::{
    Aggregation, InterfaceDescriptor, InterfaceType, MappingDescriptor, Ownership,
};
pub use error::{InterfaceError, ValueError};
pub use interface::{Interface, InterfaceKind};
pub use mapping::EndpointMapping;
pub use registry::InterfaceRegistry;
pub use store::{PropertyStore, StoreError};
pub use types::{encode_timestamp, DataValue, MappingType, Reliability, Retention};

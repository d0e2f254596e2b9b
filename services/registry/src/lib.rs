//! Stream registry control-plane library crate.
//!
//! # Purpose
//! Holds the metadata registry for a streaming platform: domains, schemas, streams, the
//! infrastructure they run on, the bindings between them, and the processes that read and
//! write those bindings. Entities of every kind live in one log-backed [`store::EntityStore`];
//! per-kind [`service::EntityService`]s enforce creation, update, and deletion invariants and
//! delegate derivation and side effects to pluggable [`handler::Handler`]s.
//!
//! # Notes
//! [`registry::Registry`] wires the default services; the binary only adds configuration,
//! observability, and the `/metrics` and `/health` endpoints.
pub mod app;
pub mod authz;
pub mod config;
pub mod error;
pub mod graph;
pub mod handler;
pub mod model;
pub mod observability;
pub mod registry;
pub mod service;
pub mod store;
pub mod validator;
pub mod view;

pub use error::{HandlerError, RegistryError, RegistryResult, ValidationError};
pub use registry::Registry;

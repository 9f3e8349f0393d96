//! Wire types for the photo filter service.
//!
//! This crate contains the serde-serializable types exchanged with the remote
//! filter service, both over its HTTP API and over the processing push channel.
//! These types represent the "protocol layer" - the shapes of data as they
//! appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and decoding
//! * Strict: Required fields are not optional, so a response missing an id
//!   fails to deserialize instead of yielding an empty value downstream
//! * Stable: Changes only when the wire protocol changes
//!
//! Higher-level orchestration is built on top of these types in `snapfilter`.

pub mod action;
pub mod auth;
pub mod catalog;
pub mod push;
pub mod resource;

pub use action::*;
pub use auth::*;
pub use catalog::*;
pub use push::*;
pub use resource::*;

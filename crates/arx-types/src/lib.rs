//! Foundation types for the Arx building version-control engine.
//!
//! This crate provides the identifier, clock, and live-entity types shared by
//! every other `arx-*` crate.
//!
//! # Key Types
//!
//! - [`ObjectId`]: content-addressed identifier (BLAKE3 hash, hex on the wire)
//! - [`Clock`]: injected time source; [`SystemClock`] and [`FixedClock`]
//! - [`Building`], [`Floor`], [`Room`], [`Equipment`], [`BasPoint`], [`Attachment`]:
//!   the live building graph that snapshots are built from and rollback restores

pub mod clock;
pub mod entity;
pub mod error;
pub mod object;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::{Attachment, BasPoint, Building, Equipment, Floor, Location3, Room};
pub use error::TypeError;
pub use object::ObjectId;

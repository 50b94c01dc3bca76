//! Archive store: an append-only, memory-mapped, content-addressed table
//! engine for a Bitcoin full-node archive (headers, transactions,
//! inputs/outputs, candidate/confirmed chains, filter indexes).
//!
//! Three layers, bottom to top:
//! - [`file`]: memory-mapped storage, the advisory flush lock, plain
//!   file/directory utilities.
//! - [`primitives`]: the two table shapes, `nomap` and `hashmap`, each
//!   generic over a fixed-size or slab [`primitives::Record`].
//! - [`tables`], [`store`], [`query`]: concrete per-table schemas, the
//!   `Store` owning one instance per table, and the stateless `Query`
//!   translate layer navigating the resulting graph.

pub mod associations;
pub mod config;
pub mod error;
pub mod events;
pub mod file;
pub mod link;
pub mod primitives;
pub mod query;
pub mod store;
pub mod tables;
pub mod varint;

pub use associations::{Association, Associations, Context};
pub use config::{Configuration, TableSettings};
pub use error::{Error, ErrorKind, Result};
pub use events::{Event, EventHandler, Table};
pub use link::{Link, LinkSize};
pub use query::Query;
pub use store::Store;

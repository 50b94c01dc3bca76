//! Primitive layer (spec.md §4.3-§4.4): the two table shapes — `nomap`
//! (position-addressed, no index) and `hashmap` (bucketed chained index) —
//! each parameterized over a [`record::Record`] payload and, for hashmap,
//! a [`record::Key`].

pub mod hashmap;
pub mod head;
pub mod nomap;
pub mod record;

pub use hashmap::{HashmapIterator, HashmapTable};
pub use head::HeadFile;
pub use nomap::NomapTable;
pub use record::{HashKey, Key, LinkKey, PointKey, Record, NULL_INDEX};

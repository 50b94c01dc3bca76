//! Concrete per-table record schemas (SPEC_FULL.md §4): fixed/slab
//! instantiations of the two primitive table shapes, one module per
//! logical table.

pub mod chain;
pub mod header;
pub mod neutrino;
pub mod outs;
pub mod output;
pub mod point;
pub mod strong_tx;
pub mod tx;
pub mod txs;

pub use chain::{ChainEntry, ChainTable};
pub use header::{Header, HeaderTable};
pub use neutrino::{Neutrino, NeutrinoTable};
pub use outs::{Outs, OutsTable};
pub use output::{Output, OutputTable};
pub use point::{Point, PointTable};
pub use strong_tx::{StrongTx, StrongTxTable};
pub use tx::{Tx, TxTable};
pub use txs::{Txs, TxsTable};

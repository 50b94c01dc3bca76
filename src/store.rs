//! The `Store`: owns one primitive instance per logical table and drives
//! their shared lifecycle (create/open/backup/restore/close), notifying
//! the caller-supplied [`EventHandler`] at the points named in spec.md §6.

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::error::{Error, ErrorKind, Result};
use crate::events::{Event, EventHandler, Table as EventTable};
use crate::file::utilities;
use crate::file::FileLock;
use crate::tables::{
    ChainTable, HeaderTable, NeutrinoTable, OutputTable, OutsTable, PointTable, StrongTxTable, TxTable,
    TxsTable,
};

/// A directory-backed Bitcoin archive: every table's head/body file pair,
/// plus the flush lock (crash marker, held for the writable session) and
/// the process lock (held for the store's entire lifetime) (spec.md §4.2).
pub struct Store {
    path: PathBuf,
    flush_lock: FileLock,
    process_lock: FileLock,
    handler: Option<EventHandler>,

    pub header: HeaderTable,
    pub tx: TxTable,
    pub point: PointTable,
    pub output: OutputTable,
    pub outs: OutsTable,
    pub txs: TxsTable,
    pub strong_tx: StrongTxTable,
    pub candidate: ChainTable,
    pub confirmed: ChainTable,
    pub neutrino: NeutrinoTable,
}

impl Store {
    fn notify(&self, event: Event, table: EventTable) {
        if let Some(handler) = &self.handler {
            handler(event, table);
        }
    }

    /// Create a fresh archive directory and every table's files.
    pub fn create(config: &Configuration, handler: Option<EventHandler>) -> Result<Self> {
        if !utilities::create_directory(&config.path) {
            return Err(Error::new(ErrorKind::FileOpen));
        }
        let process_lock = FileLock::new(config.path.join("process.lock"));
        if !process_lock.create() {
            return Err(Error::new(ErrorKind::LockFailure));
        }
        let flush_lock = FileLock::new(config.path.join("flush.lock"));
        if !flush_lock.create() {
            let _ = process_lock.destroy();
            return Err(Error::new(ErrorKind::LockFailure));
        }

        let path = config.path.clone();
        let h = config.table("header");
        let t = config.table("tx");
        let p = config.table("point");
        let o = config.table("output");
        let os = config.table("outs");
        let ts = config.table("txs");
        let st = config.table("strong_tx");
        let c = config.table("candidate");
        let cf = config.table("confirmed");
        let n = config.table("neutrino");

        let store = Store {
            path: path.clone(),
            flush_lock,
            process_lock,
            handler,
            header: HeaderTable::create(&path, h.buckets, h.link_size(), h.growth_policy())?,
            tx: TxTable::create(&path, t.buckets, t.link_size(), t.growth_policy())?,
            point: PointTable::create(&path, p.buckets, p.link_size(), p.growth_policy())?,
            output: OutputTable::create(&path, o.link_size(), o.growth_policy())?,
            outs: OutsTable::create(&path, os.link_size(), os.growth_policy())?,
            txs: TxsTable::create(&path, ts.buckets, ts.link_size(), ts.growth_policy())?,
            strong_tx: StrongTxTable::create(&path, st.buckets, st.link_size(), st.growth_policy())?,
            candidate: ChainTable::create(&path, "candidate", c.link_size(), c.growth_policy())?,
            confirmed: ChainTable::create(&path, "confirmed", cf.link_size(), cf.growth_policy())?,
            neutrino: NeutrinoTable::create(&path, n.buckets, n.link_size(), n.growth_policy())?,
        };

        store.notify(Event::CreateStart, EventTable::Header);
        for table in [
            EventTable::Header,
            EventTable::Tx,
            EventTable::Point,
            EventTable::Output,
            EventTable::Outs,
            EventTable::Txs,
            EventTable::StrongTx,
            EventTable::Candidate,
            EventTable::Confirmed,
            EventTable::Neutrino,
        ] {
            store.notify(Event::CreateTable, table);
        }
        Ok(store)
    }

    /// Open an existing archive directory, recovering from a torn
    /// shutdown if a stale flush lock is present (spec.md §6/§4.2).
    pub fn open(config: &Configuration, handler: Option<EventHandler>) -> Result<Self> {
        let flush_lock = FileLock::new(config.path.join("flush.lock"));
        let process_lock = FileLock::new(config.path.join("process.lock"));

        // A flush lock surviving from a previous run means that run never
        // reached a clean `close()`: the crashed process also never
        // released its process lock, so this session adopts both existing
        // markers rather than `create()`ing them (which would always fail,
        // since they already exist) and runs `restore()` on every table
        // before the store is usable. Absent a crash marker, both locks
        // must be freshly created — their presence then means another live
        // process holds the store.
        let crashed = flush_lock.exists();
        if crashed {
            log::warn!(
                "flush lock present at {}: recovering from a prior crash",
                flush_lock.file().display()
            );
        } else {
            if !process_lock.create() {
                return Err(Error::new(ErrorKind::LockFailure));
            }
            if !flush_lock.create() {
                let _ = process_lock.destroy();
                return Err(Error::new(ErrorKind::LockFailure));
            }
        }

        let path = config.path.clone();
        let h = config.table("header");
        let t = config.table("tx");
        let p = config.table("point");
        let o = config.table("output");
        let os = config.table("outs");
        let ts = config.table("txs");
        let st = config.table("strong_tx");
        let c = config.table("candidate");
        let cf = config.table("confirmed");
        let n = config.table("neutrino");

        let store = Store {
            path: path.clone(),
            flush_lock,
            process_lock,
            handler,
            header: HeaderTable::open(&path, h.buckets, h.link_size(), h.growth_policy())?,
            tx: TxTable::open(&path, t.buckets, t.link_size(), t.growth_policy())?,
            point: PointTable::open(&path, p.buckets, p.link_size(), p.growth_policy())?,
            output: OutputTable::open(&path, o.link_size(), o.growth_policy())?,
            outs: OutsTable::open(&path, os.link_size(), os.growth_policy())?,
            txs: TxsTable::open(&path, ts.buckets, ts.link_size(), ts.growth_policy())?,
            strong_tx: StrongTxTable::open(&path, st.buckets, st.link_size(), st.growth_policy())?,
            candidate: ChainTable::open(&path, "candidate", c.link_size(), c.growth_policy())?,
            confirmed: ChainTable::open(&path, "confirmed", cf.link_size(), cf.growth_policy())?,
            neutrino: NeutrinoTable::open(&path, n.buckets, n.link_size(), n.growth_policy())?,
        };

        if crashed {
            store.restore()?;
        }
        store.notify(Event::Load, EventTable::Header);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush every table and record recoverable sizes in each head file.
    pub fn backup(&self) -> Result<()> {
        self.header.backup()?;
        self.tx.backup()?;
        self.point.backup()?;
        self.output.backup()?;
        self.outs.backup()?;
        self.txs.backup()?;
        self.strong_tx.backup()?;
        self.candidate.backup()?;
        self.confirmed.backup()?;
        self.neutrino.backup()?;
        self.notify(Event::Backup, EventTable::Header);
        Ok(())
    }

    /// Truncate every table's body back to its last recorded size.
    pub fn restore(&self) -> Result<()> {
        self.header.restore()?;
        self.tx.restore()?;
        self.point.restore()?;
        self.output.restore()?;
        self.outs.restore()?;
        self.txs.restore()?;
        self.strong_tx.restore()?;
        self.candidate.restore()?;
        self.confirmed.restore()?;
        self.neutrino.restore()?;
        Ok(())
    }

    /// Backup every table and release the flush lock, cleanly.
    pub fn close(&self) -> Result<()> {
        self.backup()?;
        self.notify(Event::Unload, EventTable::Header);
        Ok(())
    }

    pub fn verify(&self) -> bool {
        self.header.verify()
            && self.tx.verify()
            && self.point.verify()
            && self.output.verify()
            && self.outs.verify()
            && self.txs.verify()
            && self.strong_tx.verify()
            && self.candidate.verify()
            && self.confirmed.verify()
            && self.neutrino.verify()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("store close on drop failed: {e}");
        }
        let _ = self.flush_lock.destroy();
        let _ = self.process_lock.destroy();
    }
}

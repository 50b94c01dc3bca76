//! Integration tests driving the full `Store`/`Query` facade against a
//! `tempfile::TempDir`-backed archive (SPEC_FULL.md §2 "test tooling"),
//! covering the scenarios and round-trip laws from spec.md §8.

use archive_store::link::{Link, LinkSize};
use archive_store::tables::{Header, Outs, Output, Tx};
use archive_store::{Configuration, Query, Store};

fn small_config(dir: &std::path::Path) -> Configuration {
    let mut config = Configuration::default();
    config.path = dir.to_path_buf();
    for settings in config.tables.values_mut() {
        settings.buckets = 64;
        settings.size = 1 << 16;
        settings.link_bytes = 4;
    }
    config
}

fn header(previous_fk: Link, nonce: u32) -> Header {
    Header {
        previous_fk,
        version: 1,
        merkle_root: [nonce as u8; 32],
        timestamp: 1_700_000_000 + nonce,
        bits: 0x1d00ffff,
        nonce,
    }
}

// Scenario: initialize an empty archive with a genesis header.
#[test]
fn initialize_seeds_both_chains_at_height_zero() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    assert!(!query.is_initialized());
    let genesis = header(Link::terminal(LinkSize::Bytes4), 0);
    let link = query.initialize(&genesis).unwrap();

    assert!(query.is_initialized());
    assert_eq!(query.get_top_candidate(), Some((0, link)));
    assert_eq!(query.get_top_confirmed(), Some((0, link)));
    // Re-initializing an already-initialized archive is a no-op.
    assert!(query.initialize(&header(link, 99)).is_none());
}

// Scenario: candidate chain runs ahead of confirmed.
#[test]
fn candidate_can_run_ahead_of_confirmed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    let genesis = header(Link::terminal(LinkSize::Bytes4), 0);
    let genesis_link = query.initialize(&genesis).unwrap();

    let h1 = header(genesis_link, 1);
    let h1_hash = [1u8; 32];
    let h1_link = store.header.put(h1_hash, &h1).unwrap();
    query.push_candidate(h1_link, h1_hash, 0, 0).unwrap();

    assert_eq!(query.get_top_candidate(), Some((1, h1_link)));
    assert_eq!(query.get_top_confirmed(), Some((0, genesis_link)));
    assert_eq!(query.get_fork(), 0);
}

// Scenario: a pushed candidate with no `txs` record yet is "gapped"
// (unassociated), and becomes associated once its `txs` record lands.
#[test]
fn gapped_association_tracks_unassociated_then_clears() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    let genesis = header(Link::terminal(LinkSize::Bytes4), 0);
    let genesis_link = query.initialize(&genesis).unwrap();

    let h1 = header(genesis_link, 1);
    let h1_hash = [7u8; 32];
    let h1_link = store.header.put(h1_hash, &h1).unwrap();
    query.push_candidate(h1_link, h1_hash, 0, 0).unwrap();

    let unassociated = query.get_unassociated_above(0, None);
    assert_eq!(unassociated.len(), 1);
    assert_eq!(unassociated[0].hash, h1_hash);
    assert_eq!(unassociated[0].context.height, 1);
    assert_eq!(query.get_unassociated_count_above(0), 1);
    assert_eq!(query.get_top_associated(), 0); // nothing above genesis associated yet

    store.txs.put(h1_link, &archive_store::tables::Txs(vec![])).unwrap();
    query.mark_associated(1);

    assert!(query.get_unassociated_above(0, None).is_empty());
    assert_eq!(query.get_top_associated(), 1);
    assert_eq!(query.get_unassociated_above(0, Some(0)).len(), 0);
}

// Scenario: put a slab output, read it back exactly.
#[test]
fn output_slab_put_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();

    let output = Output {
        parent_fk: Link::new(0),
        value: 5_000_000_000,
        script: vec![0x76, 0xa9, 0x14, 0x00, 0x88, 0xac],
    };
    let link = store.output.put(&output).unwrap();
    assert_eq!(store.output.get(link).unwrap(), output);
}

// Scenario: reorg the candidate chain back past a fork point.
#[test]
fn candidate_reorg_pops_back_to_fork() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    let genesis_link = query.initialize(&header(Link::terminal(LinkSize::Bytes4), 0)).unwrap();
    let h1_link = store.header.put([1; 32], &header(genesis_link, 1)).unwrap();
    query.push_candidate(h1_link, [1; 32], 0, 0).unwrap();
    let h2_link = store.header.put([2; 32], &header(h1_link, 2)).unwrap();
    query.push_candidate(h2_link, [2; 32], 0, 0).unwrap();

    assert_eq!(query.get_top_candidate(), Some((2, h2_link)));
    assert_eq!(query.pop_candidate(), Some(h2_link));
    assert_eq!(query.pop_candidate(), Some(h1_link));
    assert_eq!(query.get_top_candidate(), Some((0, genesis_link)));
}

// Scenario: locator-style hash listing above a height.
#[test]
fn candidate_hashes_above_lists_ascending() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    let genesis_link = query.initialize(&header(Link::terminal(LinkSize::Bytes4), 0)).unwrap();
    let h1_link = store.header.put([1; 32], &header(genesis_link, 1)).unwrap();
    query.push_candidate(h1_link, [1; 32], 0, 0).unwrap();
    let h2_link = store.header.put([2; 32], &header(h1_link, 2)).unwrap();
    query.push_candidate(h2_link, [2; 32], 0, 0).unwrap();

    let hashes = query.get_candidate_hashes(&[0, 1, 2]);
    assert_eq!(hashes.len(), 3);

    // Height 4 is absent from the chain and is silently skipped.
    let locator = query.get_candidate_hashes(&[0, 1, 4]);
    assert_eq!(locator.len(), 2);
}

// Round-trip law: a tx's inputs resolve to the outputs they spend.
#[test]
fn to_prevouts_resolves_spent_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(&small_config(dir.path()), None).unwrap();
    let query = Query::new(&store);

    // Funding tx with one output.
    let funding_output = Output {
        parent_fk: Link::new(0),
        value: 100,
        script: vec![],
    };
    let output_link = store.output.put(&funding_output).unwrap();
    let outs_link = store.outs.put(&Outs(vec![output_link])).unwrap();
    let funding_hash = [9u8; 32];
    let funding_tx = Tx {
        point_fk: Link::terminal(LinkSize::Bytes4),
        points_count: 0,
        outs_fk: outs_link,
    };
    let funding_link = store.tx.put(funding_hash, &funding_tx).unwrap();

    // Spending tx with one input pointing at the funding output.
    let point_link = store
        .point
        .put_inputs(&[((funding_hash, 0u32), Link::new(999))])
        .unwrap();
    let spending_tx = Tx {
        point_fk: point_link,
        points_count: 1,
        outs_fk: Link::terminal(LinkSize::Bytes4),
    };
    let spending_hash = [10u8; 32];
    let spending_link = store.tx.put(spending_hash, &spending_tx).unwrap();

    let prevouts = query.to_prevouts(spending_link);
    assert_eq!(prevouts.len(), 1);
    assert_eq!(prevouts[0], Some(funding_output));

    let spenders = query.to_spenders(output_link);
    assert_eq!(spenders, vec![point_link]);

    let _ = funding_link; // kept for readability of the fixture
}

// Round-trip law: store.backup() + store.verify() agree, and a crash
// (unflushed puts after backup) truncates on restore.
#[test]
fn backup_verify_and_crash_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());
    {
        let store = Store::create(&config, None).unwrap();
        store.header.put([1; 32], &header(Link::terminal(LinkSize::Bytes4), 1)).unwrap();
        store.backup().unwrap();
        assert!(store.verify());
        // Simulate a crash: write more, never call backup() again, and
        // avoid the Drop impl's auto-backup by leaking the lock file path
        // check via an explicit flush skip — verify() must now read
        // pre-crash sizes if we reload.
        store.header.put([2; 32], &header(Link::terminal(LinkSize::Bytes4), 2)).unwrap();
        assert_eq!(store.header.count(), 2);
        std::mem::forget(store); // skip the Drop-driven clean backup
    }

    let store = Store::open(&config, None).unwrap();
    assert_eq!(store.header.count(), 1);
    assert!(store.verify());
}

// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Micro-benchmark / soak-test CLI: builds a tree of a given width and key
//! range, times a bulk plain-insert phase, a full commitment rebuild, an
//! incremental upsert phase, and a validation pass, then emits a single
//! tab-separated line of timings to stdout. Mirrors the `__main__` block
//! of the reference implementation's driver script argument-for-argument,
//! including its stderr progress lines and its stdout TSV row.

use std::time::Instant;

use anyhow::Context;
use ark_bls12_381::Fr;
use clap::Parser;
use rand::seq::SliceRandom;
use rand::Rng;

use vbtree::{Setup, VbTree};

const MODULUS_PRIMITIVE_ROOT: u64 = 7;
const SECRET: u128 = 8927347823478352432985;

/// Verkle B-tree soak test, reproducing the reference driver's CLI shape:
/// five bare positional exponents (width/key-range/initial/added/search).
#[derive(Parser, Debug)]
struct Args {
    /// log2 of the tree width (min degree t = width / 2).
    width_bits: u32,
    /// log2 of the key range (keys are drawn uniformly from [0, 2^bits)).
    key_range_bits: u32,
    /// log2 of the number of keys inserted via the plain insert phase.
    initial_bits: u32,
    /// log2 of the number of keys added via the incremental upsert phase. 0 skips this phase.
    added_bits: u32,
    /// log2 of the number of keys looked up in the search phase. 0 skips this phase.
    search_bits: u32,
}

fn random_hash(rng: &mut impl Rng, range_bits: u32) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    if range_bits < 256 {
        let full_bytes = (range_bits / 8) as usize;
        let remaining_bits = range_bits % 8;
        for b in bytes.iter_mut().skip(full_bytes + (remaining_bits > 0) as usize) {
            *b = 0;
        }
        if remaining_bits > 0 {
            bytes[full_bytes] &= (1u8 << remaining_bits) - 1;
        }
    }
    bytes
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let width = 1usize << args.width_bits;
    let t = width / 2;
    let key_range_bits = args.key_range_bits;
    let number_initial_keys = 1usize << args.initial_bits;
    let number_added_keys = if args.added_bits == 0 { 0 } else { 1usize << args.added_bits };
    let number_search_keys = if args.search_bits == 0 { 0 } else { 1usize << args.search_bits };

    let setup = Setup::new(Fr::from(SECRET), width, Fr::from(MODULUS_PRIMITIVE_ROOT))
        .context("failed to derive KZG setup")?;

    let mut rng = rand::thread_rng();
    let root_key = random_hash(&mut rng, key_range_bits);
    let root_value = random_hash(&mut rng, key_range_bits);
    let mut tree = VbTree::new(setup, t, root_key, root_value);

    let mut values: std::collections::HashMap<[u8; 32], [u8; 32]> = std::collections::HashMap::new();

    let start = Instant::now();
    for _ in 0..number_initial_keys {
        let key = random_hash(&mut rng, key_range_bits);
        let value = random_hash(&mut rng, key_range_bits);
        tree.insert_node(key, value, false)?;
        values.insert(key, value);
    }
    let time_initial = start.elapsed().as_secs_f64();
    eprintln!("Inserted {number_initial_keys} elements in {time_initial:.3} s");

    let start = Instant::now();
    tree.rebuild_commitments();
    let compute_root = start.elapsed().as_secs_f64();
    eprintln!("Computed VB-tree root in {compute_root:.3} s");

    let mut time_to_add: Option<f64> = None;
    let mut check_valid_tree_after_add: Option<f64> = None;
    if number_added_keys > 0 {
        let start = Instant::now();
        for _ in 0..number_added_keys {
            let key = random_hash(&mut rng, key_range_bits);
            let value = random_hash(&mut rng, key_range_bits);
            tree.upsert_vc_node(key, value)?;
            values.insert(key, value);
        }
        let elapsed = start.elapsed().as_secs_f64();
        eprintln!("Additionally inserted {number_added_keys} elements in {elapsed:.3} s");
        time_to_add = Some(elapsed);

        let start = Instant::now();
        tree.check_valid_tree()?;
        let elapsed = start.elapsed().as_secs_f64();
        eprintln!("[Checked tree valid: {elapsed:.3} s]");
        check_valid_tree_after_add = Some(elapsed);
    }

    let mut time_to_search: Option<f64> = None;
    if number_search_keys > 0 {
        let mut all_keys: Vec<[u8; 32]> = values.keys().copied().collect();
        all_keys.shuffle(&mut rng);
        let keys_to_search = &all_keys[..number_search_keys.min(all_keys.len())];

        let start = Instant::now();
        for key in keys_to_search {
            anyhow::ensure!(tree.find_node(key).is_some(), "searched key unexpectedly absent");
        }
        let elapsed = start.elapsed().as_secs_f64();
        eprintln!("Searched for {number_search_keys} elements in {elapsed:.3} s");
        time_to_search = Some(elapsed);
    }

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    println!(
        "VBTree\t{}\t{}\t{}\t{}\t{}\t{:.3}\t{:.3}\t{}\t{}\t{}\t{}",
        args.width_bits,
        width,
        1u128 << key_range_bits,
        number_initial_keys,
        number_added_keys,
        time_initial,
        compute_root,
        opt(time_to_add),
        opt(check_valid_tree_after_add),
        if number_search_keys != 0 { number_search_keys.to_string() } else { String::new() },
        opt(time_to_search),
    );

    Ok(())
}

use mgcstatus_core::aggregate::{collect_report, ReportOptions};
use mgcstatus_core::analyze::{analyze, CollectionInput, SizeArithmetic};
use mgcstatus_core::gateway::ClusterSnapshot;
use mgcstatus_core::model::{Chunk, Collection, CollectionStats, Shard};
use proptest::prelude::*;

fn build(spread: &[usize], jumbo_every: usize) -> (Vec<Shard>, Vec<Chunk>) {
    let shards: Vec<Shard> =
        (0..spread.len()).map(|i| Shard { id: format!("s{i}"), host: String::new() }).collect();
    let mut chunks = vec![];
    for (si, n) in spread.iter().enumerate() {
        for _ in 0..*n {
            let i = chunks.len();
            chunks.push(Chunk {
                id: format!("c{i}"),
                ns: "p.c".into(),
                shard: format!("s{si}"),
                jumbo: jumbo_every > 0 && i % jumbo_every == 0,
                lastmod: None,
            });
        }
    }
    (shards, chunks)
}

proptest! {
    #[test]
    fn distribution_invariants(
        spread in prop::collection::vec(0usize..40, 1..8),
        jumbo_every in 0usize..5,
        count in 0u64..1_000_000,
        avg in 0.0f64..4096.0,
    ) {
        let (shards, chunks) = build(&spread, jumbo_every);
        let refs: Vec<&Chunk> = chunks.iter().collect();
        let stats = CollectionStats { ns: "p.c".into(), count, avg_obj_size: avg };
        let input = CollectionInput {
            ns: "p.c",
            chunks: &refs,
            shards: &shards,
            stats: &stats,
            no_balance: false,
        };
        let d = analyze(&input, SizeArithmetic::Truncated).unwrap();

        let chunks_num = chunks.len() as u64;
        let shards_num = shards.len() as u64;
        prop_assert!(d.ideal_chunks_per_shard >= 1);
        if chunks_num <= shards_num {
            prop_assert_eq!(d.ideal_chunks_per_shard, 1);
        }
        let ideal = d.ideal_chunks_per_shard;
        let expect: u64 = spread.iter().map(|n| (*n as u64).saturating_sub(ideal)).sum();
        prop_assert_eq!(d.remain_chunks_num, expect);
        prop_assert!(d.jumbo_chunks_num <= d.chunks_num);
        prop_assert_eq!(d.ave_chunk_size.is_none(), chunks_num == 0);
        let load_total: u64 = d.shard_loads.iter().map(|l| l.chunks).sum();
        prop_assert_eq!(load_total, chunks_num);
    }

    #[test]
    fn rows_sorted_whatever_the_input_order(
        names in prop::collection::btree_set("[a-z]{1,6}", 1..12),
        seed in any::<u64>(),
    ) {
        let mut snap = ClusterSnapshot::default();
        snap.shards.push(Shard { id: "s0".into(), host: String::new() });
        let mut names: Vec<String> = names.into_iter().collect();
        // cheap deterministic shuffle
        let n = names.len();
        for i in 0..n {
            let j = ((seed as usize).wrapping_mul(31).wrapping_add(i * 17)) % n;
            names.swap(i, j);
        }
        for (i, name) in names.iter().enumerate() {
            let ns = format!("db.{name}");
            snap.collections.push(Collection { ns: ns.clone(), no_balance: i % 2 == 0 });
            snap.chunks.push(Chunk {
                id: format!("{ns}-0"),
                ns: ns.clone(),
                shard: "s0".into(),
                jumbo: false,
                lastmod: None,
            });
            let st = CollectionStats { ns: ns.clone(), count: i as u64, avg_obj_size: 1.0 };
            snap.stats.insert(ns, st);
        }
        let rows = collect_report(&snap, &ReportOptions::new("db")).unwrap();
        prop_assert_eq!(rows.len(), n);
        prop_assert!(rows.windows(2).all(|w| w[0].ns < w[1].ns));
    }
}

use crate::analyze::{analyze, CollectionInput, Distribution, SizeArithmetic};
use crate::error::{AnalysisError, ReportError};
use crate::gateway::{ChunkScope, MetadataGateway};
use crate::model::{in_database, split_namespace, Chunk, Collection, Shard};
use crate::progress::Progress;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;

/// What to do when one collection's analysis fails. Gateway failures always
/// abort the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Abort,
    /// Log a warning and leave the collection out of the report.
    Skip,
}

#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub database: String,
    pub on_error: ErrorPolicy,
    pub arithmetic: SizeArithmetic,
    /// Worker threads; `None` uses the global rayon pool.
    pub workers: Option<usize>,
    pub progress: bool,
}

impl ReportOptions {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            on_error: ErrorPolicy::default(),
            arithmetic: SizeArithmetic::default(),
            workers: None,
            progress: false,
        }
    }
}

/// Analyze every sharded collection of `opts.database`. Rows come back
/// sorted by namespace whatever order the workers finish in.
pub fn collect_report<G>(
    gw: &G,
    opts: &ReportOptions,
) -> Result<Vec<Distribution>, ReportError>
where
    G: MetadataGateway + ?Sized,
{
    let db = opts.database.as_str();
    let shards = gw.list_shards()?;
    let mut collections: Vec<Collection> =
        gw.list_collections(db)?.into_iter().filter(|c| in_database(&c.ns, db)).collect();
    collections.sort_by(|a, b| a.ns.cmp(&b.ns));
    collections.dedup_by(|a, b| a.ns == b.ns);
    let chunks = gw.list_chunks(ChunkScope::Database(db))?;

    let mut by_ns: HashMap<&str, Vec<&Chunk>> =
        collections.iter().map(|c| (c.ns.as_str(), Vec::new())).collect();
    let mut dropped = 0usize;
    for c in &chunks {
        match by_ns.get_mut(c.ns.as_str()) {
            Some(v) => v.push(c),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("ignoring {} chunk(s) with no matching collection in {}", dropped, db);
    }
    info!(
        "{}: {} collection(s), {} chunk(s), {} shard(s)",
        db,
        collections.len(),
        chunks.len() - dropped,
        shards.len()
    );

    let prog = Progress::new(opts.progress);
    prog.set_total(collections.len());
    prog.start();

    // Each task owns the slot index it was dispatched with; a failing task
    // stops the parallel collect from starting further ones.
    let run = || -> Result<Vec<(usize, Option<Distribution>)>, ReportError> {
        collections
            .par_iter()
            .enumerate()
            .map(|(slot, coll)| {
                let own = by_ns.get(coll.ns.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                let res = analyze_collection(gw, coll, own, &shards, opts);
                prog.inc();
                res.map(|d| (slot, d))
            })
            .collect()
    };
    let analyzed = match opts.workers {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| ReportError::WorkerPool(e.to_string()))
            .and_then(|pool| pool.install(run)),
        None => run(),
    };
    prog.stop();
    let analyzed = analyzed?;

    let mut slots: Vec<Option<Distribution>> = (0..collections.len()).map(|_| None).collect();
    for (slot, d) in analyzed {
        slots[slot] = d;
    }
    Ok(slots.into_iter().flatten().collect())
}

fn analyze_collection<G>(
    gw: &G,
    coll: &Collection,
    chunks: &[&Chunk],
    shards: &[Shard],
    opts: &ReportOptions,
) -> Result<Option<Distribution>, ReportError>
where
    G: MetadataGateway + ?Sized,
{
    let Some((db, name)) = split_namespace(&coll.ns) else {
        return Ok(None);
    };
    // No point paying for collStats when the result is already known.
    if shards.is_empty() {
        return on_failure(opts.on_error, &coll.ns, AnalysisError::NoShards);
    }
    let stats = gw.collection_stats(db, name)?;
    debug!(
        "{}: count={} avgObjSize={} chunks={}",
        coll.ns,
        stats.count,
        stats.avg_obj_size,
        chunks.len()
    );

    let input = CollectionInput {
        ns: &coll.ns,
        chunks,
        shards,
        stats: &stats,
        no_balance: coll.no_balance,
    };
    match analyze(&input, opts.arithmetic) {
        Ok(d) => Ok(Some(d)),
        Err(e) => on_failure(opts.on_error, &coll.ns, e),
    }
}

fn on_failure(
    policy: ErrorPolicy,
    ns: &str,
    err: AnalysisError,
) -> Result<Option<Distribution>, ReportError> {
    match policy {
        ErrorPolicy::Abort => Err(ReportError::Analysis { ns: ns.to_string(), source: err }),
        ErrorPolicy::Skip => {
            warn!("skipping {}: {}", ns, err);
            Ok(None)
        }
    }
}

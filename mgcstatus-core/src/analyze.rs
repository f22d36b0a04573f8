use crate::error::AnalysisError;
use crate::model::{Chunk, CollectionStats, Shard};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;

/// How the average chunk size is derived from object statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeArithmetic {
    /// `floor(objs / chunks) * trunc(avgObjSize)`, bit-compatible with
    /// historical reports.
    #[default]
    Truncated,
    /// `objs * avgObjSize / chunks` in floating point.
    Exact,
}

/// Everything the analysis needs for one collection. Borrowed from the
/// aggregator's snapshot; never mutated.
pub struct CollectionInput<'a> {
    pub ns: &'a str,
    pub chunks: &'a [&'a Chunk],
    pub shards: &'a [Shard],
    pub stats: &'a CollectionStats,
    pub no_balance: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShardLoad {
    pub shard: String,
    pub chunks: u64,
}

/// Balance metrics of one collection. Sizes are in bytes.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Distribution {
    pub ns: String,
    pub chunks_num: u64,
    pub objs_num: u64,
    pub avg_obj_size: f64,
    /// `None` when the collection has no chunks.
    pub ave_chunk_size: Option<f64>,
    pub ideal_chunks_per_shard: u64,
    pub remain_chunks_num: u64,
    pub remain_chunks_size: Option<f64>,
    pub jumbo_chunks_num: u64,
    pub balancer_enabled: bool,
    pub all_data_size: f64,
    pub shard_loads: Vec<ShardLoad>,
}

/// Chunks each shard would hold under a perfectly uniform spread.
pub fn ideal_chunks_per_shard(chunks_num: u64, shards_num: u64) -> Result<u64, AnalysisError> {
    if shards_num == 0 {
        return Err(AnalysisError::NoShards);
    }
    if chunks_num <= shards_num {
        return Ok(1);
    }
    Ok(chunks_num.div_ceil(shards_num))
}

/// Surplus above `ideal` summed over overloaded shards. Underloaded shards
/// contribute nothing.
pub fn remain_chunks(loads: &[ShardLoad], ideal: u64) -> u64 {
    loads.iter().map(|l| l.chunks.saturating_sub(ideal)).sum()
}

pub fn ave_chunk_size(
    ns: &str,
    objs_num: u64,
    chunks_num: u64,
    avg_obj_size: f64,
    arith: SizeArithmetic,
) -> Result<f64, AnalysisError> {
    if chunks_num == 0 {
        return Err(AnalysisError::DivisionUndefined { ns: ns.to_string() });
    }
    Ok(match arith {
        SizeArithmetic::Truncated => {
            // float-to-int `as` saturates; the product must too
            let per_chunk = objs_num / chunks_num;
            per_chunk.saturating_mul(avg_obj_size.trunc() as u64) as f64
        }
        SizeArithmetic::Exact => objs_num as f64 * avg_obj_size / chunks_num as f64,
    })
}

/// Per-shard chunk counts in shard-list order. Chunks owned by a shard id
/// that is not in `shards` are not counted.
pub fn shard_loads(chunks: &[&Chunk], shards: &[Shard]) -> Vec<ShardLoad> {
    let mut by_shard: HashMap<&str, u64> = HashMap::with_capacity(shards.len());
    for c in chunks {
        *by_shard.entry(c.shard.as_str()).or_default() += 1;
    }
    shards
        .iter()
        .map(|s| ShardLoad {
            shard: s.id.clone(),
            chunks: by_shard.get(s.id.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

pub fn analyze(
    input: &CollectionInput<'_>,
    arith: SizeArithmetic,
) -> Result<Distribution, AnalysisError> {
    let chunks_num = input.chunks.len() as u64;
    let objs_num = input.stats.count;
    let avg_obj_size = input.stats.avg_obj_size;

    let ideal = ideal_chunks_per_shard(chunks_num, input.shards.len() as u64)?;
    let loads = shard_loads(input.chunks, input.shards);
    let remain = remain_chunks(&loads, ideal);

    let ave = match ave_chunk_size(input.ns, objs_num, chunks_num, avg_obj_size, arith) {
        Ok(v) => Some(v),
        Err(e @ AnalysisError::DivisionUndefined { .. }) => {
            warn!("{}; size columns reported as 0", e);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(Distribution {
        ns: input.ns.to_string(),
        chunks_num,
        objs_num,
        avg_obj_size,
        ave_chunk_size: ave,
        ideal_chunks_per_shard: ideal,
        remain_chunks_num: remain,
        remain_chunks_size: ave.map(|a| a * remain as f64),
        jumbo_chunks_num: input.chunks.iter().filter(|c| c.jumbo).count() as u64,
        balancer_enabled: !input.no_balance,
        all_data_size: avg_obj_size * objs_num as f64,
        shard_loads: loads,
    })
}

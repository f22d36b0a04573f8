use crate::analyze::Distribution;
use serde::Serialize;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// One presentation-ready line of the report. Sizes are already in KB/MB.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub objs: u64,
    pub chunks: u64,
    pub ave_chunk_size_kb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_data_size_mb: Option<f64>,
    pub ideal_chunks_per_shard: u64,
    pub remain_chunks: u64,
    pub remain_chunks_size_kb: f64,
    pub jumbo_chunks: u64,
    pub balancer: u8,
}

impl ReportRow {
    /// `extended` adds the total data size column.
    pub fn from_distribution(d: &Distribution, extended: bool) -> Self {
        Self {
            name: d.ns.clone(),
            objs: d.objs_num,
            chunks: d.chunks_num,
            ave_chunk_size_kb: d.ave_chunk_size.unwrap_or(0.0) / KB,
            all_data_size_mb: extended.then(|| d.all_data_size / MB),
            ideal_chunks_per_shard: d.ideal_chunks_per_shard,
            remain_chunks: d.remain_chunks_num,
            remain_chunks_size_kb: d.remain_chunks_size.unwrap_or(0.0) / KB,
            jumbo_chunks: d.jumbo_chunks_num,
            balancer: u8::from(d.balancer_enabled),
        }
    }

    pub fn headers(extended: bool) -> Vec<&'static str> {
        let mut h = vec!["CollectionName", "Objs", "chunks", "aveChunkSize(KB)"];
        if extended {
            h.push("AllDataSize(MB)");
        }
        h.extend([
            "idealChunksPerShards",
            "remainChunks",
            "remainChunksSize(KB)",
            "Jumbos",
            "balancer",
        ]);
        h
    }

    /// Cells in header order; sizes with two decimals.
    pub fn cells(&self) -> Vec<String> {
        let mut c = vec![
            self.name.clone(),
            self.objs.to_string(),
            self.chunks.to_string(),
            format!("{:.2}", self.ave_chunk_size_kb),
        ];
        if let Some(mb) = self.all_data_size_mb {
            c.push(format!("{:.2}", mb));
        }
        c.extend([
            self.ideal_chunks_per_shard.to_string(),
            self.remain_chunks.to_string(),
            format!("{:.2}", self.remain_chunks_size_kb),
            self.jumbo_chunks.to_string(),
            self.balancer.to_string(),
        ]);
        c
    }
}

pub fn rows(dists: &[Distribution], extended: bool) -> Vec<ReportRow> {
    dists.iter().map(|d| ReportRow::from_distribution(d, extended)).collect()
}

use serde::{Deserialize, Serialize};

/// One entry of `config.shards`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Shard {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub host: String,
}

/// One entry of `config.chunks`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    #[serde(rename = "_id")]
    pub id: String,
    pub ns: String,
    pub shard: String,
    #[serde(default)]
    pub jumbo: bool,
    /// Chunk version timestamp; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<u64>,
}

/// One entry of `config.collections`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    #[serde(rename = "_id")]
    pub ns: String,
    #[serde(rename = "noBalance", default)]
    pub no_balance: bool,
}

/// The subset of `collStats` output the analysis consumes.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CollectionStats {
    #[serde(default)]
    pub ns: String,
    #[serde(default)]
    pub count: u64,
    /// Bytes. Absent from `collStats` for empty collections.
    #[serde(rename = "avgObjSize", default)]
    pub avg_obj_size: f64,
}

/// Split `db.coll` at the first dot. The collection part keeps any further
/// dots (`app.system.profile` -> `("app", "system.profile")`).
pub fn split_namespace(ns: &str) -> Option<(&str, &str)> {
    match ns.split_once('.') {
        Some((db, coll)) if !db.is_empty() && !coll.is_empty() => Some((db, coll)),
        _ => None,
    }
}

pub fn in_database(ns: &str, database: &str) -> bool {
    split_namespace(ns).map(|(db, _)| db == database).unwrap_or(false)
}

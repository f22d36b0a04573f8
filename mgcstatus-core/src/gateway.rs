use crate::error::GatewayError;
use crate::model::{in_database, split_namespace, Chunk, Collection, CollectionStats, Shard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkScope<'a> {
    All,
    /// Chunks of every collection in one database.
    Database(&'a str),
    /// Chunks of a single `db.coll` namespace.
    Namespace(&'a str),
}

impl ChunkScope<'_> {
    pub fn matches(&self, ns: &str) -> bool {
        match self {
            ChunkScope::All => true,
            ChunkScope::Database(db) => in_database(ns, db),
            ChunkScope::Namespace(want) => ns == *want,
        }
    }
}

/// Read-only access to cluster metadata. Implementations hide transport and
/// auth; every call is one round trip and may fail independently.
///
/// `Sync` because the aggregator fetches collection stats from worker threads.
pub trait MetadataGateway: Sync {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError>;
    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError>;
    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError>;
    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError>;
}

impl<G: MetadataGateway + ?Sized> MetadataGateway for &G {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError> {
        (**self).list_shards()
    }
    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError> {
        (**self).list_chunks(scope)
    }
    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError> {
        (**self).list_collections(database)
    }
    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError> {
        (**self).collection_stats(database, collection)
    }
}

impl<G: MetadataGateway + ?Sized> MetadataGateway for Box<G> {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError> {
        (**self).list_shards()
    }
    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError> {
        (**self).list_chunks(scope)
    }
    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError> {
        (**self).list_collections(database)
    }
    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError> {
        (**self).collection_stats(database, collection)
    }
}

/// A frozen copy of the cluster metadata, usually a JSON dump of
/// `config.shards`, `config.chunks`, `config.collections` plus `collStats`
/// keyed by namespace.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub shards: Vec<Shard>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub stats: BTreeMap<String, CollectionStats>,
}

impl ClusterSnapshot {
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let f = File::open(path).map_err(|e| GatewayError::fetch("loadSnapshot", e))?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            GatewayError::decode("loadSnapshot", format!("{}: {}", path.display(), e))
        })
    }
}

impl MetadataGateway for ClusterSnapshot {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError> {
        Ok(self.shards.clone())
    }

    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError> {
        Ok(self.chunks.iter().filter(|c| scope.matches(&c.ns)).cloned().collect())
    }

    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError> {
        Ok(self.collections.iter().filter(|c| in_database(&c.ns, database)).cloned().collect())
    }

    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError> {
        let ns = format!("{}.{}", database, collection);
        let mut st = self
            .stats
            .get(&ns)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("collStats", ns.clone()))?;
        if split_namespace(&st.ns).is_none() {
            st.ns = ns;
        }
        Ok(st)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> ClusterSnapshot {
        serde_json::from_str(
            r#"{
              "shards": [{"_id":"rs0","host":"rs0/a:27018"}],
              "chunks": [
                {"_id":"c1","ns":"app.users","shard":"rs0"},
                {"_id":"c2","ns":"other.users","shard":"rs0"}
              ],
              "collections": [{"_id":"app.users"},{"_id":"other.users"}],
              "stats": {"app.users": {"count": 3, "avgObjSize": 10.0}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn scopes_filter_chunks() {
        let s = snap();
        assert_eq!(s.list_chunks(ChunkScope::All).unwrap().len(), 2);
        assert_eq!(s.list_chunks(ChunkScope::Database("app")).unwrap().len(), 1);
        assert_eq!(s.list_chunks(ChunkScope::Namespace("other.users")).unwrap()[0].id, "c2");
        assert_eq!(s.list_collections("other").unwrap().len(), 1);
    }

    #[test]
    fn stats_fill_namespace_and_report_missing() {
        let s = snap();
        let st = s.collection_stats("app", "users").unwrap();
        assert_eq!(st.ns, "app.users");
        assert_eq!(st.count, 3);
        let err = s.collection_stats("other", "users").unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.op, "collStats");
    }
}

use log::debug;
use mgcstatus_core::error::GatewayError;
use mgcstatus_core::gateway::{ChunkScope, MetadataGateway};
use mgcstatus_core::model::{in_database, Chunk, Collection, CollectionStats, Shard};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::sync::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Live gateway reading the `config` database of a mongos.
pub struct MongoGateway {
    client: Client,
    timeout: Duration,
}

impl MongoGateway {
    /// The driver connects lazily; the first query surfaces connectivity
    /// problems, bounded by `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, GatewayError> {
        let ms = timeout.as_millis().max(1);
        let uri = format!(
            "mongodb://{}:{}/?appName=mgcstatus&connectTimeoutMS={ms}\
             &serverSelectionTimeoutMS={ms}",
            host, port
        );
        let client = Client::with_uri_str(&uri).map_err(|e| GatewayError::fetch("connect", e))?;
        debug!("client configured for {}:{}", host, port);
        Ok(Self { client, timeout })
    }

    fn find_config(&self, op: &'static str, coll: &str) -> Result<Vec<Document>, GatewayError> {
        let opts = FindOptions::builder().max_time(self.timeout).build();
        let cursor = self
            .client
            .database("config")
            .collection::<Document>(coll)
            .find(None, opts)
            .map_err(|e| GatewayError::fetch(op, e))?;
        cursor.map(|r| r.map_err(|e| GatewayError::fetch(op, e))).collect()
    }
}

fn id_string(d: &Document, op: &'static str) -> Result<String, GatewayError> {
    match d.get("_id") {
        Some(Bson::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(GatewayError::decode(op, "document without _id")),
    }
}

/// Server replies carry counters as whichever numeric type fits.
fn number(d: &Document, key: &str) -> Option<f64> {
    match d.get(key)? {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn lastmod(d: &Document) -> Option<u64> {
    match d.get("lastmod")? {
        Bson::Timestamp(ts) => Some(((ts.time as u64) << 32) | ts.increment as u64),
        Bson::DateTime(dt) => u64::try_from(dt.timestamp_millis()).ok(),
        _ => None,
    }
}

fn shard_from_doc(d: &Document) -> Result<Shard, GatewayError> {
    Ok(Shard {
        id: id_string(d, "listShards")?,
        host: d.get_str("host").unwrap_or_default().to_string(),
    })
}

/// `None` for collections that were dropped but still have a metadata entry.
fn collection_from_doc(d: &Document) -> Result<Option<Collection>, GatewayError> {
    if d.get_bool("dropped").unwrap_or(false) {
        return Ok(None);
    }
    Ok(Some(Collection {
        ns: id_string(d, "listCollections")?,
        no_balance: d.get_bool("noBalance").unwrap_or(false),
    }))
}

/// Newer servers key chunks by collection uuid instead of `ns`.
fn uuid_index(collections: &[Document]) -> HashMap<String, String> {
    collections
        .iter()
        .filter_map(|d| match (d.get("uuid"), d.get_str("_id")) {
            (Some(uuid), Ok(ns)) => Some((uuid.to_string(), ns.to_string())),
            _ => None,
        })
        .collect()
}

fn needs_uuid_index(chunks: &[Document]) -> bool {
    chunks.iter().any(|d| d.get_str("ns").is_err())
}

/// Chunks whose uuid names no known collection are left out.
fn chunks_from_docs(
    docs: &[Document],
    by_uuid: &HashMap<String, String>,
    scope: ChunkScope<'_>,
) -> Result<Vec<Chunk>, GatewayError> {
    let mut out = Vec::with_capacity(docs.len());
    for d in docs {
        let ns = match (d.get_str("ns"), d.get("uuid")) {
            (Ok(ns), _) => ns.to_string(),
            (Err(_), Some(uuid)) => match by_uuid.get(&uuid.to_string()) {
                Some(ns) => ns.clone(),
                None => {
                    debug!("chunk {:?} references unknown collection {}", d.get("_id"), uuid);
                    continue;
                }
            },
            (Err(_), None) => {
                return Err(GatewayError::decode("listChunks", "chunk without ns or uuid"));
            }
        };
        if !scope.matches(&ns) {
            continue;
        }
        let shard = d
            .get_str("shard")
            .map_err(|_| GatewayError::decode("listChunks", "chunk without shard"))?;
        out.push(Chunk {
            id: id_string(d, "listChunks")?,
            ns,
            shard: shard.to_string(),
            jumbo: d.get_bool("jumbo").unwrap_or(false),
            lastmod: lastmod(d),
        });
    }
    Ok(out)
}

fn stats_from_reply(
    reply: &Document,
    database: &str,
    collection: &str,
) -> Result<CollectionStats, GatewayError> {
    let ns = format!("{}.{}", database, collection);
    let Some(count) = number(reply, "count") else {
        return Err(GatewayError::decode("collStats", format!("{}: no count", ns)));
    };
    Ok(CollectionStats {
        ns: reply.get_str("ns").map(str::to_string).unwrap_or(ns),
        count: count.max(0.0) as u64,
        avg_obj_size: number(reply, "avgObjSize").unwrap_or(0.0),
    })
}

impl MetadataGateway for MongoGateway {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError> {
        self.find_config("listShards", "shards")?.iter().map(shard_from_doc).collect()
    }

    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError> {
        let docs = self.find_config("listChunks", "chunks")?;
        let by_uuid = if needs_uuid_index(&docs) {
            uuid_index(&self.find_config("listCollections", "collections")?)
        } else {
            HashMap::new()
        };
        chunks_from_docs(&docs, &by_uuid, scope)
    }

    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError> {
        let mut out = vec![];
        for d in self.find_config("listCollections", "collections")? {
            match collection_from_doc(&d)? {
                Some(c) if in_database(&c.ns, database) => out.push(c),
                _ => {}
            }
        }
        Ok(out)
    }

    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError> {
        let max_ms = i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX);
        let reply = self
            .client
            .database(database)
            .run_command(doc! { "collStats": collection, "maxTimeMS": max_ms }, None)
            .map_err(|e| GatewayError::fetch("collStats", e))?;
        stats_from_reply(&reply, database, collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgcstatus_core::error::GatewayErrorKind;
    use mongodb::bson::oid::ObjectId;
    use mongodb::bson::spec::BinarySubtype;
    use mongodb::bson::{Binary, DateTime, Timestamp};

    fn uuid(b: u8) -> Bson {
        Bson::Binary(Binary { subtype: BinarySubtype::Uuid, bytes: vec![b; 16] })
    }

    #[test]
    fn counts_accept_any_numeric_type() {
        let s = stats_from_reply(&doc! { "count": 12i32, "avgObjSize": 100i32 }, "a", "b").unwrap();
        assert_eq!((s.count, s.avg_obj_size), (12, 100.0));
        assert_eq!(s.ns, "a.b");

        let reply = doc! { "ns": "a.b", "count": 5_000_000_000i64, "avgObjSize": 48.5 };
        let s = stats_from_reply(&reply, "a", "b").unwrap();
        assert_eq!((s.count, s.avg_obj_size), (5_000_000_000, 48.5));

        let s = stats_from_reply(&doc! { "count": 7.0 }, "a", "b").unwrap();
        assert_eq!((s.count, s.avg_obj_size), (7, 0.0));
    }

    #[test]
    fn reply_without_count_is_malformed() {
        let err = stats_from_reply(&doc! { "count": "many" }, "a", "b").unwrap_err();
        assert!(matches!(err.kind, GatewayErrorKind::Decode(_)));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("a.b"));
    }

    #[test]
    fn lastmod_from_timestamp_or_date() {
        let ts = Timestamp { time: 2, increment: 3 };
        assert_eq!(lastmod(&doc! { "lastmod": ts }), Some((2u64 << 32) | 3));
        let dt = doc! { "lastmod": DateTime::from_millis(1_500) };
        assert_eq!(lastmod(&dt), Some(1_500));
        assert_eq!(lastmod(&doc! { "lastmod": DateTime::from_millis(-1) }), None);
        assert_eq!(lastmod(&doc! {}), None);
    }

    #[test]
    fn non_string_ids_are_kept() {
        let oid = ObjectId::from_bytes([1; 12]);
        let s = shard_from_doc(&doc! { "_id": oid, "host": "rs0/a:27018" }).unwrap();
        assert!(s.id.contains(&oid.to_hex()));
        assert_eq!(s.host, "rs0/a:27018");

        let s = shard_from_doc(&doc! { "_id": "rs1" }).unwrap();
        assert_eq!((s.id.as_str(), s.host.as_str()), ("rs1", ""));
        assert!(shard_from_doc(&doc! { "host": "x" }).is_err());
    }

    #[test]
    fn dropped_collections_are_filtered() {
        let live = collection_from_doc(&doc! { "_id": "a.b", "noBalance": true }).unwrap();
        assert_eq!(live, Some(Collection { ns: "a.b".into(), no_balance: true }));
        let gone = collection_from_doc(&doc! { "_id": "a.c", "dropped": true }).unwrap();
        assert_eq!(gone, None);
    }

    #[test]
    fn chunks_resolve_namespace_by_uuid() {
        let colls = [
            doc! { "_id": "app.users", "uuid": uuid(1) },
            doc! { "_id": "misc.x", "uuid": uuid(2) },
            doc! { "_id": "app.legacy" },
        ];
        let chunks = [
            doc! { "_id": "c0", "uuid": uuid(1), "shard": "rs0", "jumbo": true },
            doc! { "_id": "c1", "ns": "app.legacy", "shard": "rs1" },
            doc! { "_id": "c2", "uuid": uuid(2), "shard": "rs0" },
            doc! { "_id": "c3", "uuid": uuid(9), "shard": "rs0" },
        ];
        assert!(needs_uuid_index(&chunks));
        assert!(!needs_uuid_index(&chunks[1..2]));

        let index = uuid_index(&colls);
        assert_eq!(index.len(), 2);
        let got = chunks_from_docs(&chunks, &index, ChunkScope::Database("app")).unwrap();
        let ids: Vec<(&str, &str)> = got.iter().map(|c| (c.id.as_str(), c.ns.as_str())).collect();
        assert_eq!(ids, [("c0", "app.users"), ("c1", "app.legacy")]);
        assert!(got[0].jumbo);

        let all = chunks_from_docs(&chunks, &index, ChunkScope::All).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn chunk_without_owner_is_malformed() {
        let none = [doc! { "_id": "c0", "shard": "rs0" }];
        assert!(chunks_from_docs(&none, &HashMap::new(), ChunkScope::All).is_err());
        let no_shard = [doc! { "_id": "c0", "ns": "a.b" }];
        assert!(chunks_from_docs(&no_shard, &HashMap::new(), ChunkScope::All).is_err());
    }
}

//! Bounded exponential back-off around gateway calls.
//!
//! Metadata is read once per run, so a dropped connection otherwise fails the
//! whole report. Only `Fetch` errors are retried.

use crate::error::GatewayError;
use crate::gateway::{ChunkScope, MetadataGateway};
use crate::model::{Chunk, Collection, CollectionStats, Shard};
use log::warn;
use std::thread;
use std::time::Duration;

/// Doubling waits capped at `max_wait`, for at most `max_retries` retries.
pub struct ExponentialBackoff {
    max_wait: Duration,
    max_retries: u32,
    current_wait: Duration,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(init_wait: Duration, max_wait: Duration, max_retries: u32) -> Self {
        Self { max_wait, max_retries, current_wait: init_wait, attempts: 0 }
    }

    /// Next wait, or `None` once the retry allowance is used up.
    pub fn next_wait(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_retries {
            return None;
        }
        let wait = self.current_wait;
        self.current_wait = (self.current_wait * 2).min(self.max_wait);
        self.attempts += 1;
        Some(wait)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub init_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            init_wait: Duration::from_millis(200),
            max_wait: Duration::from_secs(5),
        }
    }
}

/// Gateway decorator retrying transient failures of the inner gateway.
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: MetadataGateway> Retrying<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    fn call<T>(
        &self,
        what: &str,
        f: impl Fn(&G) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let p = &self.policy;
        let mut bo = ExponentialBackoff::new(p.init_wait, p.max_wait, p.max_retries);
        loop {
            match f(&self.inner) {
                Err(e) if e.is_transient() => match bo.next_wait() {
                    Some(wait) => {
                        warn!(
                            "{} failed ({}); retry {}/{} in {:?}",
                            what,
                            e,
                            bo.attempts(),
                            p.max_retries,
                            wait
                        );
                        thread::sleep(wait);
                    }
                    None => return Err(e),
                },
                other => return other,
            }
        }
    }
}

impl<G: MetadataGateway> MetadataGateway for Retrying<G> {
    fn list_shards(&self) -> Result<Vec<Shard>, GatewayError> {
        self.call("listShards", |g| g.list_shards())
    }
    fn list_chunks(&self, scope: ChunkScope<'_>) -> Result<Vec<Chunk>, GatewayError> {
        self.call("listChunks", |g| g.list_chunks(scope))
    }
    fn list_collections(&self, database: &str) -> Result<Vec<Collection>, GatewayError> {
        self.call("listCollections", |g| g.list_collections(database))
    }
    fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats, GatewayError> {
        self.call("collStats", |g| g.collection_stats(database, collection))
    }
}

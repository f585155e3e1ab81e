//! Connection pool: one multiplexed connection per server.
//!
//! NWEP multiplexes every stream over a single connection, so the pool never
//! holds more than one connection per [`PoolKey`] and needs no sizing. All
//! methods are safe for concurrent use; the map is guarded by one mutex.
//!
//! Dialing happens *outside* the lock so that a slow handshake to one server
//! never stalls requests to another. The price is that two callers may dial
//! the same new server at once. After dialing, each re-checks the map under
//! the lock and the first one to store wins; the loser closes its own fresh
//! connection and returns the stored one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::address::{PoolKey, Target};
use crate::engine::{Connection, Dial, Engine, NotifyFn, Settings};
use crate::error::BoxError;
use crate::identity::Keypair;

/// A pool of live connections keyed by server.
pub struct ConnPool {
    engine: Arc<dyn Engine>,
    settings: Option<Settings>,
    on_notify: Option<NotifyFn>,
    conns: Mutex<HashMap<PoolKey, Arc<dyn Connection>>>,
}

impl ConnPool {
    /// Create an empty pool that dials through `engine` with the given
    /// settings and notification callback.
    pub fn new(
        engine: Arc<dyn Engine>,
        settings: Option<Settings>,
        on_notify: Option<NotifyFn>,
    ) -> Self {
        Self {
            engine,
            settings,
            on_notify,
            conns: Mutex::new(HashMap::new()),
        }
    }

    // The map is only ever mutated by single insert/remove/swap calls, so a
    // panic elsewhere cannot leave it inconsistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<PoolKey, Arc<dyn Connection>>> {
        self.conns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the connection for `target`'s server, dialing one if needed.
    ///
    /// The returned key can be passed to [`remove`](Self::remove) if the
    /// connection later fails. A failed dial leaves the pool unchanged.
    pub fn get(
        &self,
        target: &Target,
        identity: &Keypair,
        timeout: Option<Duration>,
    ) -> Result<(Arc<dyn Connection>, PoolKey), BoxError> {
        let key = target.key();

        if let Some(conn) = self.lock().get(&key) {
            debug!(server = %target.authority(), "reusing pooled connection");
            return Ok((Arc::clone(conn), key));
        }

        debug!(server = %target.authority(), "dialing");
        let conn = self.engine.connect(&Dial {
            target,
            identity,
            settings: self.settings.as_ref(),
            on_notify: self.on_notify.as_ref(),
            timeout,
        })?;

        let mut conns = self.lock();
        // Check again in case another caller connected concurrently.
        if let Some(existing) = conns.get(&key) {
            let existing = Arc::clone(existing);
            drop(conns);
            debug!(server = %target.authority(), "lost dial race; closing duplicate connection");
            conn.close();
            return Ok((existing, key));
        }
        conns.insert(key.clone(), Arc::clone(&conn));
        drop(conns);

        Ok((conn, key))
    }

    /// Remove and close the connection stored under `key`. A no-op if there
    /// is none.
    pub fn remove(&self, key: &PoolKey) {
        let removed = self.lock().remove(key);
        if let Some(conn) = removed {
            conn.close();
        }
    }

    /// Evict `conn` after it failed. The entry under `key` is removed only if
    /// it still holds `conn`; a replacement dialed since then stays pooled.
    /// `conn` itself is always closed.
    pub fn remove_conn(&self, key: &PoolKey, conn: &Arc<dyn Connection>) {
        {
            let mut conns = self.lock();
            if conns.get(key).is_some_and(|stored| Arc::ptr_eq(stored, conn)) {
                conns.remove(key);
            }
        }
        conn.close();
    }

    /// Remove and close every connection.
    pub fn close_all(&self) {
        let conns = std::mem::take(&mut *self.lock());
        for conn in conns.into_values() {
            conn.close();
        }
    }

    /// Whether a connection is stored under `key`.
    pub fn contains(&self, key: &PoolKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of stored connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use crate::engine::memory::MemoryEngine;
    use crate::engine::Reply;

    fn pool_with(engine: &MemoryEngine) -> ConnPool {
        ConnPool::new(Arc::new(engine.clone()), None, None)
    }

    fn serving(hosts: &[&str]) -> MemoryEngine {
        let engine = MemoryEngine::new();
        for host in hosts {
            engine.serve(host, 6937, |_, _| Reply::new("ok"));
        }
        engine
    }

    #[test]
    fn same_server_reuses_connection() {
        let engine = serving(&["node1"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();

        let (a, key_a) = pool.get(&Target::new("node1", 6937, "/a"), &id, None).unwrap();
        let (b, key_b) = pool.get(&Target::new("node1", 6937, "/b"), &id, None).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(key_a, key_b);
        assert_eq!(engine.dial_count(), 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn different_servers_get_distinct_connections() {
        let engine = serving(&["node1", "node2"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();

        let (a, _) = pool.get(&Target::new("node1", 6937, "/"), &id, None).unwrap();
        let (b, _) = pool.get(&Target::new("node2", 6937, "/"), &id, None).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn remove_forces_redial() {
        let engine = serving(&["node1"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();
        let target = Target::new("node1", 6937, "/");

        let (first, key) = pool.get(&target, &id, None).unwrap();
        pool.remove(&key);
        assert!(!pool.contains(&key));
        assert_eq!(engine.open_connections(), 0);

        let (second, _) = pool.get(&target, &id, None).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(engine.dial_count(), 2);
    }

    #[test]
    fn remove_unknown_key_is_noop() {
        let engine = serving(&["node1"]);
        let pool = pool_with(&engine);
        pool.remove(&Target::new("ghost", 1, "/").key());
        assert!(pool.is_empty());
    }

    #[test]
    fn failed_dial_stores_nothing() {
        let engine = MemoryEngine::new();
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();
        let target = Target::new("nowhere", 6937, "/");

        assert!(pool.get(&target, &id, None).is_err());
        assert!(!pool.contains(&target.key()));
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_conn_evicts_current_entry() {
        let engine = serving(&["node1"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();
        let (conn, key) = pool.get(&Target::new("node1", 6937, "/"), &id, None).unwrap();

        pool.remove_conn(&key, &conn);
        assert!(!pool.contains(&key));
        assert_eq!(engine.open_connections(), 0);
    }

    #[test]
    fn stale_remove_conn_keeps_replacement() {
        let engine = serving(&["node1"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();
        let target = Target::new("node1", 6937, "/");

        let (old, key) = pool.get(&target, &id, None).unwrap();
        pool.remove(&key);
        let (fresh, _) = pool.get(&target, &id, None).unwrap();

        pool.remove_conn(&key, &old);
        assert!(pool.contains(&key));
        let (stored, _) = pool.get(&target, &id, None).unwrap();
        assert!(Arc::ptr_eq(&stored, &fresh));
        assert_eq!(engine.open_connections(), 1);
        assert_eq!(engine.dial_count(), 2);
    }

    #[test]
    fn close_all_empties_and_closes() {
        let engine = serving(&["node1", "node2"]);
        let pool = pool_with(&engine);
        let id = Keypair::generate().unwrap();
        pool.get(&Target::new("node1", 6937, "/"), &id, None).unwrap();
        pool.get(&Target::new("node2", 6937, "/"), &id, None).unwrap();
        assert_eq!(engine.open_connections(), 2);

        pool.close_all();
        assert!(pool.is_empty());
        assert_eq!(engine.open_connections(), 0);
    }

    /// An engine whose dials all wait at a barrier, so every caller is
    /// guaranteed to be mid-dial before any of them stores.
    struct RacingEngine {
        inner: MemoryEngine,
        barrier: Barrier,
        dials: AtomicUsize,
    }

    impl Engine for RacingEngine {
        fn connect(&self, dial: &Dial<'_>) -> Result<Arc<dyn Connection>, BoxError> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            let conn = self.inner.connect(dial);
            self.barrier.wait();
            conn
        }

        fn version(&self) -> String {
            "racing".into()
        }
    }

    #[test]
    fn concurrent_dials_store_exactly_one_connection() {
        const CALLERS: usize = 8;
        let inner = serving(&["node1"]);
        let engine = Arc::new(RacingEngine {
            inner: inner.clone(),
            barrier: Barrier::new(CALLERS),
            dials: AtomicUsize::new(0),
        });
        let pool = ConnPool::new(engine.clone(), None, None);
        let id = Keypair::generate().unwrap();
        let target = Target::new("node1", 6937, "/");

        let conns: Vec<Arc<dyn Connection>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| s.spawn(|| pool.get(&target, &id, None).unwrap().0))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(engine.dials.load(Ordering::SeqCst), CALLERS);
        assert_eq!(pool.len(), 1);
        for conn in &conns[1..] {
            assert!(Arc::ptr_eq(&conns[0], conn));
        }
        // Every loser closed its duplicate.
        assert_eq!(inner.open_connections(), 1);
    }
}

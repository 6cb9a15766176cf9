use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

use crate::error::StorageError;

mod memory;
mod migrations;
pub mod pointer;

pub use memory::MemoryStore;
pub use pointer::ActiveTaskPointer;

use migrations::run_migrations;

/// Key holding the bearer credential consumed by every remote call.
pub const TOKEN_KEY: &str = "token";

/// Other processes on the device may hold the write lock for a moment.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// String-keyed durable slots. Implementations must not cache reads: other
/// processes may write the same slots.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Close,
}

/// Owns the connection thread; closing happens when the last handle drops.
struct Worker {
    requests: mpsc::Sender<Request>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Fails only when the thread never got past opening.
        let _ = self.requests.send(Request::Close);
        if thread.join().is_err() {
            error!("kv store thread panicked");
        }
    }
}

fn prepare_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("cannot open kv store {}", path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .context("cannot switch kv store to WAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("cannot set kv store busy timeout")?;
    run_migrations(&mut conn).context("kv store migration failed")?;
    Ok(conn)
}

fn serve(mut conn: Connection, requests: mpsc::Receiver<Request>) {
    for request in requests {
        match request {
            Request::Run(job) => job(&mut conn),
            Request::Close => break,
        }
    }
    debug!("kv store thread closed");
}

/// SQLite-backed store. Every statement runs on one thread that owns the
/// connection; callers hand it closures and await the reply.
#[derive(Clone)]
pub struct SqliteStore {
    worker: Arc<Worker>,
}

impl SqliteStore {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }

        let (requests, incoming) = mpsc::channel::<Request>();
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name("fieldtrack-store".into())
            .spawn(move || match prepare_connection(&db_path) {
                Ok(conn) => {
                    if opened_tx.send(Ok(())).is_ok() {
                        serve(conn, incoming);
                    }
                }
                Err(err) => {
                    let _ = opened_tx.send(Err(err));
                }
            })
            .context("cannot spawn kv store thread")?;

        let worker = Worker {
            requests,
            thread: Some(thread),
        };
        opened_rx
            .recv()
            .map_err(|_| anyhow!("kv store thread died while opening"))??;

        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Runs `job` on the store thread.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Request::Run(Box::new(move |conn| {
            // The caller may have been cancelled; nothing to report to.
            let _ = reply_tx.send(job(conn));
        }));

        self.worker
            .requests
            .send(request)
            .map_err(|_| anyhow!("kv store is closed"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("kv store thread dropped the request"))?
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("failed to read key {key}"))
        })
        .await
    }

    pub async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
            Ok(())
        })
        .await
    }

    pub async fn remove_value(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove key {key}"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_value(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.set_value(key, value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.remove_value(key).await?)
    }
}

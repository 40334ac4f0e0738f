//! One-shot query engine sessions.
//!
//! Each load gets a fresh engine instance: a worker thread owning a
//! `SQLContext`, driven over a channel. A fresh instance per request avoids
//! cross-request state leakage and keeps teardown trivial; worker startup is
//! cheap relative to the network fetch it runs alongside.

use crate::error::LoadError;
use polars::prelude::*;
use polars_sql::SQLContext;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

enum EngineCommand {
    Register {
        name: String,
        bytes: Vec<u8>,
        reply: Sender<Result<(), LoadError>>,
    },
    Query {
        sql: String,
        reply: Sender<Result<DataFrame, LoadError>>,
    },
    Shutdown,
}

/// A live connection to a per-request engine worker.
///
/// At most one buffer may be registered per session. The worker is shut down
/// exactly once: by `close()` on the success path, or by `Drop` when the load
/// bails out early.
pub struct EngineSession {
    tx: Sender<EngineCommand>,
    worker: Option<JoinHandle<()>>,
    registered: bool,
}

impl EngineSession {
    /// Start an engine worker and establish a connection to it.
    pub fn open() -> Result<Self, LoadError> {
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("catex-engine".to_string())
            .spawn(move || worker_loop(rx))
            .map_err(|e| LoadError::EngineInit(e.to_string()))?;
        Ok(Self {
            tx,
            worker: Some(worker),
            registered: false,
        })
    }

    /// Make `bytes` (a parquet file body) addressable as table `name` in
    /// subsequent SQL `FROM` clauses.
    pub fn register_buffer(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), LoadError> {
        if self.registered {
            return Err(LoadError::Query(
                "A buffer is already registered with this session.".to_string(),
            ));
        }
        let (reply, result) = mpsc::channel();
        self.tx
            .send(EngineCommand::Register {
                name: name.to_string(),
                bytes,
                reply,
            })
            .map_err(|_| worker_gone())?;
        result.recv().map_err(|_| worker_gone())??;
        self.registered = true;
        Ok(())
    }

    /// Execute a single SQL statement and return the materialized rowset.
    pub fn query(&self, sql: &str) -> Result<DataFrame, LoadError> {
        let (reply, result) = mpsc::channel();
        self.tx
            .send(EngineCommand::Query {
                sql: sql.to_string(),
                reply,
            })
            .map_err(|_| worker_gone())?;
        result.recv().map_err(|_| worker_gone())?
    }

    /// Release the connection and terminate the worker.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = self.tx.send(EngineCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_gone() -> LoadError {
    LoadError::EngineInit("the engine worker stopped unexpectedly".to_string())
}

fn worker_loop(rx: Receiver<EngineCommand>) {
    let mut ctx = SQLContext::new();
    while let Ok(command) = rx.recv() {
        match command {
            EngineCommand::Register { name, bytes, reply } => {
                let result = ParquetReader::new(Cursor::new(bytes))
                    .finish()
                    .map(|df| ctx.register(&name, df.lazy()))
                    .map_err(LoadError::from);
                let _ = reply.send(result);
            }
            EngineCommand::Query { sql, reply } => {
                let result = ctx
                    .execute(&sql)
                    .and_then(|lf| lf.collect())
                    .map_err(LoadError::from);
                let _ = reply.send(result);
            }
            EngineCommand::Shutdown => break,
        }
    }
}

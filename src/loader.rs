//! Background loading.
//!
//! File reads and remote fetches run on short-lived worker threads and
//! report back over a channel. Each request is stamped with the loader's
//! generation at the time it was made; [`Loader::cancel`] and every new
//! request move the generation forward, so anything still in flight from
//! before arrives stale and is dropped in [`Loader::poll`].

use crate::document::Document;
use crate::error::LoadError;
use crate::remote::{FileMeta, FileSource};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub enum Payload {
    Document(Document),
    Files(Vec<FileMeta>),
}

#[derive(Debug)]
pub struct Completed {
    pub generation: u64,
    pub label: String,
    pub result: Result<Payload, LoadError>,
}

pub struct Loader {
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    generation: u64,
    pending: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            generation: 0,
            pending: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    /// Invalidates everything in flight.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = 0;
        tracing::debug!(generation = self.generation, "loader cancelled");
    }

    fn spawn(&mut self, label: String, job: impl FnOnce() -> Result<Payload, LoadError> + Send + 'static) -> u64 {
        self.generation += 1;
        self.pending = 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = job();
            let _ = tx.send(Completed {
                generation,
                label,
                result,
            });
        });
        generation
    }

    pub fn request_local(&mut self, path: impl Into<PathBuf>) -> u64 {
        let path = path.into();
        let label = path.display().to_string();
        self.spawn(label, move || Document::read(&path).map(Payload::Document))
    }

    pub fn request_listing(&mut self, source: Arc<dyn FileSource>, key: Option<String>) -> u64 {
        let label = key.clone().unwrap_or_else(|| "files".to_string());
        self.spawn(label, move || {
            let files = match key {
                Some(key) => source.list_children(&key),
                None => source.list_files(),
            };
            Ok(Payload::Files(files?))
        })
    }

    pub fn request_remote(&mut self, source: Arc<dyn FileSource>, id: String) -> u64 {
        let label = id.clone();
        self.spawn(label, move || Ok(Payload::Document(source.fetch_content(&id)?)))
    }

    /// Next result from the current generation, if one has arrived.
    pub fn poll(&mut self) -> Option<Completed> {
        while let Ok(done) = self.rx.try_recv() {
            if done.generation != self.generation {
                tracing::warn!(
                    label = %done.label,
                    stale = done.generation,
                    current = self.generation,
                    "discarding stale load"
                );
                continue;
            }
            self.pending = 0;
            return Some(done);
        }
        None
    }

    /// Blocks until the current request finishes. Meant for tests and
    /// headless callers.
    pub fn wait(&mut self) -> Option<Completed> {
        while self.pending > 0 {
            let done = self.rx.recv().ok()?;
            if done.generation == self.generation {
                self.pending = 0;
                return Some(done);
            }
        }
        None
    }
}

//! Coarse cache invalidation between facades sharing one store.
//!
//! A channel carries a generation counter. Publishing bumps it; each
//! [`Subscription`] remembers the last generation it saw and reports a
//! change exactly once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::error::SetmanError;

pub trait InvalidationChannel: Send + Sync + fmt::Debug {
    /// Tell every subscriber that stored data changed.
    fn publish(&self) -> Result<(), SetmanError>;

    /// Current generation; changes on every publish.
    fn generation(&self) -> u64;
}

/// In-process channel.
#[derive(Debug, Default)]
pub struct LocalChannel {
    generation: AtomicU64,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvalidationChannel for LocalChannel {
    fn publish(&self) -> Result<(), SetmanError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Channel shared by processes through a marker file holding the generation.
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileChannel { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<u64, SetmanError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().parse().unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(SetmanError::io(&self.path, e)),
        }
    }
}

impl InvalidationChannel for FileChannel {
    fn publish(&self) -> Result<(), SetmanError> {
        let next = self.read()?.wrapping_add(1);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SetmanError::io(parent, e))?;
        }
        std::fs::write(&self.path, next.to_string()).map_err(|e| SetmanError::io(&self.path, e))
    }

    fn generation(&self) -> u64 {
        self.read().unwrap_or_else(|e| {
            warn!("Cannot read invalidation marker: {e}");
            0
        })
    }
}

pub struct Subscription {
    channel: Arc<dyn InvalidationChannel>,
    seen: u64,
}

impl Subscription {
    /// Subscribe from the channel's current generation on.
    pub fn new(channel: Arc<dyn InvalidationChannel>) -> Self {
        let seen = channel.generation();
        Subscription { channel, seen }
    }

    /// True once for every batch of publishes since the last call.
    pub fn take(&mut self) -> bool {
        let current = self.channel.generation();
        if current == self.seen {
            return false;
        }
        self.seen = current;
        true
    }

    pub fn channel(&self) -> &Arc<dyn InvalidationChannel> {
        &self.channel
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("seen", &self.seen)
            .finish()
    }
}

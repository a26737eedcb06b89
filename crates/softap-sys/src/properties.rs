//! Generation-aware control property store.
//!
//! The service manager is driven through named properties: writing the
//! daemon name to a control key (`ctl.start` / `ctl.stop`) requests a
//! transition, and a status property (`init.svc.<daemon>`) reflects the
//! observed run state. Each status observation carries a change
//! generation so a flap (stopped → running → stopped) can be told apart
//! from a daemon that never left "stopped".

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// One observation of a property: its value and the change generation
/// current at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub value: String,
    pub generation: u64,
}

/// Key/value store with generation-aware reads.
pub trait PropertyStore {
    /// Reads the value and current change generation in one observation.
    fn observe(&self, name: &str) -> Option<Observation>;

    /// Sets a property. For control keys this is the request itself.
    fn set(&self, name: &str, value: &str) -> io::Result<()>;

    /// Reads just the value.
    fn get(&self, name: &str) -> Option<String> {
        self.observe(name).map(|obs| obs.value)
    }
}

/// Property store backed by one file per key under a root directory.
///
/// The change generation is derived from the file's modification time in
/// nanoseconds; rapid back-to-back writes on a coarse-clock filesystem
/// may share a generation.
#[derive(Debug, Clone)]
pub struct DirPropertyStore {
    root: PathBuf,
}

impl DirPropertyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl PropertyStore for DirPropertyStore {
    fn observe(&self, name: &str) -> Option<Observation> {
        let path = self.entry(name);
        let value = fs::read_to_string(&path).ok()?;
        let generation = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok())
            .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
            .map(|age| age.as_nanos() as u64)
            .unwrap_or(0);
        Some(Observation {
            value: value.trim_end().to_string(),
            generation,
        })
    }

    fn set(&self, name: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.entry(name), value)
    }
}

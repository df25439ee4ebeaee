use super::entry::FileStatusEntry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Last known status of the repository.
///
/// Holds a path lookup and a path-sorted sequence that always cover the same
/// keys, plus the time of the last full refresh. The cache is a soft
/// optimisation: writes are last-write-wins and a caller can always bypass
/// it.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    entries: HashMap<String, FileStatusEntry>,
    order: Vec<String>,
    last_update: Option<Instant>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A full refresh happened less than `validity` ago
    pub fn is_valid(&self, validity: Duration) -> bool {
        self.last_update
            .is_some_and(|updated| updated.elapsed() < validity)
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Swap in a complete snapshot and stamp it. Entries are sorted by path;
    /// a repeated path keeps its last entry.
    pub fn replace(&mut self, entries: Vec<FileStatusEntry>) {
        self.entries.clear();
        for entry in entries {
            self.entries.insert(entry.path.clone(), entry);
        }
        self.order = self.entries.keys().cloned().collect();
        self.order.sort();
        self.last_update = Some(Instant::now());
    }

    /// Insert or replace one entry without touching the timestamp
    pub fn upsert(&mut self, entry: FileStatusEntry) {
        if let Err(position) = self.order.binary_search(&entry.path) {
            self.order.insert(position, entry.path.clone());
        }
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileStatusEntry> {
        let removed = self.entries.remove(path)?;
        if let Ok(position) = self.order.binary_search_by(|p| p.as_str().cmp(path)) {
            self.order.remove(position);
        }
        Some(removed)
    }

    pub fn get(&self, path: &str) -> Option<&FileStatusEntry> {
        self.entries.get(path)
    }

    /// Entries in path order
    pub fn ordered(&self) -> Vec<FileStatusEntry> {
        self.order
            .iter()
            .filter_map(|path| self.entries.get(path))
            .cloned()
            .collect()
    }

    /// Drop everything and forget the last refresh
    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.last_update = None;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

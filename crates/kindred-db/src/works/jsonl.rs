//! JSONL-backed work store.
//!
//! Keeps every work in memory and rewrites the whole file on each write,
//! via a temporary file and a rename so readers of the file never observe a
//! half-written embedding. Intended for catalogues that fit in memory: every
//! single-work write costs a full O(N) rewrite, so a backfill of N works
//! writes O(N²) bytes.
//!
//! Lines that do not parse as a work are kept verbatim and written back on
//! every save, so a row this version cannot read is never lost.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::Utc;
use tracing::{debug, trace, warn};

use super::{Work, WorkFilter, WorkId, WorkStore};
use crate::error::{DbError, DbResult};

/// Work store persisted as one JSON object per line.
pub struct JsonlWorkStore {
    /// Backing file, `None` for a purely in-memory store.
    path: Option<PathBuf>,

    /// Works keyed by id; the ordering gives deterministic scans.
    works: RwLock<BTreeMap<WorkId, Work>>,

    /// Raw lines that failed to parse when the file was loaded.
    unparsed: Vec<String>,

    /// Held for a whole write, so snapshots reach disk in the order taken.
    /// The `works` write guard is only held while mutating memory.
    writer: Mutex<()>,
}

impl JsonlWorkStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening JsonlWorkStore at {:?}", path);

        let (works, unparsed) = if path.exists() {
            load_from_file(&path)?
        } else {
            (BTreeMap::new(), Vec::new())
        };

        Ok(Self {
            path: Some(path),
            works: RwLock::new(works),
            unparsed,
            writer: Mutex::new(()),
        })
    }

    /// Create a store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            works: RwLock::new(BTreeMap::new()),
            unparsed: Vec::new(),
            writer: Mutex::new(()),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of lines kept verbatim because they did not parse.
    pub fn unparsed_len(&self) -> usize {
        self.unparsed.len()
    }

    /// Copy of the map to persist, or `None` when there is no backing file.
    fn snapshot(&self, works: &BTreeMap<WorkId, Work>) -> Option<BTreeMap<WorkId, Work>> {
        self.path.as_ref().map(|_| works.clone())
    }

    fn save(&self, works: &BTreeMap<WorkId, Work>) -> DbResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DbError::store_io(parent, e.to_string()))?;
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        let write = || -> DbResult<()> {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for work in works.values() {
                serde_json::to_writer(&mut writer, work)?;
                writer.write_all(b"\n")?;
            }
            for line in &self.unparsed {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| DbError::store_io(&tmp_path, e.to_string()))?
                .sync_all()?;
            fs::rename(&tmp_path, path)?;
            Ok(())
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            match e {
                DbError::Io(io) => DbError::store_io(path, io.to_string()),
                other => other,
            }
        })?;

        trace!(
            "Saved {} works ({} kept verbatim) to {:?}",
            works.len(),
            self.unparsed.len(),
            path
        );
        Ok(())
    }
}

type Loaded = (BTreeMap<WorkId, Work>, Vec<String>);

fn load_from_file(path: &Path) -> DbResult<Loaded> {
    debug!("Loading works from {:?}", path);

    let file = File::open(path).map_err(|e| DbError::store_io(path, e.to_string()))?;
    let reader = BufReader::new(file);
    let mut works = BTreeMap::new();
    let mut unparsed = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| DbError::store_io(path, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Work>(&line) {
            Ok(work) => {
                works.insert(work.id.clone(), work);
            }
            Err(e) => {
                warn!(
                    "Keeping unreadable line {:?}:{} as-is: {}",
                    path,
                    line_num + 1,
                    e
                );
                unparsed.push(line);
            }
        }
    }

    debug!("Loaded {} works", works.len());
    Ok((works, unparsed))
}

fn lock_err(e: impl std::fmt::Display) -> DbError {
    DbError::internal(format!("Failed to acquire work store lock: {}", e))
}

impl WorkStore for JsonlWorkStore {
    fn get(&self, id: &WorkId) -> DbResult<Option<Work>> {
        let works = self.works.read().map_err(lock_err)?;
        Ok(works.get(id).cloned())
    }

    fn set_embedding(&self, id: &WorkId, embedding: &[f32]) -> DbResult<()> {
        if embedding.is_empty() {
            return Err(DbError::vector_literal("refusing to store an empty vector"));
        }
        if let Some(bad) = embedding.iter().find(|v| !v.is_finite()) {
            return Err(DbError::vector_literal(format!(
                "refusing to store non-finite value {}",
                bad
            )));
        }

        let _writing = self.writer.lock().map_err(lock_err)?;

        let (previous, snapshot) = {
            let mut works = self.works.write().map_err(lock_err)?;
            let work = works
                .get_mut(id)
                .ok_or_else(|| DbError::work_not_found(id.as_str()))?;

            let previous = (work.embedding.take(), work.embedded_at.take());
            work.embedding = Some(embedding.to_vec());
            work.embedded_at = Some(Utc::now());
            (previous, self.snapshot(&works))
        };

        if let Some(snapshot) = snapshot {
            if let Err(e) = self.save(&snapshot) {
                // Roll back so memory and disk agree.
                let mut works = self.works.write().map_err(lock_err)?;
                if let Some(work) = works.get_mut(id) {
                    work.embedding = previous.0;
                    work.embedded_at = previous.1;
                }
                return Err(e);
            }
        }

        trace!("Stored embedding for {} ({} dims)", id, embedding.len());
        Ok(())
    }

    fn scan_embedded(&self, filter: &WorkFilter) -> DbResult<Vec<Work>> {
        let works = self.works.read().map_err(lock_err)?;
        let matched: Vec<Work> = works
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        trace!("Scan matched {} of {} works", matched.len(), works.len());
        Ok(matched)
    }

    fn ids_missing_embedding(&self) -> DbResult<Vec<WorkId>> {
        let works = self.works.read().map_err(lock_err)?;
        Ok(works
            .values()
            .filter(|w| w.embedding.is_none())
            .map(|w| w.id.clone())
            .collect())
    }

    fn upsert(&self, incoming: &[Work]) -> DbResult<usize> {
        if incoming.is_empty() {
            return Ok(0);
        }
        debug!("Upserting {} works", incoming.len());

        let _writing = self.writer.lock().map_err(lock_err)?;

        let (replaced, snapshot) = {
            let mut works = self.works.write().map_err(lock_err)?;
            let replaced: Vec<(WorkId, Option<Work>)> = incoming
                .iter()
                .map(|work| (work.id.clone(), works.insert(work.id.clone(), work.clone())))
                .collect();
            (replaced, self.snapshot(&works))
        };

        if let Some(snapshot) = snapshot {
            if let Err(e) = self.save(&snapshot) {
                let mut works = self.works.write().map_err(lock_err)?;
                // Undo in reverse so duplicate ids restore their first prior value.
                for (id, prior) in replaced.into_iter().rev() {
                    match prior {
                        Some(work) => works.insert(id, work),
                        None => works.remove(&id),
                    };
                }
                return Err(e);
            }
        }
        Ok(incoming.len())
    }

    fn len(&self) -> DbResult<usize> {
        let works = self.works.read().map_err(lock_err)?;
        Ok(works.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::works::{ModerationStatus, WorkKind};
    use tempfile::TempDir;

    fn sample() -> Vec<Work> {
        vec![
            Work::new("b", "Second", WorkKind::Novel).with_embedding(vec![0.0, 1.0]),
            Work::new("a", "First", WorkKind::Video).with_embedding(vec![1.0, 0.0]),
            Work::new("c", "Hidden", WorkKind::Novel)
                .with_embedding(vec![1.0, 1.0])
                .with_status(ModerationStatus::Pending),
            Work::new("d", "Pending embed", WorkKind::Novel),
        ]
    }

    #[test]
    fn test_scan_is_sorted_and_visible_only() {
        let store = JsonlWorkStore::in_memory();
        store.upsert(&sample()).unwrap();

        let ids: Vec<String> = store
            .scan_embedded(&WorkFilter::new())
            .unwrap()
            .into_iter()
            .map(|w| w.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let novels = store
            .scan_embedded(&WorkFilter::new().with_kind(Some(WorkKind::Novel)))
            .unwrap();
        assert_eq!(novels.len(), 1);
        assert_eq!(novels[0].id.as_str(), "b");
    }

    #[test]
    fn test_ids_missing_embedding() {
        let store = JsonlWorkStore::in_memory();
        store.upsert(&sample()).unwrap();
        assert_eq!(store.ids_missing_embedding().unwrap(), vec![WorkId::from("d")]);
    }

    #[test]
    fn test_set_embedding_unknown_work() {
        let store = JsonlWorkStore::in_memory();
        let err = store.set_embedding(&WorkId::from("nope"), &[1.0]).unwrap_err();
        assert!(matches!(err, DbError::WorkNotFound { .. }));
    }

    #[test]
    fn test_set_embedding_rejects_non_finite() {
        let store = JsonlWorkStore::in_memory();
        store.upsert(&sample()).unwrap();
        let id = WorkId::from("d");
        assert!(store.set_embedding(&id, &[f32::NAN]).is_err());
        assert!(store.set_embedding(&id, &[]).is_err());
        assert!(store.get(&id).unwrap().unwrap().embedding.is_none());
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("works.jsonl");

        let store = JsonlWorkStore::open(&path).unwrap();
        store.upsert(&sample()).unwrap();
        store.set_embedding(&WorkId::from("d"), &[0.25, -0.5]).unwrap();
        drop(store);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""embedding":"[0.25,-0.5]""#));
        assert!(!path.with_extension("jsonl.tmp").exists());

        let reopened = JsonlWorkStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 4);
        let d = reopened.get(&WorkId::from("d")).unwrap().unwrap();
        assert_eq!(d.embedding, Some(vec![0.25, -0.5]));
        assert!(d.embedded_at.is_some());
    }

    #[test]
    fn test_invalid_lines_are_not_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("works.jsonl");
        fs::write(
            &path,
            "{\"id\":\"ok\",\"title\":\"Fine\"}\nnot json\n\n{\"id\":\"bad\",\"title\":\"x\",\"embedding\":\"[1,,2]\"}\n",
        )
        .unwrap();

        let store = JsonlWorkStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.unparsed_len(), 2);
        assert!(store.get(&WorkId::from("ok")).unwrap().is_some());
    }

    #[test]
    fn test_unreadable_rows_survive_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("works.jsonl");
        let comic = r#"{"id":"comic-1","title":"Panels","type":"comic"}"#;
        fs::write(
            &path,
            format!("{{\"id\":\"ok\",\"title\":\"Fine\"}}\n{}\nnot json\n", comic),
        )
        .unwrap();

        let store = JsonlWorkStore::open(&path).unwrap();
        store.set_embedding(&WorkId::from("ok"), &[1.0, 0.0]).unwrap();
        store
            .upsert(&[Work::new("new", "Fresh", WorkKind::Video)])
            .unwrap();
        drop(store);

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&comic));
        assert!(lines.contains(&"not json"));

        let reopened = JsonlWorkStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert_eq!(reopened.unparsed_len(), 2);
    }

    #[test]
    fn test_reads_proceed_while_a_writer_waits() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonlWorkStore::open(dir.path().join("works.jsonl")).unwrap());
        store.upsert(&sample()).unwrap();

        // Stand in for a save in flight: the next writer queues behind it.
        let in_flight = store.writer.lock().unwrap();
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.set_embedding(&WorkId::from("d"), &[0.5, 0.5]))
        };
        thread::sleep(Duration::from_millis(50));

        assert!(store.works.try_read().is_ok());
        assert_eq!(store.scan_embedded(&WorkFilter::new()).unwrap().len(), 2);

        drop(in_flight);
        writer.join().unwrap().unwrap();
        assert_eq!(store.scan_embedded(&WorkFilter::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_concurrent_writers_all_reach_disk() {
        use std::sync::Arc;
        use std::thread;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("works.jsonl");
        let store = Arc::new(JsonlWorkStore::open(&path).unwrap());
        let works: Vec<Work> = (0..8)
            .map(|i| Work::new(format!("w{}", i), format!("Work {}", i), WorkKind::Novel))
            .collect();
        store.upsert(&works).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .set_embedding(&WorkId::new(format!("w{}", i)), &[i as f32, 1.0])
                        .unwrap();
                    store.scan_embedded(&WorkFilter::new()).unwrap().len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        drop(store);

        let reopened = JsonlWorkStore::open(&path).unwrap();
        assert!(reopened.ids_missing_embedding().unwrap().is_empty());
    }
}

//! Snapshot codec (C8): an LZ4-compressed, newline-delimited JSON on-disk index.
//! Each line is `{"key": <full_path>, "value": <Record>}`. `store` writes to a
//! temp file in the snapshot's own directory and renames over the destination,
//! so a crash mid-write never corrupts the previous snapshot — the same
//! prepare-temp / atomic-rename shape the source used for its own index file.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use lz4::{Decoder, EncoderBuilder};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::record::Record;
use crate::shutdown::ShutdownCoordinator;
use crate::store::IndexStore;

#[derive(Serialize, Deserialize)]
struct Line {
    key: String,
    value: Record,
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

/// Load `path` into `store`. A missing file is treated as an empty snapshot;
/// either way `last_load_ts` is stamped on return.
pub fn load(path: &Path, store: &IndexStore) -> Result<(), SnapshotError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            store.mark_loaded(Utc::now());
            return Ok(());
        }
        Err(source) => {
            return Err(SnapshotError::Open { path: path.to_path_buf(), source });
        }
    };

    let decoder = Decoder::new(file).map_err(|source| SnapshotError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(decoder);

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if line.is_empty() {
            continue;
        }
        let parsed: Line = serde_json::from_str(&line).map_err(|source| SnapshotError::Decode {
            line: lineno + 1,
            source,
        })?;
        store.insert_loaded(parsed.key, parsed.value);
    }

    store.mark_loaded(Utc::now());
    Ok(())
}

/// Persist every entry in `store` to `path`, while holding a shutdown-coordinator
/// task slot (the sole cooperation point with a host-level signal handler).
pub fn store(path: &Path, store: &IndexStore, shutdown: &ShutdownCoordinator) -> Result<(), SnapshotError> {
    let _task = shutdown.add_task();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| SnapshotError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path_for(path);
    let write_result = write_temp(&temp_path, store);
    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path).map_err(|source| SnapshotError::Rename {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })?;

    store.mark_persisted(Utc::now());
    Ok(())
}

fn write_temp(temp_path: &Path, index: &IndexStore) -> Result<(), SnapshotError> {
    let file = File::create(temp_path).map_err(|source| SnapshotError::Write {
        path: temp_path.to_path_buf(),
        source,
    })?;
    let encoder = EncoderBuilder::new()
        .build(BufWriter::new(file))
        .map_err(|source| SnapshotError::Write {
            path: temp_path.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::new(encoder);

    let mut io_result = Ok(());
    index.iterate(|key, record| {
        if io_result.is_err() {
            return;
        }
        io_result = (|| {
            let line = Line {
                key: key.to_string(),
                value: record.clone(),
            };
            serde_json::to_writer(&mut writer, &line).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")
        })();
    });
    io_result.map_err(|source| SnapshotError::Write {
        path: temp_path.to_path_buf(),
        source,
    })?;

    let encoder = writer.into_inner().map_err(|e| SnapshotError::Write {
        path: temp_path.to_path_buf(),
        source: e.into_error(),
    })?;
    let (_writer, result) = encoder.finish();
    result.map_err(|source| SnapshotError::Write {
        path: temp_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HashBundle, Permissions};

    fn sample(full_path: &str) -> Record {
        Record {
            name: full_path.rsplit('/').next().unwrap_or(full_path).to_string(),
            extension: String::new(),
            parent_path: String::new(),
            full_path: full_path.to_string(),
            size: 42,
            is_hidden: false,
            is_dir: false,
            is_cloud_placeholder: false,
            created_time: Utc::now(),
            mod_time: Utc::now(),
            accessed_time: Utc::now(),
            permissions: Permissions::default(),
            hash: HashBundle::default(),
            error: String::new(),
            attributes: Default::default(),
            transient: Default::default(),
        }
    }

    #[test]
    fn round_trips_through_lz4_ndjson() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.ndjson.lz4");
        let coordinator = ShutdownCoordinator::new();

        let original = IndexStore::new();
        original.put("/a.txt".into(), sample("/a.txt"));
        original.put("/b.txt".into(), sample("/b.txt"));
        store(&path, &original, &coordinator).unwrap();

        let loaded = IndexStore::new();
        load(&path, &loaded).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.last_load_ts().is_some());
        assert_eq!(loaded.get("/a.txt").unwrap().size, 42);
    }

    #[test]
    fn load_of_missing_file_is_empty_and_stamps_load_ts() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("does-not-exist.ndjson.lz4");
        let store_handle = IndexStore::new();
        load(&path, &store_handle).unwrap();
        assert!(store_handle.is_empty());
        assert!(store_handle.last_load_ts().is_some());
    }

    #[test]
    fn store_leaves_no_temp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.ndjson.lz4");
        let coordinator = ShutdownCoordinator::new();
        let index = IndexStore::new();
        index.put("/a.txt".into(), sample("/a.txt"));
        store(&path, &index, &coordinator).unwrap();
        assert!(!temp_path_for(&path).exists());
        assert!(path.exists());
    }
}

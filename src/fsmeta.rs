//! Shared record-construction helpers used by the Scanner: turning a path plus its
//! `std::fs::Metadata` into a [`Record`], including the POSIX permission strings and
//! the cloud-placeholder / error-record shortcuts from C7's record-construction rules.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::record::{Attributes, HashBundle, Permissions, Record, Transient};

fn to_datetime(t: std::io::Result<SystemTime>) -> DateTime<Utc> {
    t.ok().map(DateTime::<Utc>::from).unwrap_or_default()
}

#[cfg(unix)]
fn permissions_from_mode(mode: u32, is_dir: bool) -> Permissions {
    let class = |bits: u32| {
        let r = if bits & 0b100 != 0 { "r" } else { "-" };
        let w = if bits & 0b010 != 0 { "w" } else { "-" };
        let x = if bits & 0b001 != 0 { "x" } else { "-" };
        format!("{r}{w}{x}")
    };
    let owner = class((mode >> 6) & 0o7);
    let group = class((mode >> 3) & 0o7);
    let other = class(mode & 0o7);
    let lead = if is_dir { "d" } else { "-" };
    Permissions {
        permission: format!("{lead}{owner}{group}{other}"),
        owner,
        group,
        other,
    }
}

#[cfg(unix)]
fn permissions_of(meta: &Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    permissions_from_mode(meta.permissions().mode(), meta.is_dir())
}

#[cfg(not(unix))]
fn permissions_of(_meta: &Metadata) -> Permissions {
    Permissions::default()
}

fn split_name_ext(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    (name, ext)
}

/// Build a complete record for `path` given its metadata, platform attributes, and
/// a fully-computed (or empty) hash bundle. Does not decide whether to hash; the
/// caller (Scanner) makes that call per C7/C3.
pub fn build_record(path: &Path, meta: &Metadata, attributes: Attributes, hash: HashBundle) -> Record {
    let (name, extension) = split_name_ext(path);
    let is_hidden = name.starts_with('.');
    let full_path = path.to_string_lossy().to_string();
    let parent_path = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    if attributes.cloud_placeholder {
        return Record {
            name,
            extension,
            parent_path,
            full_path,
            size: 0,
            is_hidden,
            is_dir: meta.is_dir(),
            is_cloud_placeholder: true,
            created_time: to_datetime(meta.created()),
            mod_time: to_datetime(meta.modified()),
            accessed_time: to_datetime(meta.accessed()),
            permissions: permissions_of(meta),
            hash: HashBundle::default(),
            error: String::new(),
            attributes,
            transient: Transient::default(),
        };
    }

    Record {
        name,
        extension,
        parent_path,
        full_path,
        size: meta.len() as i64,
        is_hidden,
        is_dir: meta.is_dir(),
        is_cloud_placeholder: false,
        created_time: to_datetime(meta.created()),
        mod_time: to_datetime(meta.modified()),
        accessed_time: to_datetime(meta.accessed()),
        permissions: permissions_of(meta),
        hash,
        error: String::new(),
        attributes,
        transient: Transient::default(),
    }
}

/// Build an error record for a path that could not be fully stat'd / listed. Per
/// invariant 5, error records carry no hash bundle.
pub fn build_error_record(path: &Path, is_dir: bool, error: impl Into<String>) -> Record {
    let (name, extension) = split_name_ext(path);
    let full_path = path.to_string_lossy().to_string();
    let parent_path = path
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    Record {
        is_hidden: name.starts_with('.'),
        name,
        extension,
        parent_path,
        full_path,
        size: 0,
        is_dir,
        is_cloud_placeholder: false,
        created_time: Utc::now(),
        mod_time: Utc::now(),
        accessed_time: Utc::now(),
        permissions: Permissions::default(),
        hash: HashBundle::default(),
        error: error.into(),
        attributes: Attributes::default(),
        transient: Transient::default(),
    }
}

/// `(mod_time, size)` match used to decide whether an existing file record can be
/// skipped on rescan (C7 step 4).
pub fn unchanged(existing: &Record, meta: &Metadata) -> bool {
    existing.size == meta.len() as i64 && existing.mod_time == to_datetime(meta.modified())
}

//! The Record type and its nested schema (permissions, attributes, hash bundle,
//! transient score data). Field names and nesting follow the external JSON schema
//! exactly; Rust-side naming is idiomatic snake_case, bridged via `serde(rename)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SHA-2 family digests, all lowercase hex, empty string when not computed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sha2Bundle {
    #[serde(rename = "SHA224")]
    pub sha224: String,
    #[serde(rename = "SHA256")]
    pub sha256: String,
    #[serde(rename = "SHA384")]
    pub sha384: String,
    #[serde(rename = "SHA512")]
    pub sha512: String,
    #[serde(rename = "SHA512_224")]
    pub sha512_224: String,
    #[serde(rename = "SHA512_256")]
    pub sha512_256: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sha3Bundle {
    #[serde(rename = "SHA256")]
    pub sha256: String,
    #[serde(rename = "SHA512")]
    pub sha512: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrcBundle {
    #[serde(rename = "CRC32")]
    pub crc32: String,
    #[serde(rename = "CRC64")]
    pub crc64: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blake2bBundle {
    #[serde(rename = "Blake256")]
    pub blake256: String,
    #[serde(rename = "Blake384")]
    pub blake384: String,
    #[serde(rename = "Blake512")]
    pub blake512: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blake2sBundle {
    #[serde(rename = "Blake256")]
    pub blake256: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlakeBundle {
    #[serde(rename = "Blake2b")]
    pub blake2b: Blake2bBundle,
    #[serde(rename = "Blake2s")]
    pub blake2s: Blake2sBundle,
}

/// Fixed bundle of digests produced by the hashing adaptor (C3). All-empty is the
/// "not computed" state (directory, oversize, unreadable).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashBundle {
    #[serde(rename = "MD5")]
    pub md5: String,
    #[serde(rename = "SHA1")]
    pub sha1: String,
    #[serde(rename = "SHA2")]
    pub sha2: Sha2Bundle,
    #[serde(rename = "SHA3")]
    pub sha3: Sha3Bundle,
    #[serde(rename = "CRC")]
    pub crc: CrcBundle,
    #[serde(rename = "Blake")]
    pub blake: BlakeBundle,
}

impl HashBundle {
    pub fn is_empty(&self) -> bool {
        *self == HashBundle::default()
    }

    /// True if `query` appears as a substring of any digest, matching C2's hash block.
    pub fn contains_substring(&self, query: &str) -> bool {
        self.md5.contains(query)
            || self.sha1.contains(query)
            || self.sha2.sha224.contains(query)
            || self.sha2.sha256.contains(query)
            || self.sha2.sha384.contains(query)
            || self.sha2.sha512.contains(query)
            || self.sha2.sha512_224.contains(query)
            || self.sha2.sha512_256.contains(query)
            || self.sha3.sha256.contains(query)
            || self.sha3.sha512.contains(query)
            || self.crc.crc32.contains(query)
            || self.crc.crc64.contains(query)
            || self.blake.blake2b.blake256.contains(query)
            || self.blake.blake2b.blake384.contains(query)
            || self.blake.blake2b.blake512.contains(query)
            || self.blake.blake2s.blake256.contains(query)
    }
}

/// Owner/group/other textual permission classes plus the combined symbolic mode
/// string used by scoring. On platforms without POSIX permission bits, all fields
/// are empty strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    pub owner: String,
    pub group: String,
    pub other: String,
    /// Combined symbolic mode, e.g. `-rwxr-xr-x`; empty when unavailable.
    pub permission: String,
}

/// Windows file attribute bits. Non-Windows attribute adaptors always return the
/// all-false default.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    pub directory: bool,
    pub archive: bool,
    pub normal: bool,
    pub temporary: bool,
    pub offline: bool,
    pub not_content_indexed: bool,
    pub encrypted: bool,
    /// Cloud placeholder bit (e.g. OneDrive "files on demand").
    pub cloud_placeholder: bool,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        *self == Attributes::default()
    }
}

/// Per-factor breakdown for a file match, per C2.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileScore {
    pub contains: i64,
    pub exact: i64,
    pub start: i64,
    pub word: i64,
    pub length: i64,
    pub extension: i64,
    pub hash: i64,
    pub permission: i64,
}

/// Per-factor breakdown for a directory match, per C2.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirScore {
    pub contains: i64,
    pub exact: i64,
    pub start: i64,
    pub word: i64,
    pub length: i64,
    pub permissions: i64,
}

/// Tagged sum type in place of the source's dynamically-typed score payload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ScoreBreakdown {
    File(FileScore),
    Dir(DirScore),
}

/// Search-only fields; never persisted in a snapshot (invariant 6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transient {
    pub score: i64,
    pub score_data: Option<ScoreBreakdown>,
}

/// One filesystem entry, keyed by `full_path` in the Index store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(rename = "ext")]
    pub extension: String,
    /// Parent directory path (the source's `path` field).
    #[serde(rename = "path")]
    pub parent_path: String,
    #[serde(rename = "fullPath")]
    pub full_path: String,
    pub size: i64,
    #[serde(rename = "isHidden")]
    pub is_hidden: bool,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
    #[serde(rename = "isOneDrive")]
    pub is_cloud_placeholder: bool,
    #[serde(rename = "created")]
    pub created_time: DateTime<Utc>,
    #[serde(rename = "modTime")]
    pub mod_time: DateTime<Utc>,
    #[serde(rename = "accessed")]
    pub accessed_time: DateTime<Utc>,
    pub permissions: Permissions,
    pub hash: HashBundle,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(
        rename = "windowsAttributes",
        default,
        skip_serializing_if = "Attributes::is_empty"
    )]
    pub attributes: Attributes,
    #[serde(skip)]
    pub transient: Transient,
}

impl Record {
    /// True iff the record is complete (invariant 5: errors carry no hash bundle).
    pub fn is_complete(&self) -> bool {
        self.error.is_empty()
    }
}

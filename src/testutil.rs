//! Test-only fixtures. Kept out of `/tmp` deliberately: the Scanner's own
//! temp-directory blacklist would otherwise skip everything created here.

use std::path::Path;

pub(crate) fn scratch_dir() -> tempfile::TempDir {
    let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("target").join("test-scratch");
    std::fs::create_dir_all(&base).unwrap();
    tempfile::Builder::new().prefix("case-").tempdir_in(&base).unwrap()
}

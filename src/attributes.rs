//! Attribute adaptor (C4): given a path, returns platform attributes. Non-Windows
//! platforms return the all-empty bundle; the Scanner treats that as "no attribute
//! signal", not an error.

use std::path::Path;

use crate::record::Attributes;

/// Raw Windows `FILE_ATTRIBUTE_*` bits this adaptor maps to [`Attributes`].
#[cfg(windows)]
mod bits {
    pub const READONLY: u32 = 0x1;
    pub const HIDDEN: u32 = 0x2;
    pub const SYSTEM: u32 = 0x4;
    pub const DIRECTORY: u32 = 0x10;
    pub const ARCHIVE: u32 = 0x20;
    pub const NORMAL: u32 = 0x80;
    pub const TEMPORARY: u32 = 0x100;
    pub const OFFLINE: u32 = 0x1000;
    pub const NOT_CONTENT_INDEXED: u32 = 0x2000;
    pub const ENCRYPTED: u32 = 0x4000;
    /// Undocumented bit used by OneDrive/cloud-sync clients to mark placeholders.
    pub const CLOUD_PLACEHOLDER: u32 = 0x0040_0000;
}

/// Platform attribute probe, kept as a trait so the Scanner does not need
/// `cfg(windows)` sprinkled through its own logic.
pub trait AttributeProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Attributes;
}

#[cfg(windows)]
pub struct WindowsAttributeProbe;

#[cfg(windows)]
impl AttributeProbe for WindowsAttributeProbe {
    fn probe(&self, path: &Path) -> Attributes {
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let raw = unsafe { winapi_get_file_attributes(wide.as_ptr()) };
        let Some(attr) = raw else {
            return Attributes::default();
        };
        Attributes {
            read_only: attr & bits::READONLY != 0,
            hidden: attr & bits::HIDDEN != 0,
            system: attr & bits::SYSTEM != 0,
            directory: attr & bits::DIRECTORY != 0,
            archive: attr & bits::ARCHIVE != 0,
            normal: attr & bits::NORMAL != 0,
            temporary: attr & bits::TEMPORARY != 0,
            offline: attr & bits::OFFLINE != 0,
            not_content_indexed: attr & bits::NOT_CONTENT_INDEXED != 0,
            encrypted: attr & bits::ENCRYPTED != 0,
            cloud_placeholder: attr & bits::CLOUD_PLACEHOLDER != 0,
        }
    }
}

#[cfg(windows)]
unsafe fn winapi_get_file_attributes(path: *const u16) -> Option<u32> {
    unsafe extern "system" {
        fn GetFileAttributesW(lpFileName: *const u16) -> u32;
    }
    const INVALID_FILE_ATTRIBUTES: u32 = u32::MAX;
    let attr = unsafe { GetFileAttributesW(path) };
    if attr == INVALID_FILE_ATTRIBUTES {
        None
    } else {
        Some(attr)
    }
}

/// Non-Windows platforms have no attribute bits to report.
pub struct NullAttributeProbe;

impl AttributeProbe for NullAttributeProbe {
    fn probe(&self, _path: &Path) -> Attributes {
        Attributes::default()
    }
}

/// Build the attribute probe appropriate for the running platform.
#[cfg(windows)]
pub fn platform_probe() -> Box<dyn AttributeProbe> {
    Box::new(WindowsAttributeProbe)
}

#[cfg(not(windows))]
pub fn platform_probe() -> Box<dyn AttributeProbe> {
    Box::new(NullAttributeProbe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_probe_is_always_empty() {
        let probe = NullAttributeProbe;
        let attrs = probe.probe(Path::new("/tmp"));
        assert!(attrs.is_empty());
    }
}

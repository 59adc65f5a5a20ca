//! Package reading: the open ZIP container for one parse call

use crate::error::{Error, Result};
use std::io::Read;
use urlencoding::decode;
use zip::ZipArchive;

/// An open 3MF package
///
/// The container owns the archive for the duration of one parse and is
/// released when dropped, on success and error paths alike. Missing parts
/// are a normal condition — Bambu packages vary in which optional parts
/// they include — so lookups return `None` instead of failing.
pub struct Container<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + std::io::Seek> Container<R> {
    /// Open a package from a reader
    ///
    /// Fails with [`Error::PackageOpen`] when the bytes are not a valid
    /// ZIP container.
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).map_err(|source| Error::PackageOpen { source })?;
        Ok(Self { archive })
    }

    /// Read a part as raw bytes, or `None` when the part is absent
    pub fn read_part(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let name = match self.resolve_name(path) {
            Some(name) => name,
            None => return Ok(None),
        };

        let mut file = match self.archive.by_name(&name) {
            Ok(file) => file,
            Err(_) => return Ok(None),
        };
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(Some(content))
    }

    /// Read a part as a UTF-8 string, or `None` when the part is absent
    ///
    /// Invalid UTF-8 sequences are replaced rather than failing the read.
    pub fn read_part_string(&mut self, path: &str) -> Result<Option<String>> {
        Ok(self
            .read_part(path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Whether a part exists in the package
    pub fn has_part(&mut self, path: &str) -> bool {
        self.resolve_name(path).is_some()
    }

    /// Number of parts in the package
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the package holds no parts at all
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Resolve a part path to the archive entry name
    ///
    /// Part references in XML may carry a leading `/` and, per OPC, may be
    /// percent-encoded while the ZIP entry name is stored as UTF-8.
    fn resolve_name(&mut self, path: &str) -> Option<String> {
        let trimmed = path.trim_start_matches('/');
        if self.archive.by_name(trimmed).is_ok() {
            return Some(trimmed.to_string());
        }

        if trimmed.contains('%') {
            if let Ok(decoded) = decode(trimmed) {
                if self.archive.by_name(&decoded).is_ok() {
                    return Some(decoded.into_owned());
                }
            }
        }

        None
    }
}

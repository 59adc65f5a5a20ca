//! Error types for Bambu 3MF package operations
//!
//! Fatal errors abort the whole parse or export call; recoverable
//! conditions are reported as [`Warning`] values on the parse report so a
//! partially valid package still yields usable data.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML parsing and structure errors
//! - **E3xxx**: Value parse errors

use std::io;
use thiserror::Error;

/// Result type for Bambu 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a parse or export call
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid ZIP/OPC container
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Not a 3MF file at all
    /// - Corrupted or truncated archive
    #[error("[E1002] cannot open package: {source}")]
    PackageOpen {
        /// The underlying ZIP error
        source: zip::result::ZipError,
    },

    /// ZIP archive error while writing a package
    ///
    /// **Error Code**: E1004
    #[error("[E1004] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// The assembly root part is missing or not well-formed XML
    ///
    /// **Error Code**: E2003
    ///
    /// The assembly root (`3D/3dmodel.model`) is the only part this crate
    /// requires; every other part of the package is optional.
    #[error("[E2003] malformed assembly part '{part}': {reason}")]
    MalformedAssembly {
        /// Path of the assembly part within the package
        part: String,
        /// What went wrong
        reason: String,
    },

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Create a MalformedAssembly error for the given part
    pub fn malformed_assembly(part: &str, reason: impl std::fmt::Display) -> Self {
        Error::MalformedAssembly {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Non-fatal conditions absorbed during a parse
///
/// Bambu packages vary across Studio versions in which optional parts they
/// include; these conditions therefore leave the parse result usable and
/// are only reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An optional part was absent from the package
    MissingPart {
        /// Path of the absent part
        path: String,
    },
    /// An optional part was present but could not be parsed; defaults were
    /// used in its place
    MalformedPart {
        /// Path of the unparsable part
        path: String,
        /// What went wrong
        reason: String,
    },
    /// A component references geometry that could not be resolved; the
    /// component is retained for round-trip but contributes no mesh
    UnresolvedComponent {
        /// Sub-model path the component points at
        path: String,
        /// Object id within that sub-model
        objectid: usize,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingPart { path } => write!(f, "missing optional part '{}'", path),
            Warning::MalformedPart { path, reason } => {
                write!(f, "unparsable part '{}': {}", path, reason)
            }
            Warning::UnresolvedComponent { path, objectid } => {
                write!(f, "unresolved component '{}' object {}", path, objectid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let malformed = Error::malformed_assembly("3D/3dmodel.model", "truncated");
        assert!(malformed.to_string().contains("[E2003]"));
        assert!(malformed.to_string().contains("3D/3dmodel.model"));

        let parse_err = Error::ParseError("test".to_string());
        assert!(parse_err.to_string().contains("[E3002]"));
    }

    #[test]
    fn test_parse_int_error_conversion() {
        let parse_err: std::num::ParseIntError = "not_a_number".parse::<i32>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.to_string().contains("Failed to parse integer"));
        assert!(err.to_string().contains("[E3002]"));
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::UnresolvedComponent {
            path: "/3D/Objects/object_9.model".to_string(),
            objectid: 4,
        };
        assert!(w.to_string().contains("object_9.model"));
        assert!(w.to_string().contains("object 4"));
    }
}

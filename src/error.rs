//! Error taxonomy for the archive store.
//!
//! Lifecycle operations (`create`, `open`, `close`, `backup`, `restore`,
//! `verify`) return a detailed [`Error`]. Navigation (translate-layer)
//! operations never propagate these — a read failure yields a terminal
//! link or an empty list, and callers detect a latched fault out-of-band
//! via [`crate::file::Storage::get_fault`].

use std::io;

/// The kind of failure observed, independent of any `io::Error` payload.
///
/// Stored as a sticky `u32` inside [`crate::file::Storage`], so variants
/// must round-trip through [`ErrorKind::to_code`] / [`ErrorKind::from_code`]
/// without loss.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("success")]
    Success = 0,
    #[error("another process holds a file lock")]
    LockFailure = 1,
    #[error("flush lock present at startup: prior crash detected")]
    FlushLock = 2,
    #[error("head/body divergence that recovery cannot repair")]
    IntegrityFailure = 3,
    #[error("disk full")]
    DiskFull = 4,
    #[error("failed to open file")]
    FileOpen = 5,
    #[error("failed to close file")]
    FileClose = 6,
    #[error("failed to map file")]
    FileMap = 7,
    #[error("failed to sync file")]
    FileSync = 8,
    #[error("failed to truncate file")]
    FileTruncate = 9,
    #[error("failed to grow mapping")]
    FileGrow = 10,
    #[error("record not found")]
    NotFound = 11,
    #[error("link out of range of the table")]
    InvalidLink = 12,
    #[error("store shutdown in progress")]
    ShutdownInProgress = 13,
}

impl ErrorKind {
    /// Encode to a stable discriminant for storage in an `AtomicU32`.
    pub const fn to_code(self) -> u32 {
        self as u32
    }

    /// Decode a discriminant previously produced by [`ErrorKind::to_code`].
    ///
    /// Any value outside the known range maps to [`ErrorKind::IntegrityFailure`]
    /// rather than panicking — the atomic cell should never hold anything else,
    /// but a corrupted-in-memory read must not be treated as success.
    pub const fn from_code(code: u32) -> ErrorKind {
        match code {
            0 => ErrorKind::Success,
            1 => ErrorKind::LockFailure,
            2 => ErrorKind::FlushLock,
            3 => ErrorKind::IntegrityFailure,
            4 => ErrorKind::DiskFull,
            5 => ErrorKind::FileOpen,
            6 => ErrorKind::FileClose,
            7 => ErrorKind::FileMap,
            8 => ErrorKind::FileSync,
            9 => ErrorKind::FileTruncate,
            10 => ErrorKind::FileGrow,
            11 => ErrorKind::NotFound,
            12 => ErrorKind::InvalidLink,
            13 => ErrorKind::ShutdownInProgress,
            _ => ErrorKind::IntegrityFailure,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ErrorKind::Success)
    }
}

/// A detailed error, carrying the platform `io::Error` when the kind
/// originated from the I/O layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{kind}")]
    Kind {
        kind: ErrorKind,
        #[source]
        source: Option<io::Error>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error::Kind { kind, source: None }
    }

    pub fn from_io(kind: ErrorKind, source: io::Error) -> Self {
        Error::Kind {
            kind,
            source: Some(source),
        }
    }

    /// The `ErrorKind` this error carries, or `IntegrityFailure` for the
    /// config-layer variant (which has no corresponding sticky code).
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Kind { kind, .. } => *kind,
            Error::Config(_) => ErrorKind::IntegrityFailure,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

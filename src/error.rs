use std::{fmt, io, path::PathBuf};

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while decoding a perm container.
///
/// Only [`DecodeError::Truncated`], [`DecodeError::MalformedSection`] and
/// [`DecodeError::Io`] abort a scan. Everything else is isolated to the record or
/// section that raised it and surfaces as a [`Diagnostic`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("read of {wanted} bytes at 0x{offset:X} runs past the end of the buffer ({size} bytes)")]
    Truncated { offset: u64, wanted: u64, size: u64 },

    #[error("seek to {target} is outside the buffer ({size} bytes)")]
    SeekOutOfBounds { target: i64, size: u64 },

    #[error("section at 0x{offset:X} is malformed: {reason}")]
    MalformedSection { offset: u64, reason: String },

    #[error("index range {start}..{end} is outside a stream of {available} indices")]
    IndexRange { start: i64, end: i64, available: usize },

    #[error("index {index} addresses past the {vertex_count} vertices of the mesh")]
    VertexIndexOutOfRange { index: u16, vertex_count: usize },

    #[error("unsupported vertex layout (stride {stride}, {count} records)")]
    UnsupportedVertexLayout { stride: i32, count: i32 },

    #[error("unsupported texture format (size code {size_code}, codec {codec})")]
    UnsupportedTextureFormat { size_code: i32, codec: i32 },

    #[error("companion file not found: {0}")]
    MissingCompanionFile(PathBuf),

    #[error("companion file {path} is too short for {wanted} bytes at offset {offset}")]
    CompanionTruncated {
        path: PathBuf,
        offset: u64,
        wanted: u64,
    },

    #[error("stream {0} has not been defined")]
    UnresolvedStreamReference(i32),

    #[error("stream {0} is defined more than once, keeping the first definition")]
    DuplicateStreamId(i32),

    #[error("{what} has a negative value ({value})")]
    NegativeField { what: &'static str, value: i32 },

    #[error("I/O error on {0}: {1}")]
    File(PathBuf, #[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of a [`DecodeError`], mirroring how the scan reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Truncated,
    MalformedSection,
    IndexRange,
    UnsupportedVertexLayout,
    UnsupportedTextureFormat,
    MissingCompanionFile,
    UnresolvedStreamReference,
    DuplicateStreamId,
    Io,
}

impl DecodeError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            DecodeError::Truncated { .. } | DecodeError::CompanionTruncated { .. } => {
                DiagnosticKind::Truncated
            }
            // A negative count or size leaves the rest of the body unreadable.
            DecodeError::MalformedSection { .. } | DecodeError::NegativeField { .. } => {
                DiagnosticKind::MalformedSection
            }
            DecodeError::IndexRange { .. }
            | DecodeError::VertexIndexOutOfRange { .. }
            | DecodeError::SeekOutOfBounds { .. } => DiagnosticKind::IndexRange,
            DecodeError::UnsupportedVertexLayout { .. } => DiagnosticKind::UnsupportedVertexLayout,
            DecodeError::UnsupportedTextureFormat { .. } => {
                DiagnosticKind::UnsupportedTextureFormat
            }
            DecodeError::MissingCompanionFile(_) => DiagnosticKind::MissingCompanionFile,
            DecodeError::UnresolvedStreamReference(_) => DiagnosticKind::UnresolvedStreamReference,
            DecodeError::DuplicateStreamId(_) => DiagnosticKind::DuplicateStreamId,
            DecodeError::File(..) | DecodeError::Io(_) => DiagnosticKind::Io,
        }
    }

    /// Whether the error has to abort the whole scan.
    ///
    /// A short read on the container itself means every later offset is suspect, so it is
    /// never recovered from. Companion-file and output-file problems only affect one texture.
    /// A negative count is classified with malformed sections but only drops its section.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::Truncated { .. } | DecodeError::MalformedSection { .. } | DecodeError::Io(_)
        )
    }
}

/// A recoverable condition met during a scan. The offending record or section was skipped.
#[derive(Debug)]
pub struct Diagnostic {
    pub section_offset: u64,
    pub section_id: i32,
    /// Position of the mesh-info record inside its section, when the problem was per record.
    pub record: Option<usize>,
    pub error: DecodeError,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        self.error.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "section {} (0x{:X})",
            self.section_id, self.section_offset
        )?;

        if let Some(record) = self.record {
            write!(f, " record {}", record)?;
        }

        write!(f, ": {}", self.error)
    }
}

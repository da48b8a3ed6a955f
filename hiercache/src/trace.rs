use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use regex::Regex;
use crate::io::get_reader;

lazy_static! {
    static ref HEX_WORD: Regex = Regex::new(r"^0[xX][0-9a-fA-F]{8}$").unwrap();
}

/// Kind of memory request
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "R"),
            Operation::Write => write!(f, "W"),
        }
    }
}

/// One row of a trace
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryRequest {
    /// A read, optionally carrying the value it is expected to return in verify mode
    Read { address: u32, expected: Option<u32> },
    Write { address: u32, value: u32 },
}

impl MemoryRequest {
    pub fn read(address: u32) -> Self {
        MemoryRequest::Read {
            address,
            expected: None,
        }
    }

    pub fn read_expecting(address: u32, expected: u32) -> Self {
        MemoryRequest::Read {
            address,
            expected: Some(expected),
        }
    }

    pub fn write(address: u32, value: u32) -> Self {
        MemoryRequest::Write { address, value }
    }

    pub fn address(&self) -> u32 {
        match self {
            MemoryRequest::Read { address, .. } | MemoryRequest::Write { address, .. } => *address,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            MemoryRequest::Read { .. } => Operation::Read,
            MemoryRequest::Write { .. } => Operation::Write,
        }
    }
}

/// Formats the request as a trace row, the inverse of [`parse_requests`] for a single line
impl fmt::Display for MemoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryRequest::Read { address, expected: None } => write!(f, "R,0x{address:08x},"),
            MemoryRequest::Read {
                address,
                expected: Some(expected),
            } => write!(f, "R,0x{address:08x},0x{expected:08x}"),
            MemoryRequest::Write { address, value } => write!(f, "W,0x{address:08x},0x{value:08x}"),
        }
    }
}

/// Why a trace row could not be parsed
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("expected 3 columns, found {0}")]
    FieldCount(usize),
    #[error("invalid request type {0:?}")]
    Operation(String),
    #[error("invalid address {0:?}")]
    Address(String),
    #[error("invalid data {0:?}")]
    Data(String),
    #[error("missing data for write request")]
    MissingData,
    #[error("row is not valid UTF-8")]
    Encoding,
}

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("Access denied: {0:?}")]
    AccessDenied(PathBuf),

    #[error("Not a regular file: {0:?}")]
    NotRegularFile(PathBuf),

    #[error("Error while reading file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is empty: {0:?}")]
    EmptyFile(PathBuf),

    #[error("Failed to parse CSV at line {line}: {reason}")]
    Parse { line: usize, reason: RowError },

    #[error("Failed to parse CSV: the trace contains no requests")]
    NoRequests,
}

/// Loads every request of a trace file, in file order
///
/// The whole trace is validated before anything is returned, so a simulation never starts on a
/// partially valid trace
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<MemoryRequest>, TraceError> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|_| TraceError::AccessDenied(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(TraceError::NotRegularFile(path.to_path_buf()));
    }
    // Mapping a zero length file fails on some platforms, catch it first
    if metadata.len() == 0 {
        return Err(TraceError::EmptyFile(path.to_path_buf()));
    }
    let io_error = |source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let mut content = Vec::with_capacity(metadata.len() as usize);
    get_reader(file).map_err(io_error)?.read_to_end(&mut content).map_err(io_error)?;
    parse_rows(&content)
}

/// Parses trace text, one `OP,ADDRESS,DATA` request per line
///
/// Blank lines are skipped and Windows line endings are accepted. Line numbers in errors are
/// 1-based and count blank lines
///
/// # Examples
///
/// ```
/// use hiercache::trace::{parse_requests, MemoryRequest};
/// let requests = parse_requests("W,0x00000010,0x0000002a\nR,0x00000010,\n").unwrap();
/// assert_eq!(requests, vec![MemoryRequest::write(0x10, 42), MemoryRequest::read(0x10)]);
/// ```
pub fn parse_requests(content: &str) -> Result<Vec<MemoryRequest>, TraceError> {
    parse_rows(content.as_bytes())
}

/// Raw file contents are decoded row by row, so a bad byte is reported against its line
fn parse_rows(content: &[u8]) -> Result<Vec<MemoryRequest>, TraceError> {
    let mut requests = Vec::new();
    for (i, raw) in content.split(|&b| b == b'\n').enumerate() {
        let request = std::str::from_utf8(raw)
            .map_err(|_| RowError::Encoding)
            .and_then(|line| match line.trim() {
                "" => Ok(None),
                _ => parse_row(line).map(Some),
            })
            .map_err(|reason| TraceError::Parse { line: i + 1, reason })?;
        requests.extend(request);
    }
    if requests.is_empty() {
        return Err(TraceError::NoRequests);
    }
    Ok(requests)
}

fn parse_row(line: &str) -> Result<MemoryRequest, RowError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [operation, address, data] = fields[..] else {
        return Err(RowError::FieldCount(fields.len()));
    };
    let operation = match operation {
        "R" => Operation::Read,
        "W" => Operation::Write,
        other => return Err(RowError::Operation(other.to_string())),
    };
    let address = parse_hex_word(address).ok_or_else(|| RowError::Address(address.to_string()))?;
    let data = match data {
        "" => None,
        data => Some(parse_hex_word(data).ok_or_else(|| RowError::Data(data.to_string()))?),
    };
    match (operation, data) {
        (Operation::Read, expected) => Ok(MemoryRequest::Read { address, expected }),
        (Operation::Write, Some(value)) => Ok(MemoryRequest::Write { address, value }),
        (Operation::Write, None) => Err(RowError::MissingData),
    }
}

/// Parses a `0x` prefixed, exactly 8 digit hexadecimal word
fn parse_hex_word(field: &str) -> Option<u32> {
    if !HEX_WORD.is_match(field) {
        return None;
    }
    u32::from_str_radix(&field[2..], 16).ok()
}

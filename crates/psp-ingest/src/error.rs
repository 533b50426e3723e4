use crate::gnode::ProcessError;
use crate::types::DType;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{len} rows starting at {start} out of range for column of {size} rows")]
    IndexOutOfRange {
        start: usize,
        len: usize,
        size: usize,
    },

    #[error("{what} size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("dictionary code {code} at row {row} is outside the {interned} interned strings")]
    InternConsistencyViolation {
        row: usize,
        code: i32,
        interned: usize,
    },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column `{column}` has dtype {expected}, got {actual}")]
    DTypeMismatch {
        column: String,
        expected: DType,
        actual: DType,
    },

    #[error("dtype {0} cannot back a column")]
    UnsupportedDType(DType),

    #[error("dtype {0} has no fixed element width")]
    NotFixedWidth(DType),

    #[error("unknown dtype tag {0}")]
    UnknownDType(u8),

    #[error("invalid string offsets: {0}")]
    InvalidOffsets(String),

    #[error("string {index} in dictionary blob is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    #[error("day count {0} is outside the supported calendar range")]
    DateOutOfRange(i32),

    #[error("unsupported arrow type: {0}")]
    UnsupportedArrowType(String),

    #[error(transparent)]
    Processing(#[from] ProcessError),
}

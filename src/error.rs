use thiserror::Error;

/// Errors raised while reading a source extract or naming a table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("line {line}: expected {expected} columns, got {found}")]
    ColumnCount {
        line: u64,
        expected: String,
        found: usize,
    },
    #[error("line {line}, column {column}: invalid integer {value:?}")]
    InvalidInt {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("line {line}, column {column}: invalid number {value:?}")]
    InvalidFloat {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("invalid table name {0:?}")]
    InvalidIdentifier(String),
    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read extract: {0}")]
    Io(#[from] std::io::Error),
}

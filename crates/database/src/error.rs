use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("missing column {column}")]
    MissingColumn { column: String },
    #[error("column {column} has unexpected type")]
    ColumnType { column: String },
    #[error("column {column} holds unknown label {value:?}")]
    Label { column: String, value: String },
}

use std::path::PathBuf;
use thiserror::Error;

/// Failures a cleaning job must abort on. Partial cleaned output would
/// silently corrupt the database load, so none of these are recoverable
/// at cleaning time.
#[derive(Debug, Error)]
pub enum CleanError {
    /// A cleaner's expected raw input file(s) are absent. The load step
    /// assumes every declared fact table has a matching cleaned file.
    #[error("no raw files match '{pattern}' under {dir}")]
    MissingInput { pattern: String, dir: PathBuf },

    /// Non-numeric data that is not the known "-" sentinel. Masking it
    /// as zero would skew every downstream aggregate.
    #[error("malformed value '{value}' in column '{column}' of {file}")]
    MalformedValue {
        value: String,
        column: String,
        file: String,
    },

    /// A filename that does not encode its control zone the way the
    /// download step names files.
    #[error("cannot parse control zone from filename '{file}'")]
    UnrecognizedFilename { file: String },

    /// A zone label with no entry in the configured zone table.
    #[error("unknown control zone '{zone}' in {file}")]
    UnknownZone { zone: String, file: String },
}

use camino::Utf8PathBuf;
use miette::Diagnostic;
use qk_consolidate::{ConsolidateError, ConsolidateStage, Error as ConsolidateFailure};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(config::not_found),
        help("Check the --config path, or omit it to use config.toml next to the executable")
    )]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check the [consolidate] table of your config file for syntax errors")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO operation failed: {path}")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Consolidation failed during the {stage} stage")]
    #[diagnostic(code(consolidate::failed))]
    ConsolidateFailed {
        stage: ConsolidateStage,
        #[source]
        source: ConsolidateFailure,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    pub fn config_not_found(path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: toml::de::Error) -> Self {
        Self::ConfigParseError { path, source }
    }

    pub fn io_error(path: Utf8PathBuf, source: std::io::Error) -> Self {
        Self::IoError { path, source }
    }
}

impl From<ConsolidateError> for CliError {
    fn from(err: ConsolidateError) -> Self {
        let help = consolidate_help(&err.error);
        CliError::ConsolidateFailed {
            stage: err.stage,
            source: err.error,
            help,
        }
    }
}

fn consolidate_help(err: &ConsolidateFailure) -> Option<String> {
    let help = match err {
        ConsolidateFailure::ArchiveRead { archive, .. } => format!(
            "'{archive}' is not a readable pak archive. Remove or replace it and try again"
        ),
        ConsolidateFailure::ArchiveWrite { .. } => {
            "Pak entry names are limited to 55 bytes and archives to 2 GiB".to_string()
        }
        ConsolidateFailure::IoRead { .. } | ConsolidateFailure::IoWrite { .. } => {
            "Check file permissions and available disk space".to_string()
        }
        ConsolidateFailure::Config(_) => {
            "Pass an existing gamedir and check the [consolidate] options".to_string()
        }
        ConsolidateFailure::Busy(lock) => format!(
            "Wait for the other run to finish. If none is running, delete '{lock}'"
        ),
        ConsolidateFailure::UnsafePath(_) | ConsolidateFailure::Cancelled => return None,
    };
    Some(help)
}

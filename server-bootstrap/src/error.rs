use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Required command(s) not found in PATH: {}", .0.join(", "))]
    MissingCommand(Vec<String>),
    #[error("Port(s) already in use: {}", join_ports(.0))]
    PortInUse(Vec<u16>),
    #[error("Removal of existing install {} was declined", .0.display())]
    CleanupDeclined(PathBuf),
    #[error("No release archive matching `{pattern}` in {}", .dir.display())]
    ArchiveNotFound { pattern: String, dir: PathBuf },
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("docker compose failed: {0}")]
    ComposeLaunch(String),
    #[error("Certificate generation failed after {attempts} attempt(s)")]
    CertificatesExhausted { attempts: u32 },
    #[error("Patching {} failed: {reason}", .file.display())]
    ConfigPatch { file: PathBuf, reason: String },
    #[error("Registering client certificate failed: {0}")]
    Registration(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidSiteValue { field: String, reason: String },
    #[error("Bad bootstrap config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<SetupError> for std::io::Error {
    fn from(e: SetupError) -> Self {
        std::io::Error::other(e)
    }
}

/// Recovers the typed error from an `io::Error` produced by a stage.
pub fn setup_error(e: &std::io::Error) -> Option<&SetupError> {
    e.get_ref().and_then(|inner| inner.downcast_ref::<SetupError>())
}

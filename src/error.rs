use std::path::PathBuf;

pub type DisplayResult<T> = Result<T, DisplayError>;

/// Failures while acquiring or configuring a display backend.
/// Drawing never fails; out-of-range coordinates are clipped.
#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("display query failed: {0}")]
    Query(String),

    #[error("cannot map display memory: {0}")]
    Map(String),

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("window error: {0}")]
    Window(String),

    #[error("signal handler error: {0}")]
    Signal(#[from] nix::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DisplayError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn window(msg: impl Into<String>) -> Self {
        Self::Window(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// 打包文件校验失败（发布包损坏或被篡改）
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("Packaged file {path} is missing")]
    Missing { path: String },

    #[error("Packaged file {path} was modified. Got {actual}, expected {expected}")]
    Mismatch {
        path: String,
        actual: String,
        expected: String,
    },

    #[error("Could not read packaged file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl IntegrityError {
    /// 出问题的相对路径
    pub fn path(&self) -> &str {
        match self {
            IntegrityError::Missing { path }
            | IntegrityError::Mismatch { path, .. }
            | IntegrityError::Unreadable { path, .. } => path,
        }
    }
}

/// 目标目录看起来不是游戏安装目录
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Parent folder is missing game file {0}, cannot be a TR2 installation")]
    MissingFile(String),

    #[error("Parent folder does not contain a music folder, cannot be a TR2 installation")]
    MissingMusicDirectory,
}

/// 复制过程中的失败，记录具体失败的路径
#[derive(Debug, Error)]
#[error("Failed to copy {path}: {source}")]
pub struct CopyError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum SwapperError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error("Settings file error: {0}")]
    Settings(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Interrupted by the user")]
    Interrupted,
}

impl SwapperError {
    /// 是否属于安装校验失败（需要重新安装发布包）
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, SwapperError::Integrity(_) | SwapperError::Location(_))
    }
}

impl From<dialoguer::Error> for SwapperError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            // 终端 raw 模式下 Ctrl+C 以 IO 错误的形式出现
            dialoguer::Error::IO(e) => SwapperError::from(e),
        }
    }
}

impl From<std::io::Error> for SwapperError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::Interrupted {
            return SwapperError::Interrupted;
        }
        log::debug!("IO error: {}", err);
        SwapperError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, SwapperError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn ctrl_c_inside_a_prompt_is_an_interrupt() {
        let err = dialoguer::Error::IO(io::Error::new(io::ErrorKind::Interrupted, "read interrupted"));
        assert!(matches!(SwapperError::from(err), SwapperError::Interrupted));
    }

    #[test]
    fn other_prompt_failures_stay_io_errors() {
        let err = dialoguer::Error::IO(io::Error::new(io::ErrorKind::NotConnected, "not a terminal"));
        assert!(matches!(SwapperError::from(err), SwapperError::Io(_)));
    }
}

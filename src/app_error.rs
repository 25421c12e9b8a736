use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    RuntimeFailure = 1,
    Usage = 2,
    Internal = 3,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Runtime(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self::Usage(message.into())
    }

    pub fn runtime<T: Into<String>>(message: T) -> Self {
        Self::Runtime(message.into())
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::Usage,
            Self::Runtime(_) => ExitCode::RuntimeFailure,
            Self::Internal(_) => ExitCode::Internal,
        }
    }

    pub fn code(&self) -> i32 {
        self.exit_code() as i32
    }
}

pub type AasResult<T> = Result<T, AasError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AasErrorCategory {
    ConfigError,
    SchemaError,
    GridConsistencyError,
    TimeRangeError,
    RegridError,
    IoError,
    InternalError,
}

impl AasErrorCategory {
    pub const fn exit_mapping(self) -> ExitMapping {
        match self {
            Self::ConfigError => ExitMapping {
                exit_code: 2,
                category: "ConfigError",
                stage: "configuration",
            },
            Self::SchemaError => ExitMapping {
                exit_code: 3,
                category: "SchemaError",
                stage: "emissions table",
            },
            Self::GridConsistencyError => ExitMapping {
                exit_code: 4,
                category: "GridConsistencyError",
                stage: "source grid",
            },
            Self::TimeRangeError => ExitMapping {
                exit_code: 5,
                category: "TimeRangeError",
                stage: "temporal alignment",
            },
            Self::RegridError => ExitMapping {
                exit_code: 6,
                category: "RegridError",
                stage: "regridding",
            },
            Self::IoError => ExitMapping {
                exit_code: 7,
                category: "IOError",
                stage: "file i/o",
            },
            Self::InternalError => ExitMapping {
                exit_code: 8,
                category: "InternalError",
                stage: "internal",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_mapping().exit_code
    }

    pub const fn label(self) -> &'static str {
        self.exit_mapping().category
    }

    pub const fn stage(self) -> &'static str {
        self.exit_mapping().stage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitMapping {
    pub exit_code: i32,
    pub category: &'static str,
    pub stage: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} [{placeholder}] {message}", .category.label())]
pub struct AasError {
    category: AasErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl AasError {
    pub fn new(
        category: AasErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn config(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::ConfigError, placeholder, message)
    }

    pub fn schema(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::SchemaError, placeholder, message)
    }

    pub fn grid_consistency(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::GridConsistencyError, placeholder, message)
    }

    pub fn time_range(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::TimeRangeError, placeholder, message)
    }

    pub fn regrid(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::RegridError, placeholder, message)
    }

    pub fn io(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::IoError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AasErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> AasErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!(
            "ERROR: [{}] {} failed: {}",
            self.placeholder,
            self.category.stage(),
            self.message
        )
    }

    pub fn fatal_exit_line(&self) -> String {
        format!(
            "FATAL EXIT CODE: {} ({})",
            self.exit_code(),
            self.category.label()
        )
    }
}

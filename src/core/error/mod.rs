use crate::core::types::ErrorCategory;
use std::collections::BTreeMap;

/// Structured failure returned by every core operation.
///
/// All categories are terminal for a compose run: the caller reports the error and nothing is
/// written. `code` is a stable identifier (for example `DOC-PARSE-001`) that tests and users can
/// match on without depending on message wording.
#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub context: BTreeMap<String, String>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        AppError {
            category,
            code: default_code(category).to_string(),
            message: message.into(),
            context: BTreeMap::new(),
            source: None,
        }
    }

    pub fn with_source<T: Into<String>>(
        category: ErrorCategory,
        message: T,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        let mut error = AppError::new(category, message);
        error.source = Some(source.into());
        error
    }

    pub fn with_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }

    pub fn parse<T: Into<String>>(line: usize, message: T) -> Self {
        AppError::new(ErrorCategory::ParseError, message).with_context("line", line.to_string())
    }

    pub fn path_not_found(path: &str) -> Self {
        AppError::new(
            ErrorCategory::PathNotFound,
            format!("path '{}' not found in document", path),
        )
        .with_context("path", path)
    }

    pub fn key_not_found(key: &str) -> Self {
        AppError::new(ErrorCategory::KeyNotFound, format!("key '{}' not found", key))
            .with_context("key", key)
    }

    pub fn precondition<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::PreconditionFailed, message)
    }

    /// Line number recorded for parse errors.
    pub fn line(&self) -> Option<usize> {
        self.context.get("line").and_then(|line| line.parse().ok())
    }
}

fn default_code(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::ParseError => "DOC-PARSE-001",
        ErrorCategory::PathNotFound => "DOC-PATH-001",
        ErrorCategory::KeyNotFound => "DOC-KEY-001",
        ErrorCategory::PreconditionFailed => "COMPOSE-PRECONDITION-001",
        ErrorCategory::IoError => "IO_ERROR",
        ErrorCategory::DuplicateOutput => "COMPOSE-OUTPUT-001",
        ErrorCategory::ValidationError => "CONFIG-VALIDATION-001",
        ErrorCategory::InternalError => "INTERNAL_ERROR",
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (Context: {:?})", self.context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError {
            category: ErrorCategory::IoError,
            code: "IO_ERROR".to_string(),
            message: e.to_string(),
            context: BTreeMap::new(),
            source: Some(anyhow::anyhow!(e)),
        }
    }
}

pub trait ErrorReporter {
    fn report_error(&self, error: &AppError);
}

pub struct DefaultErrorReporter;

impl DefaultErrorReporter {
    pub fn new() -> Self {
        DefaultErrorReporter
    }
}

impl Default for DefaultErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for DefaultErrorReporter {
    fn report_error(&self, error: &AppError) {
        eprintln!("[ERROR] {}: {}", error.code, error.message);
        for (key, value) in &error.context {
            eprintln!("  {}: {}", key, value);
        }
        if let Some(ref source) = error.source {
            eprintln!("  Caused by: {}", source);
        }
    }
}

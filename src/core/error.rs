//! Error handling for the content engine
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code ([`CmsError`], [`RegistryError`])
//! 2. **User-friendly messages** with actionable suggestions for CLI users ([`ErrorContext`])
//!
//! # Error Categories
//!
//! - **Registration**: [`RegistryError`] - fatal, raised while the data source
//!   registry is populated. These indicate a deployment bug, never a data problem.
//! - **Lookup**: [`CmsError::ContentNotFound`], [`CmsError::ContentTypeNotFound`], ...
//! - **Persistence**: [`CmsError::Persistence`] - propagated unchanged from the store.
//! - **Documents**: [`CmsError::InvalidImport`], [`CmsError::InvalidBackup`]
//!
//! There is no cache-consistency variant: a missing cache-key fragment is
//! repaired in place and logged, never surfaced as an error. Form validation
//! problems are returned as [`ValidationError`](crate::datasource::ValidationError)
//! lists rather than raised.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cms_engine::core::{CmsError, user_friendly_error};
//!
//! let error = CmsError::ContentTypeNotFound { id: 42 };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Errors raised while populating the data source registry.
///
/// All variants are fatal: the registry refuses the contribution and the caller
/// is expected to abort start-up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A plugin declared a data source but provides no implementation for it
    #[error("Plugin '{component}' declares data source '{short_name}' but provides no implementation")]
    MissingImplementation {
        /// Component that declared the data source
        component: String,
        /// Declared short name
        short_name: String,
    },

    /// The implementation does not honour the data source contract
    #[error("Data source '{short_name}' is not a valid implementation: {reason}")]
    InvalidImplementation {
        /// Short name under which registration was attempted
        short_name: String,
        /// What part of the contract was violated
        reason: String,
    },

    /// Another data source already owns this short name
    #[error("A data source with short name '{short_name}' is already registered")]
    DuplicateShortName {
        /// The colliding short name
        short_name: String,
    },
}

/// The main error type for content engine operations
#[derive(Error, Debug)]
pub enum CmsError {
    /// Registry population failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Content item lookup failed
    #[error("Content item {id} not found")]
    ContentNotFound {
        /// Requested content id
        id: i64,
    },

    /// Content type lookup failed
    #[error("Content type {id} not found")]
    ContentTypeNotFound {
        /// Requested type id
        id: i64,
    },

    /// Generic record lookup failed
    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound {
        /// Table name
        table: String,
        /// Requested record id
        id: i64,
    },

    /// The persistence layer reported a failure
    #[error("Persistence operation '{operation}' failed on '{table}': {reason}")]
    Persistence {
        /// Operation name (create, update, delete, ...)
        operation: String,
        /// Table the operation targeted
        table: String,
        /// Underlying reason
        reason: String,
    },

    /// The content type is still referenced by content items
    #[error("Content type {id} is still used by {count} content item(s)")]
    TypeInUse {
        /// Type id
        id: i64,
        /// Number of content items still referencing the type
        count: usize,
    },

    /// A data source short name is not registered
    #[error("Unknown data source '{short_name}'")]
    UnknownDataSource {
        /// Requested short name
        short_name: String,
    },

    /// An export document could not be imported
    #[error("Invalid import document: {reason}")]
    InvalidImport {
        /// Why the document was rejected
        reason: String,
    },

    /// A backup document could not be restored
    #[error("Invalid backup document: {reason}")]
    InvalidBackup {
        /// Why the document was rejected
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Template rendering failed
    #[error("Template rendering failed for '{template}': {reason}")]
    TemplateFailed {
        /// Which template failed (body, title, ...)
        template: String,
        /// Rendering error message
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialisation error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML (de)serialisation error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialisation error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Catch-all
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl CmsError {
    /// Convenience constructor for persistence failures.
    pub fn persistence(
        operation: impl Into<String>,
        table: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Persistence {
            operation: operation.into(),
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Produce a display-only copy of the error.
    ///
    /// Wrapped foreign errors (IO, serde) are not `Clone`; they are flattened into
    /// [`CmsError::Other`] with the same message.
    fn to_owned_error(&self) -> Self {
        match self {
            Self::Registry(e) => Self::Registry(e.clone()),
            Self::ContentNotFound {
                id,
            } => Self::ContentNotFound {
                id: *id,
            },
            Self::ContentTypeNotFound {
                id,
            } => Self::ContentTypeNotFound {
                id: *id,
            },
            Self::RecordNotFound {
                table,
                id,
            } => Self::RecordNotFound {
                table: table.clone(),
                id: *id,
            },
            Self::Persistence {
                operation,
                table,
                reason,
            } => Self::persistence(operation.clone(), table.clone(), reason.clone()),
            Self::TypeInUse {
                id,
                count,
            } => Self::TypeInUse {
                id: *id,
                count: *count,
            },
            Self::UnknownDataSource {
                short_name,
            } => Self::UnknownDataSource {
                short_name: short_name.clone(),
            },
            Self::InvalidImport {
                reason,
            } => Self::InvalidImport {
                reason: reason.clone(),
            },
            Self::InvalidBackup {
                reason,
            } => Self::InvalidBackup {
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::TemplateFailed {
                template,
                reason,
            } => Self::TemplateFailed {
                template: template.clone(),
                reason: reason.clone(),
            },
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly messages and suggestions
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CmsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CmsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognises [`CmsError`] and [`RegistryError`] anywhere in the chain, then IO and
/// YAML errors, and falls back to a generic message carrying the full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(cms_error) = error.downcast_ref::<CmsError>() {
        return create_error_context(cms_error.to_owned_error());
    }

    if let Some(registry_error) = error.downcast_ref::<RegistryError>() {
        return create_error_context(CmsError::Registry(registry_error.clone()));
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ErrorContext::new(CmsError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Check that the file exists and the path is correct")
            .with_details("This error occurs when a store snapshot or import file cannot be found");
        }
    }

    if error.downcast_ref::<serde_yaml::Error>().is_some() {
        return ErrorContext::new(CmsError::InvalidImport {
            reason: error.to_string(),
        })
        .with_suggestion("Check the YAML syntax of the export document")
        .with_details("Export documents are produced by 'cms export' and must keep their structure");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(CmsError::Other {
        message,
    })
}

/// Map each [`CmsError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: CmsError) -> ErrorContext {
    let (suggestion, details): (Option<&str>, Option<&str>) = match &error {
        CmsError::Registry(RegistryError::DuplicateShortName { .. }) => (
            Some("Rename one of the data sources; short names must be unique across all plugins"),
            Some("The first registration is kept and start-up is aborted"),
        ),
        CmsError::Registry(RegistryError::MissingImplementation { .. }) => (
            Some("Make sure the plugin ships the data source it declares, or remove the declaration"),
            None,
        ),
        CmsError::Registry(RegistryError::InvalidImplementation { .. }) => (
            Some("Short names must be lowercase ASCII letters, digits or underscores and match the implementation"),
            None,
        ),
        CmsError::ContentNotFound { .. } => {
            (Some("List existing content with 'cms content list'"), None)
        }
        CmsError::ContentTypeNotFound { .. } => {
            (Some("List existing content types with 'cms types'"), None)
        }
        CmsError::TypeInUse { .. } => (
            Some("Delete the content items using this type first"),
            Some("Deleting a type in use would orphan rendered content"),
        ),
        CmsError::UnknownDataSource { .. } => (
            Some("Check the data source list of the content type against the registered data sources"),
            None,
        ),
        CmsError::InvalidImport { .. } => (
            Some("Re-export the content type with 'cms export' and edit only field values"),
            None,
        ),
        CmsError::InvalidBackup { .. } => {
            (None, Some("Backup documents must contain both the type and the content sections"))
        }
        CmsError::TemplateFailed { .. } => (
            Some("Use 'cms variables' to list the variables available to the template"),
            Some("Template errors usually come from undefined variables or unclosed {{ }} delimiters"),
        ),
        CmsError::ConfigError { .. } | CmsError::TomlError(_) => {
            (Some("Check ~/.cms/config.toml or the file named by CMS_CONFIG_PATH"), None)
        }
        _ => (None, None),
    };

    let mut context = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        context = context.with_suggestion(suggestion);
    }
    if let Some(details) = details {
        context = context.with_details(details);
    }
    context
}

/// Errors that can occur within the notification subsystem.
///
/// # Examples
///
/// ```rust
/// use swarmon_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp_host".to_string());
/// assert!(err.to_string().contains("smtp_host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The channel type is not registered in the plugin registry.
    #[error("Notify: unknown channel type '{0}'")]
    UnknownChannelType(String),

    /// An HTTP request to an external notification endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// SMTP transport or message construction error when sending email.
    #[error("Notify: SMTP error: {0}")]
    Smtp(String),

    /// The external endpoint answered with a non-success status.
    #[error("Notify: API error from {service}: status={status}, body={body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

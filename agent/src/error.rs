pub type Result<T> = std::result::Result<T, AgentError>;

/// Struct to represent IO errors.
#[derive(Debug)]
pub struct IoErrorStruct {
    /// The type of IO error.
    error_type: String,

    /// The error message.
    msg: String,
}

/// Struct to represent validation errors.
#[derive(Debug)]
pub struct ValidationErrorStruct {
    /// The error message.
    msg: String,
}

/// Struct to represent DNS errors.
#[derive(Debug)]
pub struct DNSErrorStruct {
    /// The error message.
    msg: String,
}

/// Struct to represent authenticator errors.
#[derive(Debug)]
pub struct AuthErrorStruct {
    /// The error message.
    msg: String,
}

/// Enum to represent different types of agent errors.
#[derive(Debug)]
pub enum AgentError {
    IoError(IoErrorStruct),
    ValidationError(ValidationErrorStruct),
    DNSError(DNSErrorStruct),
    AuthError(AuthErrorStruct),
}

impl AgentError {
    /// Create a new validation error.
    ///
    /// # Arguments
    /// * `msg` - The error message.
    ///
    /// # Returns
    /// An `AgentError` instance representing a validation error.
    pub fn validation_error(msg: &str) -> Self {
        AgentError::ValidationError(ValidationErrorStruct {
            msg: msg.to_string(),
        })
    }

    /// Create a new authenticator error.
    ///
    /// Raised when the keyed-hash provider cannot be initialized. This is a
    /// fatal local condition: the agent cannot emit authenticated queries
    /// without a working signer.
    ///
    /// # Arguments
    /// * `msg` - The error message.
    ///
    /// # Returns
    /// An `AgentError` instance representing an authenticator error.
    pub fn auth_error(msg: &str) -> Self {
        AgentError::AuthError(AuthErrorStruct {
            msg: msg.to_string(),
        })
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::IoError(io_err) => {
                write!(f, "IO {} Error: {}", io_err.error_type, io_err.msg)
            }
            AgentError::ValidationError(validation_err) => {
                write!(f, "Validation Error: {}", validation_err.msg)
            }
            AgentError::DNSError(dns_err) => {
                write!(f, "DNS Error: {}", dns_err.msg)
            }
            AgentError::AuthError(auth_err) => {
                write!(f, "Auth Error: {}", auth_err.msg)
            }
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(error: std::io::Error) -> Self {
        AgentError::IoError(IoErrorStruct {
            error_type: error.kind().to_string(),
            msg: error.to_string(),
        })
    }
}

impl From<hickory_resolver::ResolveError> for AgentError {
    fn from(error: hickory_resolver::ResolveError) -> Self {
        AgentError::DNSError(DNSErrorStruct {
            msg: error.to_string(),
        })
    }
}

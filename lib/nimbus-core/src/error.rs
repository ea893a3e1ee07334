use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {source}")]
    Credential {
        #[source]
        source: Box<ClientError>,
    },

    #[error("authentication response not received in {0:?}")]
    Timeout(Duration),

    #[error("cannot create service URLs: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("cannot use API version {version:?} for service type {service_type}: {source}")]
    ServiceVersion {
        service_type: String,
        version: String,
        #[source]
        source: VersionError,
    },

    #[error("cannot get endpoint URL without being authenticated")]
    Unauthenticated,

    #[error("unauthorised URL {url}: {body}")]
    Unauthorized { url: String, body: String },

    #[error("no endpoints known for service type: {0}")]
    UnknownServiceType(String),

    #[error("request ({url}) returned unexpected status: {status}; error info: {body}")]
    Http { status: u16, url: String, body: String },

    #[error("cannot send request to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("cannot discover API versions for {url}: {source}")]
    Discovery {
        url: String,
        #[source]
        source: Box<ClientError>,
    },

    #[error("auth options fetching failed: {0}")]
    AuthOptions(#[source] Box<ClientError>),

    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid client configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Wrap an authenticator failure
    pub fn credential(source: ClientError) -> Self {
        ClientError::Credential {
            source: Box::new(source),
        }
    }

    /// Whether a downstream service rejected the token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

/// The configured region cannot provide the required services
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No catalog region matches the configured region
    InvalidRegion {
        region: String,
        missing: Vec<String>,
        suggested: Vec<String>,
    },
    /// Some region matches but required service types are absent
    MissingServices {
        region: String,
        required: Vec<String>,
        missing: Vec<String>,
        suggested: Vec<String>,
    },
}

impl CatalogError {
    pub fn missing(&self) -> &[String] {
        match self {
            CatalogError::InvalidRegion { missing, .. } => missing,
            CatalogError::MissingServices { missing, .. } => missing,
        }
    }

    pub fn suggested(&self) -> &[String] {
        match self {
            CatalogError::InvalidRegion { suggested, .. } => suggested,
            CatalogError::MissingServices { suggested, .. } => suggested,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::InvalidRegion { region, .. } => {
                write!(f, "invalid region {:?}", region)?;
            }
            CatalogError::MissingServices {
                region,
                required,
                missing,
                ..
            } => {
                write!(
                    f,
                    "the configured region {:?} does not allow access to all required services, namely: {}\n\
                     access to these services is missing: {}",
                    region,
                    required.join(", "),
                    missing.join(", ")
                )?;
            }
        }
        let suggested = self.suggested();
        if !suggested.is_empty() {
            write!(
                f,
                "\none of these regions may be suitable instead: {}",
                suggested.join(", ")
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CatalogError {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid API version {0:?}")]
    Invalid(String),

    #[error(
        "no API version matching {requested} for {url}; available versions: {}",
        .available.join(", ")
    )]
    NotAvailable {
        requested: String,
        url: String,
        available: Vec<String>,
    },
}

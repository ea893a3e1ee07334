//! Authentication results and identity options

use crate::AuthMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Service type to base endpoint URL
pub type ServiceUrls = HashMap<String, String>;

/// Region name to the service URLs published in that region
pub type RegionServiceUrls = HashMap<String, ServiceUrls>;

/// Output of one successful authentication cycle
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthDetails {
    pub token: String,
    pub tenant_id: String,
    pub user_id: String,
    pub region_service_urls: RegionServiceUrls,
}

impl fmt::Debug for AuthDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthDetails")
            .field("token", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("region_service_urls", &self.region_service_urls)
            .finish()
    }
}

/// An identity API version advertised at the identity service root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOption {
    pub mode: AuthMode,
    pub endpoint: String,
}

pub type AuthOptions = Vec<AuthOption>;

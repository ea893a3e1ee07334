use anyhow::{bail, Context, Result};
use nimbus_api::{AuthMode, Credentials};
use nimbus_client::ClientConfig;
use serde::Deserialize;
use std::path::Path;

/// Contents of the YAML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub credentials: Credentials,
    pub auth_mode: AuthMode,
    pub client: ClientConfig,
}

/// Values given on the command line or through `NIMBUS_*` variables
#[derive(Debug, Default)]
pub struct Overrides {
    pub auth_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub region: Option<String>,
    pub tenant_name: Option<String>,
    pub domain: Option<String>,
    pub auth_mode: Option<AuthMode>,
}

impl Settings {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("invalid configuration file")
    }

    /// Read `path` when given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                Self::from_yaml(&contents).with_context(|| format!("in {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let credentials = &mut self.credentials;
        let fields = [
            (&mut credentials.url, overrides.auth_url),
            (&mut credentials.user, overrides.user),
            (&mut credentials.secrets, overrides.password),
            (&mut credentials.region, overrides.region),
            (&mut credentials.tenant_name, overrides.tenant_name),
            (&mut credentials.domain, overrides.domain),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(mode) = overrides.auth_mode {
            self.auth_mode = mode;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("auth URL", &self.credentials.url),
            ("user", &self.credentials.user),
            ("password", &self.credentials.secrets),
            ("region", &self.credentials.region),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            bail!("missing required settings: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
credentials:
  url: https://identity.example.com:5000/v3
  user: joe
  secrets: from-file
  region: az-1.region-a
auth_mode: userpass-v3
client:
  auth_timeout_secs: 10
  required_service_types: [compute]
"#;

    #[test]
    fn test_parse_config_file() {
        let settings = Settings::from_yaml(CONFIG).unwrap();
        assert_eq!(settings.auth_mode, AuthMode::UserPassV3);
        assert_eq!(settings.credentials.region, "az-1.region-a");
        assert_eq!(settings.client.auth_timeout_secs, 10);
        assert!(settings.client.version_discovery);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut settings = Settings::from_yaml(CONFIG).unwrap();
        settings.apply(Overrides {
            password: Some("from-env".to_string()),
            auth_mode: Some(AuthMode::UserPass),
            ..Default::default()
        });
        assert_eq!(settings.credentials.secrets, "from-env");
        assert_eq!(settings.credentials.user, "joe");
        assert_eq!(settings.auth_mode, AuthMode::UserPass);
    }

    #[test]
    fn test_validate_reports_missing_settings() {
        let err = Settings::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required settings: auth URL, user, password, region"
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Settings::load(Some(Path::new("/nonexistent/nimbus.yaml"))).is_err());
        assert!(Settings::load(None).is_ok());
    }
}

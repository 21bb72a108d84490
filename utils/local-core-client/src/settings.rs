use core_subscription::{app_scopes_or_default, CoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

fn default_instance_name() -> String {
    String::from("local")
}

/// Settings for a [`crate::LocalCoreClient`], usually read from a JSON file.
///
/// ```
/// use local_core_client::ClientSettings;
///
/// let settings = ClientSettings::from_json(r#"{ "default_app_scopes": ["Pricing"] }"#).unwrap();
/// assert_eq!(settings.instance_name, "local");
/// assert_eq!(settings.app_scopes(), vec!["Pricing"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    /// Name used as the client's log span.
    pub instance_name: String,
    /// Scopes given to new subscriptions. Empty means the legacy scope.
    pub default_app_scopes: Vec<String>,
    /// Log every subscription query at info level when it starts.
    pub debug_requests: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            default_app_scopes: Vec::new(),
            debug_requests: false,
        }
    }
}

impl ClientSettings {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Self = serde_json::from_str(json).map_err(|error| {
            CoreError::InvalidArgument(format!("Unable to parse client settings: {error}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        debug!("client settings file: {path:?}");

        let data = fs::read_to_string(path).map_err(|error| {
            CoreError::InvalidArgument(format!("Unable to read {}: {error}", path.display()))
        })?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.instance_name.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "instance_name must not be empty".to_string(),
            ));
        }
        if self
            .default_app_scopes
            .iter()
            .any(|scope| scope.trim().is_empty())
        {
            return Err(CoreError::InvalidArgument(
                "default_app_scopes must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured default scopes, or the legacy scope when none are set.
    pub fn app_scopes(&self) -> Vec<String> {
        app_scopes_or_default(Some(self.default_app_scopes.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::ClientSettings;
    use core_subscription::{CoreError, LEGACY_APP_SCOPE};

    #[test]
    fn empty_document_gives_defaults() {
        let settings = ClientSettings::from_json("{}").unwrap();
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(settings.app_scopes(), vec![LEGACY_APP_SCOPE]);
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(matches!(
            ClientSettings::from_json(r#"{ "instance_name": " " }"#),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            ClientSettings::from_json(r#"{ "default_app_scopes": ["Pricing", ""] }"#),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unknown_fields_and_bad_json_are_rejected() {
        assert!(ClientSettings::from_json(r#"{ "timeout": 3 }"#).is_err());
        assert!(ClientSettings::from_json("not json").is_err());
    }

    #[test]
    fn bundled_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/static-configs/client.json");
        let settings = ClientSettings::from_file(path).unwrap();
        assert_eq!(settings.instance_name, "pricing-desk");
        assert!(settings.debug_requests);
        assert_eq!(settings.app_scopes(), vec!["Pricing", "Legacy"]);
    }

    #[test]
    fn missing_file_is_an_invalid_argument() {
        assert!(matches!(
            ClientSettings::from_file("/nonexistent/client.json"),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}

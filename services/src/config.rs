//! Destination settings.
//!
//! Both structs are immutable snapshots: uploaders read them once at
//! construction and are rebuilt wholesale when settings change.

use std::ffi::OsString;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Object-store destination settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectStoreSettings {
    pub region: String,
    /// Endpoint override for S3-compatible stores. Empty means AWS.
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Key prefix template, e.g. `images/${year}/${month}/`.
    pub prefix: String,
    /// Public URL base template. Empty synthesizes a URL from the endpoint.
    pub public_url_base: String,
    pub omit_extension: bool,
    pub skip_existing: bool,
    pub force_path_style: bool,
    /// JSON object of extra client options merged over the generated ones.
    pub client_options: String,
}

/// Workspace destination settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceSettings {
    /// Directory template, relative to the workspace root.
    pub path: String,
    /// Template prepended to the filename to build the link.
    pub link_base: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            path: "assets".to_owned(),
            link_base: "assets/".to_owned(),
        }
    }
}

// Standard AWS variables consulted when the settings file leaves a field empty.
#[derive(Debug, Default, Deserialize)]
struct RawAwsEnv {
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_region: Option<String>,
    aws_default_region: Option<String>,
    aws_endpoint_url: Option<String>,
}

impl ObjectStoreSettings {
    /// Fill empty credentials, region and endpoint from the process environment.
    pub fn with_env_fallback(self) -> Self {
        match serde_env::from_iter(utf8_vars(std::env::vars_os())) {
            Ok(raw) => self.apply_env(raw),
            Err(err) => {
                debug!(target: "pasteup_services::config", error = %err, "ignoring unreadable AWS environment");
                self
            }
        }
    }

    fn apply_env(mut self, raw: RawAwsEnv) -> Self {
        let RawAwsEnv {
            aws_access_key_id,
            aws_secret_access_key,
            aws_region,
            aws_default_region,
            aws_endpoint_url,
        } = raw;

        fill(&mut self.access_key_id, aws_access_key_id, "AWS_ACCESS_KEY_ID");
        fill(&mut self.secret_access_key, aws_secret_access_key, "AWS_SECRET_ACCESS_KEY");
        fill(&mut self.region, aws_region.or(aws_default_region), "AWS_REGION");
        fill(&mut self.endpoint, aws_endpoint_url, "AWS_ENDPOINT_URL");
        self
    }

    /// Whether these settings address `bucket` in `region` through `endpoint`.
    pub fn is_location(&self, bucket: &str, region: &str, endpoint: &str) -> bool {
        self.bucket == bucket
            && self.region == region
            && self.endpoint.trim_end_matches('/') == endpoint.trim_end_matches('/')
    }

    /// Same client settings pointed at another bucket.
    pub fn relocated(self, bucket: &str, region: &str, endpoint: &str) -> Self {
        Self {
            bucket: bucket.to_owned(),
            region: region.to_owned(),
            endpoint: endpoint.to_owned(),
            ..self
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

/// Pairs whose name and value are both valid UTF-8.
fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

fn fill(field: &mut String, value: Option<String>, name: &str) {
    if !field.is_empty() {
        return;
    }
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        info!(target: "pasteup_services::config", "Using {name} from environment");
        *field = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_env::from_iter;

    #[test]
    fn env_fills_only_empty_fields() {
        let raw: RawAwsEnv = from_iter(vec![
            ("AWS_ACCESS_KEY_ID", "env-key"),
            ("AWS_SECRET_ACCESS_KEY", "env-secret"),
            ("AWS_REGION", "eu-west-1"),
        ])
        .expect("RawAwsEnv should deserialize");

        let settings = ObjectStoreSettings {
            access_key_id: "file-key".to_owned(),
            bucket: "b".to_owned(),
            ..Default::default()
        }
        .apply_env(raw);

        assert_eq!(settings.access_key_id, "file-key");
        assert_eq!(settings.secret_access_key, "env-secret");
        assert_eq!(settings.region, "eu-west-1");
        assert!(settings.endpoint.is_empty());
        assert!(settings.has_static_credentials());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt as _;

        let vars = vec![
            (OsString::from("AWS_REGION"), OsString::from("ap-south-1")),
            (OsString::from("LC_BROKEN"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![0x80]), OsString::from("x")),
        ];
        let raw: RawAwsEnv = from_iter(utf8_vars(vars)).expect("RawAwsEnv should deserialize");

        let settings = ObjectStoreSettings::default().apply_env(raw);
        assert_eq!(settings.region, "ap-south-1");
    }

    #[test]
    fn default_region_is_a_fallback() {
        let raw: RawAwsEnv = from_iter(vec![("AWS_DEFAULT_REGION", "us-east-2")])
            .expect("RawAwsEnv should deserialize");

        let settings = ObjectStoreSettings::default().apply_env(raw);
        assert_eq!(settings.region, "us-east-2");
        assert!(!settings.has_static_credentials());
    }

    #[test]
    fn settings_use_camel_case_keys() {
        let settings: ObjectStoreSettings = serde_json::from_value(serde_json::json!({
            "bucket": "media",
            "publicUrlBase": "https://cdn.example.com/",
            "skipExisting": true,
        }))
        .unwrap();

        assert_eq!(settings.bucket, "media");
        assert_eq!(settings.public_url_base, "https://cdn.example.com/");
        assert!(settings.skip_existing);
        assert!(!settings.omit_extension);
    }

    #[test]
    fn workspace_defaults() {
        let settings: WorkspaceSettings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(settings.path, "assets");
        assert_eq!(settings.link_base, "assets/");
    }
}

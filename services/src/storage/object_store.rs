//! S3-compatible object store destination backed by OpenDAL.

use std::collections::HashMap;
use std::time::Duration;

use opendal::Operator;
use pasteup_input::ResourceFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::template::TemplateVars;
use super::types::{UndoAction, UploadContext, UploadResult};
use crate::config::ObjectStoreSettings;
use crate::error::UploadError;
use crate::progress::{DelayedProgress, ProgressReporter};

/// Client options that user overrides may not redefine.
pub const PROTECTED_CLIENT_OPTIONS: &[&str] = &[
    "bucket",
    "region",
    "endpoint",
    "access_key_id",
    "secret_access_key",
    "session_token",
    "role_arn",
    "external_id",
    "role_session_name",
    "disable_config_load",
];

/// Size of each slice handed to the writer between cancellation checks.
pub const WRITE_SLICE: usize = 256 * 1024;

/// Part size for multipart uploads.
pub const MULTIPART_CHUNK: usize = 8 * 1024 * 1024;

/// Interval of progress updates while the final part is in flight.
pub const PROGRESS_TICK: Duration = Duration::from_millis(250);

/// Object written and removed by [`ObjectStoreUploader::test_connection`].
pub const TEST_OBJECT_NAME: &str = "pasteup-connection-test.txt";

/// Uploads files to a bucket.
#[derive(Clone)]
pub struct ObjectStoreUploader {
    settings: ObjectStoreSettings,
    op: Operator,
    warnings: Vec<String>,
}

impl std::fmt::Debug for ObjectStoreUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreUploader")
            .field("bucket", &self.settings.bucket)
            .field("region", &self.settings.region)
            .field("endpoint", &self.settings.endpoint)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreUploader {
    /// Build an S3 client from settings.
    ///
    /// Fails when region or bucket is missing. Rejected client overrides do
    /// not fail construction; they are logged and kept in [`Self::warnings`].
    pub fn new(settings: ObjectStoreSettings) -> Result<Self, UploadError> {
        validate(&settings)?;

        let mut options = base_options(&settings);
        let warnings = match merge_client_options(&mut options, &settings.client_options) {
            Ok(()) => Vec::new(),
            Err(rejected) => rejected,
        };
        for warning in &warnings {
            warn!(target: "pasteup_services::object_store", "{warning}");
        }

        let op = Operator::from_iter::<opendal::services::S3>(options)
            .map_err(|e| UploadError::Configuration(e.to_string()))?
            .finish();

        Ok(Self {
            settings,
            op,
            warnings,
        })
    }

    /// Use a prepared operator instead of building an S3 client.
    pub fn with_operator(settings: ObjectStoreSettings, op: Operator) -> Result<Self, UploadError> {
        validate(&settings)?;
        Ok(Self {
            settings,
            op,
            warnings: Vec::new(),
        })
    }

    pub fn settings(&self) -> &ObjectStoreSettings {
        &self.settings
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    /// Client overrides that were ignored.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// `name[.extension]`, without the extension when the settings omit it.
    pub fn object_filename(&self, file: &ResourceFile) -> String {
        if self.settings.omit_extension {
            file.name.clone()
        } else {
            file.filename()
        }
    }

    pub fn object_key(&self, vars: &TemplateVars, file: &ResourceFile) -> String {
        format!(
            "{}{}",
            vars.render(&self.settings.prefix),
            self.object_filename(file)
        )
    }

    /// Public URL of an object.
    ///
    /// With a URL base, the full key is appended unless the rendered prefix
    /// is empty or the base already ends with it, in which case only the
    /// filename is appended.
    pub fn public_url(&self, vars: &TemplateVars, key: &str, filename: &str) -> String {
        let base = vars.render(&self.settings.public_url_base);
        if !base.is_empty() {
            let prefix = vars.render(&self.settings.prefix);
            let tail = if !prefix.is_empty() && !base.ends_with(&prefix) {
                key
            } else {
                filename
            };
            return join_url(&base, &encode_key(tail));
        }

        let key = encode_key(key);
        let bucket = &self.settings.bucket;
        let endpoint = self.settings.endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            return format!(
                "https://{bucket}.s3.{}.amazonaws.com/{key}",
                self.settings.region
            );
        }
        if self.settings.force_path_style {
            return format!("{endpoint}/{bucket}/{key}");
        }
        match endpoint.split_once("://") {
            Some((scheme, host)) => format!("{scheme}://{bucket}.{host}/{key}"),
            None => format!("https://{bucket}.{endpoint}/{key}"),
        }
    }

    /// Upload one file under the templated key.
    #[instrument(skip_all, fields(name = %file.name, size = file.data.len()))]
    pub async fn upload_file(
        &self,
        file: &ResourceFile,
        ctx: &mut UploadContext<'_>,
    ) -> Result<UploadResult, UploadError> {
        let vars = TemplateVars::now(ctx.document.basename());
        let filename = self.object_filename(file);
        let key = self.object_key(&vars, file);
        let url = self.public_url(&vars, &key, &filename);

        let written = self
            .upload_buffer(&key, &file.mime, &file.data, ctx.progress, ctx.cancel)
            .await?;
        if !written {
            return Ok(UploadResult::new(url));
        }

        Ok(UploadResult::new(url).with_undo(
            format!("Delete {key} from {}", self.settings.bucket),
            UndoAction::delete_object(&self.settings, key),
        ))
    }

    /// Write `data` to `key`.
    ///
    /// Returns `Ok(false)` without writing when skipping existing objects and
    /// `key` is already present.
    pub async fn upload_buffer(
        &self,
        key: &str,
        mime: &str,
        data: &[u8],
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<bool, UploadError> {
        if self.settings.skip_existing && self.exists(key).await? {
            info!(target: "pasteup_services::object_store", key, "object exists, skipping write");
            return Ok(false);
        }

        let mut builder = self.op.writer_with(key).chunk(MULTIPART_CHUNK);
        if self.op.info().full_capability().write_with_content_type {
            builder = builder.content_type(mime);
        }
        let mut writer = builder
            .await
            .map_err(|e| UploadError::delivery(&format!("open {key}"), e))?;

        let progress = DelayedProgress::new(progress, format!("Uploading {key}"));
        let total = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let mut done = 0_u64;

        for slice in data.chunks(WRITE_SLICE) {
            let written = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = writer.write(slice.to_vec()) => Some(result),
            };

            match written {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    progress.finish();
                    abort(&mut writer, key).await;
                    return Err(UploadError::delivery(&format!("write {key}"), err));
                }
                None => {
                    progress.finish();
                    abort(&mut writer, key).await;
                    return Err(UploadError::Cancelled);
                }
            }

            done += u64::try_from(slice.len()).unwrap_or(0);
            progress.advance(done, Some(total));
        }

        // Below one chunk the writer only buffers; the transfer happens in `close`.
        let closed = {
            let close = writer.close();
            tokio::pin!(close);
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break None,
                    result = &mut close => break Some(result),
                    _ = ticker.tick() => progress.advance(done, None),
                }
            }
        };
        progress.finish();

        match closed {
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(UploadError::delivery(&format!("close {key}"), err)),
            None => {
                abort(&mut writer, key).await;
                info!(target: "pasteup_services::object_store", key, "upload cancelled");
                return Err(UploadError::Cancelled);
            }
        }

        debug!(target: "pasteup_services::object_store", key, bytes = total, "object written");
        Ok(true)
    }

    /// Existence probe. A missing object is `Ok(false)`.
    pub async fn exists(&self, key: &str) -> Result<bool, UploadError> {
        self.op
            .exists(key)
            .await
            .map_err(|e| UploadError::delivery(&format!("check {key}"), e))
    }

    pub async fn delete(&self, key: &str) -> Result<(), UploadError> {
        self.op
            .delete(key)
            .await
            .map_err(|e| UploadError::delivery(&format!("delete {key}"), e))
    }

    /// Reverse a previous upload.
    ///
    /// Refuses actions recorded against another bucket, region or endpoint.
    pub async fn undo(&self, action: &UndoAction) -> Result<(), UploadError> {
        match action {
            UndoAction::DeleteObject {
                bucket,
                region,
                endpoint,
                key,
            } => {
                if !self.settings.is_location(bucket, region, endpoint) {
                    return Err(UploadError::Configuration(format!(
                        "{key} was uploaded to bucket `{bucket}`, not `{}`",
                        self.settings.bucket
                    )));
                }
                self.delete(key).await?;
                info!(target: "pasteup_services::object_store", key, "object deleted");
                Ok(())
            }
        }
    }

    /// Upload and delete a small text object. Returns the key used.
    pub async fn test_connection(&self) -> Result<String, UploadError> {
        let vars = TemplateVars::now("");
        let key = format!("{}{TEST_OBJECT_NAME}", vars.render(&self.settings.prefix));
        let body = format!(
            "pasteup connection test {}",
            chrono::Utc::now().to_rfc3339()
        );

        self.upload_buffer(
            &key,
            "text/plain",
            body.as_bytes(),
            &crate::progress::NoProgress,
            &CancellationToken::new(),
        )
        .await?;
        self.delete(&key).await?;
        Ok(key)
    }
}

fn validate(settings: &ObjectStoreSettings) -> Result<(), UploadError> {
    if settings.region.trim().is_empty() {
        return Err(UploadError::Configuration(
            "object store region is not set".to_owned(),
        ));
    }
    if settings.bucket.trim().is_empty() {
        return Err(UploadError::Configuration(
            "object store bucket is not set".to_owned(),
        ));
    }
    Ok(())
}

fn base_options(settings: &ObjectStoreSettings) -> HashMap<String, String> {
    let mut options = HashMap::from([
        ("bucket".to_owned(), settings.bucket.clone()),
        ("region".to_owned(), settings.region.clone()),
    ]);
    if !settings.endpoint.is_empty() {
        options.insert("endpoint".to_owned(), settings.endpoint.clone());
    }
    if settings.has_static_credentials() {
        options.insert("access_key_id".to_owned(), settings.access_key_id.clone());
        options.insert(
            "secret_access_key".to_owned(),
            settings.secret_access_key.clone(),
        );
    }
    if !settings.force_path_style {
        options.insert("enable_virtual_host_style".to_owned(), "true".to_owned());
    }
    options
}

/// Merge a JSON object of overrides into `options`.
///
/// Valid entries are applied even when others are rejected; the rejected
/// ones are returned as messages.
fn merge_client_options(
    options: &mut HashMap<String, String>,
    raw: &str,
) -> Result<(), Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(());
    }

    let overrides: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            return Err(vec![
                UploadError::Validation("client options must be a JSON object".to_owned())
                    .to_string(),
            ]);
        }
        Err(err) => {
            return Err(vec![UploadError::Validation(err.to_string()).to_string()]);
        }
    };

    let mut rejected = Vec::new();
    for (name, value) in overrides {
        let key = to_snake_case(&name);
        if PROTECTED_CLIENT_OPTIONS.contains(&key.as_str()) {
            rejected.push(
                UploadError::Validation(format!("`{name}` cannot be overridden")).to_string(),
            );
            continue;
        }
        let value = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                rejected.push(
                    UploadError::Validation(format!("`{name}` must be a string, number or bool"))
                        .to_string(),
                );
                continue;
            }
        };
        options.insert(key, value);
    }

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(rejected)
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

async fn abort(writer: &mut opendal::Writer, key: &str) {
    if let Err(err) = writer.abort().await {
        warn!(target: "pasteup_services::object_store", key, error = %err, "failed to abort upload");
    }
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_url(base: &str, tail: &str) -> String {
    if base.ends_with('/') || tail.starts_with('/') {
        format!("{base}{tail}")
    } else {
        format!("{base}/{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn settings() -> ObjectStoreSettings {
        ObjectStoreSettings {
            region: "us-east-1".to_owned(),
            bucket: "media".to_owned(),
            ..Default::default()
        }
    }

    fn memory_uploader(settings: ObjectStoreSettings) -> ObjectStoreUploader {
        let op = Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        ObjectStoreUploader::with_operator(settings, op).unwrap()
    }

    fn vars() -> TemplateVars {
        TemplateVars::at(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(), "notes")
    }

    fn png(name: &str) -> ResourceFile {
        ResourceFile::new(name, "image/png", "png", vec![1, 2, 3])
    }

    #[test]
    fn missing_region_or_bucket_is_a_configuration_error() {
        let no_region = ObjectStoreSettings {
            region: String::new(),
            ..settings()
        };
        assert!(matches!(
            ObjectStoreUploader::new(no_region),
            Err(UploadError::Configuration(_))
        ));

        let no_bucket = ObjectStoreSettings {
            bucket: String::new(),
            ..settings()
        };
        assert!(matches!(
            ObjectStoreUploader::new(no_bucket),
            Err(UploadError::Configuration(_))
        ));
    }

    #[test]
    fn key_uses_prefix_template_and_extension_policy() {
        let uploader = memory_uploader(ObjectStoreSettings {
            prefix: "${year}/".to_owned(),
            ..settings()
        });
        assert_eq!(uploader.object_key(&vars(), &png("img")), "2024/img.png");

        let uploader = memory_uploader(ObjectStoreSettings {
            prefix: "${year}/".to_owned(),
            omit_extension: true,
            ..settings()
        });
        assert_eq!(uploader.object_key(&vars(), &png("img")), "2024/img");
    }

    #[test]
    fn public_url_appends_key_unless_base_ends_with_prefix() {
        let uploader = memory_uploader(ObjectStoreSettings {
            prefix: "img/${year}/".to_owned(),
            public_url_base: "https://cdn.example.com".to_owned(),
            ..settings()
        });
        assert_eq!(
            uploader.public_url(&vars(), "img/2024/a.png", "a.png"),
            "https://cdn.example.com/img/2024/a.png"
        );

        let uploader = memory_uploader(ObjectStoreSettings {
            prefix: "img/${year}/".to_owned(),
            public_url_base: "https://cdn.example.com/img/${year}/".to_owned(),
            ..settings()
        });
        assert_eq!(
            uploader.public_url(&vars(), "img/2024/a.png", "a.png"),
            "https://cdn.example.com/img/2024/a.png"
        );

        let uploader = memory_uploader(ObjectStoreSettings {
            public_url_base: "https://cdn.example.com/".to_owned(),
            ..settings()
        });
        assert_eq!(
            uploader.public_url(&vars(), "a.png", "a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn public_url_without_base_uses_endpoint_style() {
        let aws = memory_uploader(settings());
        assert_eq!(
            aws.public_url(&vars(), "dir/a b.png", "a b.png"),
            "https://media.s3.us-east-1.amazonaws.com/dir/a%20b.png"
        );

        let path_style = memory_uploader(ObjectStoreSettings {
            endpoint: "http://localhost:9000/".to_owned(),
            force_path_style: true,
            ..settings()
        });
        assert_eq!(
            path_style.public_url(&vars(), "a.png", "a.png"),
            "http://localhost:9000/media/a.png"
        );

        let virtual_host = memory_uploader(ObjectStoreSettings {
            endpoint: "https://s3.example.net".to_owned(),
            ..settings()
        });
        assert_eq!(
            virtual_host.public_url(&vars(), "a.png", "a.png"),
            "https://media.s3.example.net/a.png"
        );
    }

    #[test]
    fn protected_client_options_are_rejected() {
        let mut options = base_options(&settings());
        let rejected = merge_client_options(
            &mut options,
            r#"{"accessKeyId": "evil", "region": "x", "root": "/uploads", "disable_stat_with_override": true}"#,
        )
        .unwrap_err();

        assert_eq!(rejected.len(), 2);
        assert_eq!(options.get("region").map(String::as_str), Some("us-east-1"));
        assert_eq!(options.get("root").map(String::as_str), Some("/uploads"));
        assert_eq!(
            options.get("disable_stat_with_override").map(String::as_str),
            Some("true")
        );
        assert!(!options.contains_key("access_key_id"));
    }

    #[test]
    fn malformed_client_options_are_reported() {
        let mut options = HashMap::new();
        assert!(merge_client_options(&mut options, "not json").is_err());
        assert!(merge_client_options(&mut options, "[1, 2]").is_err());
        assert!(merge_client_options(&mut options, "  ").is_ok());
        assert!(options.is_empty());
    }

    #[test]
    fn path_style_disables_virtual_hosts() {
        let options = base_options(&ObjectStoreSettings {
            force_path_style: true,
            ..settings()
        });
        assert!(!options.contains_key("enable_virtual_host_style"));
        assert!(base_options(&settings()).contains_key("enable_virtual_host_style"));
    }

    #[test]
    fn snake_case_normalization() {
        assert_eq!(to_snake_case("secretAccessKey"), "secret_access_key");
        assert_eq!(to_snake_case("role-arn"), "role_arn");
        assert_eq!(to_snake_case("bucket"), "bucket");
    }

    #[tokio::test]
    async fn skip_existing_does_not_write() {
        let uploader = memory_uploader(ObjectStoreSettings {
            skip_existing: true,
            ..settings()
        });
        let cancel = CancellationToken::new();
        let progress = crate::progress::NoProgress;

        assert!(
            uploader
                .upload_buffer("a.png", "image/png", b"first", &progress, &cancel)
                .await
                .unwrap()
        );
        assert!(
            !uploader
                .upload_buffer("a.png", "image/png", b"second", &progress, &cancel)
                .await
                .unwrap()
        );
        assert_eq!(uploader.op.read("a.png").await.unwrap().to_vec(), b"first");
    }

    #[tokio::test]
    async fn cancelled_upload_is_not_a_delivery_error() {
        let uploader = memory_uploader(settings());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = uploader
            .upload_buffer("a.png", "image/png", b"data", &crate::progress::NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!uploader.exists("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn undo_deletes_object() {
        let uploader = memory_uploader(settings());
        uploader.op.write("2024/a.png", vec![1_u8]).await.unwrap();

        uploader
            .undo(&UndoAction::delete_object(&settings(), "2024/a.png"))
            .await
            .unwrap();
        assert!(!uploader.exists("2024/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn undo_refuses_other_bucket() {
        let uploader = memory_uploader(settings());
        uploader.op.write("a.png", vec![1_u8]).await.unwrap();

        let elsewhere = ObjectStoreSettings {
            bucket: "archive".to_owned(),
            ..settings()
        };
        let err = uploader
            .undo(&UndoAction::delete_object(&elsewhere, "a.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Configuration(_)));
        assert!(uploader.exists("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn connection_test_leaves_no_object() {
        let uploader = memory_uploader(ObjectStoreSettings {
            prefix: "tests/".to_owned(),
            ..settings()
        });
        let key = uploader.test_connection().await.unwrap();
        assert_eq!(key, format!("tests/{TEST_OBJECT_NAME}"));
        assert!(!uploader.exists(&key).await.unwrap());
    }
}

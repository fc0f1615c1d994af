use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::config::Settings;
use crate::services::access_policy::RequestContext;

const MB: usize = 1024 * 1024;
/// Largest object any bucket accepts.
pub(crate) const MAX_OBJECT_BYTES: usize = 50 * MB;

/// Logical buckets, stored as key prefixes inside the configured S3 bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum StorageBucket {
    Avatars,
    QuestionImages,
    QuestionAudio,
    FeedbackFiles,
}

impl StorageBucket {
    pub(crate) const ALL: [StorageBucket; 4] =
        [Self::Avatars, Self::QuestionImages, Self::QuestionAudio, Self::FeedbackFiles];

    pub(crate) fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|bucket| bucket.prefix() == value.trim())
    }

    pub(crate) fn prefix(self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::QuestionImages => "question-images",
            Self::QuestionAudio => "question-audio",
            Self::FeedbackFiles => "feedback-files",
        }
    }

    pub(crate) fn max_bytes(self) -> usize {
        match self {
            Self::Avatars => 5 * MB,
            Self::QuestionImages | Self::FeedbackFiles => 10 * MB,
            Self::QuestionAudio => MAX_OBJECT_BYTES,
        }
    }

    pub(crate) fn accepts(self, content_type: &str) -> bool {
        let mime = content_type.trim().to_ascii_lowercase();
        match self {
            Self::Avatars | Self::QuestionImages => mime.starts_with("image/"),
            Self::QuestionAudio => mime.starts_with("audio/"),
            Self::FeedbackFiles => {
                mime.starts_with("image/") || mime == "application/pdf" || mime == "text/plain"
            }
        }
    }

    /// Key prefix reserved for one user inside owner-scoped buckets.
    pub(crate) fn owner_prefix(self, user_id: &str) -> String {
        format!("{}/{user_id}/", self.prefix())
    }

    pub(crate) fn can_write(self, ctx: &RequestContext, key: &str) -> bool {
        match self {
            Self::Avatars => key.starts_with(&self.owner_prefix(&ctx.user_id)),
            Self::QuestionImages | Self::QuestionAudio => {
                ctx.is_staff() && key.starts_with(&format!("{}/", self.prefix()))
            }
            Self::FeedbackFiles => {
                key.starts_with(&self.owner_prefix(&ctx.user_id))
                    || (ctx.is_staff() && key.starts_with(&format!("{}/", self.prefix())))
            }
        }
    }

    pub(crate) fn can_read(self, ctx: &RequestContext, key: &str) -> bool {
        let in_bucket = key.starts_with(&format!("{}/", self.prefix()));
        match self {
            Self::Avatars | Self::QuestionImages | Self::QuestionAudio => in_bucket,
            Self::FeedbackFiles => {
                in_bucket && (ctx.is_staff() || key.starts_with(&self.owner_prefix(&ctx.user_id)))
            }
        }
    }

    /// Builds a fresh key under the caller's prefix (owner buckets) or the bucket root.
    pub(crate) fn new_key(self, ctx: &RequestContext, filename: &str) -> String {
        let file = sanitize_filename(filename);
        let id = uuid::Uuid::new_v4();
        match self {
            Self::Avatars | Self::FeedbackFiles => {
                format!("{}{id}-{file}", self.owner_prefix(&ctx.user_id))
            }
            Self::QuestionImages | Self::QuestionAudio => format!("{}/{id}-{file}", self.prefix()),
        }
    }
}

fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') { ch } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
    presign_ttl: Duration,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if !settings.s3().is_configured() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "quizdesk-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);
        let presign_ttl = Duration::from_secs(settings.s3().presigned_url_expire_minutes * 60);

        Ok(Some(Self { client, bucket: settings.s3().bucket.clone(), presign_ttl }))
    }

    pub(crate) fn presign_ttl(&self) -> Duration {
        self.presign_ttl
    }

    pub(crate) async fn presign_put(&self, key: &str, content_type: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(self.presign_ttl)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    pub(crate) async fn presign_get(&self, key: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(self.presign_ttl)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    /// Stores the body and returns its size and hex SHA-256.
    pub(crate) async fn upload_bytes(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<(i64, String)> {
        let size = bytes.len() as i64;
        let hash_hex = hex::encode(Sha256::digest(&bytes));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok((size, hash_hex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use crate::test_support;

    fn ctx(id: &str, role: UserRole) -> RequestContext {
        RequestContext { user_id: id.to_string(), username: id.to_string(), role }
    }

    #[test]
    fn bucket_limits_and_types() {
        assert_eq!(StorageBucket::Avatars.max_bytes(), 5 * MB);
        assert_eq!(StorageBucket::QuestionAudio.max_bytes(), 50 * MB);
        assert!(StorageBucket::Avatars.accepts("image/png"));
        assert!(!StorageBucket::Avatars.accepts("audio/mpeg"));
        assert!(StorageBucket::QuestionAudio.accepts("audio/mpeg"));
        assert!(StorageBucket::FeedbackFiles.accepts("application/pdf"));
        assert!(StorageBucket::FeedbackFiles.accepts("Text/Plain"));
        assert!(!StorageBucket::FeedbackFiles.accepts("application/zip"));
    }

    #[test]
    fn avatar_writes_are_owner_scoped() {
        let student = ctx("u1", UserRole::Student);
        assert!(StorageBucket::Avatars.can_write(&student, "avatars/u1/me.png"));
        assert!(!StorageBucket::Avatars.can_write(&student, "avatars/u2/me.png"));
        assert!(StorageBucket::Avatars.can_read(&student, "avatars/u2/me.png"));
    }

    #[test]
    fn question_media_requires_staff_to_write() {
        let student = ctx("u1", UserRole::Student);
        let tutor = ctx("t1", UserRole::Tutor);
        let key = "question-images/abc.png";
        assert!(!StorageBucket::QuestionImages.can_write(&student, key));
        assert!(StorageBucket::QuestionImages.can_write(&tutor, key));
        assert!(StorageBucket::QuestionImages.can_read(&student, key));
        assert!(!StorageBucket::QuestionImages.can_read(&student, "avatars/u1/x.png"));
    }

    #[test]
    fn feedback_files_are_private_to_owner_and_staff() {
        let owner = ctx("u1", UserRole::Student);
        let other = ctx("u2", UserRole::Student);
        let tutor = ctx("t1", UserRole::Tutor);
        let key = "feedback-files/u1/report.pdf";
        assert!(StorageBucket::FeedbackFiles.can_read(&owner, key));
        assert!(!StorageBucket::FeedbackFiles.can_read(&other, key));
        assert!(StorageBucket::FeedbackFiles.can_read(&tutor, key));
        assert!(!StorageBucket::FeedbackFiles.can_write(&other, key));
        assert!(StorageBucket::FeedbackFiles.can_write(&tutor, key));
    }

    #[test]
    fn parse_matches_prefixes() {
        assert_eq!(StorageBucket::parse("question-audio"), Some(StorageBucket::QuestionAudio));
        assert_eq!(StorageBucket::parse(" avatars "), Some(StorageBucket::Avatars));
        assert_eq!(StorageBucket::parse("submissions"), None);
    }

    #[test]
    fn new_keys_land_in_writable_prefix() {
        let student = ctx("u1", UserRole::Student);
        let key = StorageBucket::Avatars.new_key(&student, "../../etc/pass wd.png");
        assert!(key.starts_with("avatars/u1/"));
        assert!(key.ends_with("-pass_wd.png"));
        assert!(StorageBucket::Avatars.can_write(&student, &key));

        let tutor = ctx("t1", UserRole::Tutor);
        let key = StorageBucket::QuestionAudio.new_key(&tutor, "..");
        assert!(key.starts_with("question-audio/"));
        assert!(key.ends_with("-file"));
    }

    #[test]
    fn bucket_names_deserialize_kebab_case() {
        let bucket: StorageBucket = serde_json::from_value(serde_json::json!("question-audio")).unwrap();
        assert_eq!(bucket, StorageBucket::QuestionAudio);
    }

    #[tokio::test]
    async fn presign_put_and_get_return_urls() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        test_support::set_test_storage_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings)
            .await
            .expect("storage")
            .expect("storage enabled");

        let key = "question-images/test/file.png";
        let put_url = storage.presign_put(key, "image/png").await.expect("presign put");
        let get_url = storage.presign_get(key).await.expect("presign get");

        assert!(put_url.contains("file.png"));
        assert!(get_url.contains("file.png"));
        assert_eq!(storage.presign_ttl(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn storage_is_disabled_without_credentials() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings).await.expect("storage");
        assert!(storage.is_none());
    }
}

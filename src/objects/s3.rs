//! AWS S3 object store backend.
//!
//! Holds one blob per message id (`<id>.txt`) in a single bucket.
//! Credentials and endpoint come from the shared [`AwsConfig`]; a custom
//! endpoint with path-style addressing targets LocalStack.

use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use super::store::ObjectStore;
use crate::config::AwsConfig;

/// S3-backed blob store.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 store.
    ///
    /// Path-style addressing is forced whenever a custom endpoint is set,
    /// since virtual-hosted bucket DNS does not resolve against emulators.
    pub async fn new(config: &AwsConfig, bucket: &str) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if !config.endpoint_url.is_empty() {
            loader = loader.endpoint_url(&config.endpoint_url);
        }

        if !config.access_key_id.is_empty() && !config.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &config.access_key_id,
                &config.secret_access_key,
                None,
                None,
                "postbox-config",
            );
            loader = loader.credentials_provider(creds);
        }

        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(!config.endpoint_url.is_empty())
            .build();

        let client = Client::from_conf(s3_config);

        info!(
            "S3 store initialized: bucket={} endpoint='{}'",
            bucket, config.endpoint_url
        );

        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("S3 {context}: {err}")
    }
}

impl ObjectStore for S3ObjectStore {
    fn provision(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.client.create_bucket().bucket(&self.bucket).send().await {
                Ok(_) => {
                    info!("created bucket {}", self.bucket);
                    Ok(())
                }
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_bucket_already_owned_by_you()
                        || service_err.is_bucket_already_exists()
                    {
                        debug!("bucket {} already exists", self.bucket);
                        Ok(())
                    } else {
                        Err(Self::map_sdk_error("create_bucket", service_err))
                    }
                }
            }
        })
    }

    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("put_object: bucket={} key={}", self.bucket, key);
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(aws_sdk_s3::primitives::ByteStream::from(data))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;
            Ok(())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("get_object: bucket={} key={}", self.bucket, key);
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await;

            let resp = match resp {
                Ok(resp) => resp,
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(Self::map_sdk_error("get_object", service_err));
                }
            };

            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| Self::map_sdk_error("get_object body", e))?
                .into_bytes();

            Ok(Some(body))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            debug!("delete_object: bucket={} key={}", self.bucket, key);
            // S3 delete_object is idempotent -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e))?;
            Ok(())
        })
    }
}

use std::io::Write;

use aws_sdk_s3::{
    config::{Credentials, Region},
    Client, Config,
};
use ulid::Ulid;
use vigil_config::{config, report_internal_error, FilesS3};
use vigil_result::{create_error, Result};

use crate::{AbstractStorage, StoredImage};

/// Create an S3 client
pub fn create_client(s3_config: FilesS3) -> Client {
    let provider_name = "vigil-creds";
    let creds = Credentials::new(
        s3_config.access_key_id,
        s3_config.secret_access_key,
        None,
        None,
        provider_name,
    );

    let config = Config::builder()
        .region(Region::new(s3_config.region))
        .endpoint_url(s3_config.endpoint)
        .credentials_provider(creds)
        .build();

    Client::from_conf(config)
}

/// S3-compatible storage driver
#[derive(Clone, Default)]
pub struct S3Storage;

#[async_trait]
impl AbstractStorage for S3Storage {
    /// Upload a buffer to S3
    async fn upload(&self, folder: &str, content_type: &str, buf: &[u8]) -> Result<StoredImage> {
        let config = config().await;
        let client = create_client(config.files.s3.clone());

        let id = format!("{folder}/{}", Ulid::new());
        client
            .put_object()
            .bucket(&config.files.bucket)
            .key(&id)
            .content_type(content_type)
            .body(buf.to_vec().into())
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Failed to upload object {id}: {err:?}");
                create_error!(UploadFailed)
            })?;

        Ok(StoredImage {
            url: format!(
                "{}/{}/{id}",
                config.files.s3.endpoint, config.files.bucket
            ),
            id,
            content_type: content_type.to_string(),
        })
    }

    /// Fetch an object from S3
    async fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        let config = config().await;
        let client = create_client(config.files.s3);

        let mut obj = report_internal_error!(
            client
                .get_object()
                .bucket(&config.files.bucket)
                .key(id)
                .send()
                .await
        )?;

        // Read the object from remote
        let mut buf = vec![];
        while let Some(bytes) = obj.body.next().await {
            let data = report_internal_error!(bytes)?;
            report_internal_error!(buf.write_all(&data))?;
        }

        Ok(buf)
    }

    /// Destroy an object in S3
    async fn destroy(&self, id: &str) -> Result<()> {
        let config = config().await;
        let client = create_client(config.files.s3);

        report_internal_error!(
            client
                .delete_object()
                .bucket(&config.files.bucket)
                .key(id)
                .send()
                .await
        )?;

        Ok(())
    }
}

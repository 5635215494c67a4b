use std::{collections::HashMap, sync::Arc};

use futures::lock::Mutex;
use ulid::Ulid;
use vigil_result::{create_error, Result};

use crate::{AbstractStorage, StoredImage};

/// In-memory storage implementation
///
/// Uploads can be scripted to fail after a number of successes, which is
/// how partial-upload rollback behaviour is exercised in tests.
#[derive(Clone, Default)]
pub struct ReferenceStorage {
    pub objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub remaining_successful_uploads: Arc<Mutex<Option<usize>>>,
}

impl ReferenceStorage {
    /// Let the next `count` uploads succeed, then fail every one after
    pub async fn fail_uploads_after(&self, count: usize) {
        *self.remaining_successful_uploads.lock().await = Some(count);
    }

    /// Number of objects currently held
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Whether the store holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl AbstractStorage for ReferenceStorage {
    async fn upload(&self, folder: &str, content_type: &str, buf: &[u8]) -> Result<StoredImage> {
        let mut remaining = self.remaining_successful_uploads.lock().await;
        if let Some(count) = remaining.as_mut() {
            if *count == 0 {
                return Err(create_error!(UploadFailed));
            }

            *count -= 1;
        }

        drop(remaining);

        let id = format!("{folder}/{}", Ulid::new());
        self.objects.lock().await.insert(id.clone(), buf.to_vec());

        Ok(StoredImage {
            url: format!("memory://{id}"),
            id,
            content_type: content_type.to_string(),
        })
    }

    async fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(NotFound))
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.objects
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| create_error!(NotFound))
    }
}

#[macro_use]
extern crate async_trait;

#[macro_use]
extern crate serde;

mod reference;
mod s3;

pub use reference::*;
pub use s3::*;

use vigil_result::Result;

/// Reference to an image held in object storage
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Public URL the image is served from
    pub url: String,
    /// Storage key, used to fetch or destroy the object
    pub id: String,
    /// Content type the object was uploaded with
    pub content_type: String,
}

/// Object storage operations used by the report pipeline
#[async_trait]
pub trait AbstractStorage: Sync + Send {
    /// Upload a buffer into the given folder, returning its reference
    async fn upload(&self, folder: &str, content_type: &str, buf: &[u8]) -> Result<StoredImage>;

    /// Fetch an object back by its storage key
    async fn fetch(&self, id: &str) -> Result<Vec<u8>>;

    /// Destroy an object by its storage key
    async fn destroy(&self, id: &str) -> Result<()>;
}

/// Object storage
#[derive(Clone)]
pub enum Storage {
    /// Mock storage
    Reference(ReferenceStorage),
    /// S3-compatible storage
    S3(S3Storage),
}

impl std::ops::Deref for Storage {
    type Target = dyn AbstractStorage;

    fn deref(&self) -> &Self::Target {
        match self {
            Storage::Reference(storage) => storage,
            Storage::S3(storage) => storage,
        }
    }
}

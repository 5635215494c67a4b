use cached::proc_macro::cached;
use config::{Config, File, FileFormat};
use futures_locks::RwLock;
use once_cell::sync::Lazy;
use serde::Deserialize;

static CONFIG_BUILDER: Lazy<RwLock<Config>> = Lazy::new(|| {
    RwLock::new({
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("../Vigil.toml"),
            FileFormat::Toml,
        ));

        if std::path::Path::new("Vigil.toml").exists() {
            builder = builder.add_source(File::new("Vigil.toml", FileFormat::Toml));
        }

        builder.build().unwrap()
    })
});

#[derive(Deserialize, Debug, Clone)]
pub struct Database {
    pub mongodb: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Hosts {
    pub app: String,
    pub api: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Api {
    pub development: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FilesS3 {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Files {
    pub bucket: String,
    /// Largest accepted image payload, in bytes
    pub image_size: usize,
    /// Most images accepted on a single report
    pub max_images: usize,
    pub s3: FilesS3,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Ai {
    /// Base URL of an OpenAI-compatible completions API
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Request timeout, in seconds
    pub timeout: u64,
    /// Connection timeout, in seconds
    pub connect_timeout: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub database: Database,
    pub hosts: Hosts,
    pub api: Api,
    pub files: Files,
    pub ai: Ai,
}

pub async fn init() {
    println!(
        ":: Vigil Configuration ::\n\x1b[32m{:?}\x1b[0m",
        config().await
    );
}

pub async fn read() -> Config {
    CONFIG_BUILDER.read().await.clone()
}

#[cached(time = 30)]
pub async fn config() -> Settings {
    read().await.try_deserialize::<Settings>().unwrap()
}

/// Log an internal error and map it to an opaque InternalError
#[macro_export]
#[cfg(feature = "report-macros")]
macro_rules! report_internal_error {
    ( $expr: expr ) => {
        $expr.map_err(|err| {
            tracing::error!("Internal error occurred: {err:?}");
            vigil_result::create_error!(InternalError)
        })
    };
}

#[cfg(feature = "test")]
#[cfg(test)]
mod tests {
    use crate::init;

    #[async_std::test]
    async fn it_works() {
        init().await;
    }
}

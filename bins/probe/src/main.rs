//! blobdisk probe
//!
//! Builds the configured disk and runs one write, read, verify and remove
//! cycle against it.

use std::sync::Arc;

use anyhow::ensure;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blobdisk_core::disk::{ReadMethod, ReadOptions};
use blobdisk_core::storage::OperatorContainer;
use blobdisk_core::{DiskSettings, RemoteDisk, SettingsCell, StorageConfig, WriteMode};
use blobdisk_metadata::LocalMetadataStore;
use blobdisk_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blobdisk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source = AppConfig::source()?;
    let config = AppConfig::from_source(&source)?;
    let storage = StorageConfig::from_source(&source)?;

    let container = Arc::new(OperatorContainer::from_config(storage)?);
    info!(
        provider = container.provider_name(),
        bucket = container.bucket(),
        "Storage configured"
    );

    let settings = DiskSettings::from_config(&source, &config.disk.name)?;
    let disk = RemoteDisk::new(
        config.disk.name.clone(),
        container,
        Arc::new(LocalMetadataStore::new(&config.disk.metadata_path)),
        Arc::new(SettingsCell::new(settings)),
    );

    let path = format!("probe/{}", chrono::Utc::now().timestamp_millis());
    #[allow(clippy::cast_possible_truncation)]
    let payload: Vec<u8> = (0..config.disk.write_buffer_size * 3 + 17)
        .map(|i| (i % 251) as u8)
        .collect();

    let mut writer = disk
        .open_for_write(&path, WriteMode::Rewrite, config.disk.write_buffer_size)
        .await?;
    writer.write(&payload).await?;
    let size = writer.finalize().await?;
    let remote_id = writer.remote_id().clone();
    info!(%path, %remote_id, size, "Wrote probe file");

    for method in [ReadMethod::Read, ReadMethod::Threadpool] {
        let options = ReadOptions::new(method, config.disk.read_buffer_size);
        let mut reader = disk.open_for_read(&path, &options).await?;
        let mut read_back = Vec::with_capacity(payload.len());
        reader.read_to_end(&mut read_back).await?;
        ensure!(read_back == payload, "{method:?} read returned different bytes");
        info!(?method, bytes = read_back.len(), "Verified probe file");
    }

    ensure!(
        disk.exists_remotely(remote_id.as_str()).await?,
        "committed object {remote_id} is not listed"
    );

    disk.remove_file(&path).await?;
    ensure!(
        !disk.exists_remotely(remote_id.as_str()).await?,
        "object {remote_id} still listed after removal"
    );
    info!(%path, disk = disk.name(), "Probe passed");

    Ok(())
}

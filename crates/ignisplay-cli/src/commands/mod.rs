pub mod catalog;
pub mod config;
pub mod history;
pub mod my_list;
pub mod playback;
pub mod subscription;

use crate::output::Output;
use color_eyre::Result;
use ignisplay_backends::JsonFileBackend;
use ignisplay_config::{Config, PathManager};
use ignisplay_core::{StoreOptions, WatchActivityStore};
use ignisplay_models::{catalog as titles, Identity, MovieRecord};
use std::sync::Arc;
use tracing::debug;

/// Open the on-disk store and hydrate the requested profile
pub(crate) async fn open_store(config: &Config, user: Option<&str>) -> Result<WatchActivityStore> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create data directories: {}", e))?;

    let store_dir = path_manager.store_dir();
    debug!("Using store directory {}", store_dir.display());

    let store = WatchActivityStore::builder(Arc::new(JsonFileBackend::new(store_dir)))
        .with_options(StoreOptions::from_config(config))
        .build();
    store.load(Identity::from_uid(user)).await;
    Ok(store)
}

/// Wait for queued writes and surface any that failed
pub(crate) async fn finish(store: &WatchActivityStore, output: &Output) {
    store.flush().await;
    let failed = store.failed_writes();
    if failed > 0 {
        output.warn(format!("{} write(s) could not be saved; see the log for details", failed));
    }
}

pub(crate) fn lookup_title(movie_id: &str) -> Result<MovieRecord> {
    titles::find(movie_id).ok_or_else(|| {
        color_eyre::eyre::eyre!("Unknown title '{}'. Run 'ignisplay catalog top' to list ids.", movie_id)
    })
}

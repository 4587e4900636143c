//! Loading and persisting the image through a storage backend.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::image::Image;
use crate::stats::DatabaseStats;
use shelfdb_storage::StorageBackend;
use tracing::{debug, warn};

/// Reads and decodes the image.
///
/// An image that reads but does not decode is replaced by an empty one and
/// the call succeeds.
///
/// # Errors
///
/// Returns [`CoreError::OpenFailure`] if the backend cannot be read.
pub fn load_image(backend: &dyn StorageBackend, stats: &DatabaseStats) -> CoreResult<Image> {
    let bytes = backend.read_all().map_err(CoreError::OpenFailure)?;
    stats.record_load(bytes.len() as u64);

    match Image::decode(&bytes) {
        Ok(image) => {
            debug!(
                location = %backend.location(),
                bytes = bytes.len(),
                collections = image.items.len(),
                "image loaded"
            );
            Ok(image)
        }
        Err(e) => {
            stats.record_healed();
            warn!(
                location = %backend.location(),
                bytes = bytes.len(),
                error = %e,
                "image does not decode, substituting an empty image"
            );
            Ok(Image::new())
        }
    }
}

/// Encodes the image and overwrites the backend with it.
///
/// `meta.total` is refreshed first.
///
/// # Errors
///
/// - [`CoreError::SerializationFailure`] if encoding fails; nothing is written
/// - [`CoreError::WriteFailure`] if the write or sync fails
pub fn persist_image(
    backend: &mut dyn StorageBackend,
    image: &mut Image,
    config: &Config,
    stats: &DatabaseStats,
) -> CoreResult<()> {
    image.refresh_total();
    let bytes = image
        .encode(config.pretty)
        .map_err(CoreError::SerializationFailure)?;

    backend.write_all(&bytes).map_err(CoreError::WriteFailure)?;
    if config.sync_on_write {
        backend.sync().map_err(CoreError::WriteFailure)?;
    }
    stats.record_persist(bytes.len() as u64);

    debug!(
        location = %backend.location(),
        bytes = bytes.len(),
        total = image.meta.total,
        "image persisted"
    );
    Ok(())
}

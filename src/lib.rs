//! Serves an Apple sparsebundle band directory over the NBD wire protocol.

pub mod band_factory;
pub mod block_device;
pub mod cli;
pub mod device;
pub mod error;
pub mod file_view;
pub mod nbd;
pub mod plist_source;

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::band_factory::OpenMode;
use crate::block_device::BandBlockDevice;
use crate::device::Device;
use crate::error::ServeError;

/// Opens the bundle at `bundle_dir`, binds `port`, and serves NBD until the
/// process is killed or the listener errors out.
pub async fn serve(bundle_dir: &Path, port: u16) -> Result<(), ServeError> {
    let info = plist_source::read_bundle_info(bundle_dir)?;
    tracing::info!(
        band_size = info.band_size,
        total_size = info.total_size,
        "loaded bundle geometry"
    );

    let bands_dir = bundle_dir.join("bands");
    let device = BandBlockDevice::new(bands_dir, info.band_size, info.total_size, OpenMode::ReadWrite);
    let device: Arc<dyn Device + Send + Sync> = Arc::new(device);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!(%addr, "listening");

    nbd::server::serve(listener, device)
        .await
        .map_err(ServeError::Accept)
}

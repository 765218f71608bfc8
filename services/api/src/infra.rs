use jobboard::board::{
    ArtifactStore, BoardRepository, FsArtifactStore, HiringService, LocalRepository,
    MemoryArtifactStore,
};
use jobboard::config::{StorageBackend, StorageConfig};
use jobboard::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Hiring service over whichever backends the configuration selects.
pub(crate) type BoardService = HiringService<dyn BoardRepository, dyn ArtifactStore>;

pub(crate) fn build_service(storage: &StorageConfig) -> Result<Arc<BoardService>, AppError> {
    let (repository, artifacts): (Arc<dyn BoardRepository>, Arc<dyn ArtifactStore>) =
        match storage.backend {
            StorageBackend::Disk => {
                let snapshot = storage.snapshot_path();
                let repository = LocalRepository::open(&snapshot)?;
                let artifacts = FsArtifactStore::new(storage.artifact_dir());
                info!(
                    snapshot = %snapshot.display(),
                    artifacts = %artifacts.root().display(),
                    "board storage opened"
                );
                (Arc::new(repository), Arc::new(artifacts))
            }
            StorageBackend::Memory => {
                info!("board storage held in memory; records are lost on exit");
                (
                    Arc::new(LocalRepository::in_memory()),
                    Arc::new(MemoryArtifactStore::default()),
                )
            }
        };

    Ok(Arc::new(HiringService::new(repository, artifacts)))
}

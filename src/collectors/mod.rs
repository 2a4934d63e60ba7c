/// Journal log collector for remote systemd units
pub mod systemd_collector;

/// Container log collector for remote Docker daemons
pub mod docker_collector;

/// GPU metric collector for remote nvidia-smi
pub mod gpu_collector;

pub use docker_collector::{ContainerRef, DockerHarvest, DockerLogCollector};
pub use gpu_collector::GpuMetricCollector;
pub use systemd_collector::SystemdLogCollector;

/// Result of one collection run: the records gathered plus how many
/// malformed lines were dropped along the way.
#[derive(Debug)]
pub struct Harvest<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Harvest<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

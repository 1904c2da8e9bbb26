//! Orquestación de escaneos de muestras: reconciliación de estado, puerta de
//! plugins, persistencia de la muestra y despacho concurrente de workers.

pub mod barrier;
pub mod catalog;
pub mod confirm;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod plugin;
pub mod reconcile;
pub mod sample;
pub mod session;
pub mod settings;
pub mod traits;

pub use barrier::{CompletionBarrier, CompletionToken};
pub use catalog::PluginCatalog;
pub use confirm::{AlwaysNo, AlwaysYes, Confirm, ConsoleConfirm};
pub use coordinator::{
    MissingCollaborator, SessionCoordinator, SessionCoordinatorBuilder, StagedHook, preflight,
};
pub use dispatch::{WorkerContext, WorkerDispatcher};
pub use error::{ConfigError, ReconciliationError, ScanError};
pub use gate::PluginAvailabilityGate;
pub use plugin::{MimeMatcher, PluginDescriptor, PluginTask, TaskState};
pub use reconcile::StaleStateReconciler;
pub use sample::{Digests, Sample, SampleRecord};
pub use session::{ScanReport, SessionId};
pub use settings::{DockerSettings, ScanOptions, ScanOptionsBuilder, Settings, StoreConfig};

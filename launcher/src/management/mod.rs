pub mod coordinator;
pub mod launch;
pub mod process;
pub mod process_helper;
pub mod registry;
pub mod stats;

pub use coordinator::{LifecycleCoordinator, StartFailure};
pub use process::{CommandError, ServerProcess, StartError, SupervisorTimings};
pub use registry::{ServerMap, ServerRegistry, ServerRuntimeRecord};

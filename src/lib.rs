//! Factory floor simulator: machine actors, a routing layer and a job
//! orchestrator with a retrying worker pool.

pub mod command;
pub mod completion;
pub mod config;
pub mod error;
pub mod job;
pub mod job_queue;
pub mod logging;
pub mod machine;
pub mod material;
pub mod orchestrator;
pub mod routing;
pub mod sim;
pub mod stats;
pub mod types;

pub use config::{FactoryConfig, RetryPolicy};
pub use error::{JobError, MachineError, OrchestratorError, RoutingError};
pub use job::{Job, Step};
pub use machine::{Machine, MachineActor, MachineRef, SourceStation, Transporter, TypedProcessor};
pub use material::{Material, MaterialKind};
pub use orchestrator::{JobReport, Orchestrator};
pub use types::{MachineCategory, MachineId, StepStatus};

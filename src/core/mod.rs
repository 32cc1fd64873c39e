pub mod checklist;
pub mod entrypoint;
pub mod gate;
pub mod steps;
pub mod verify;

pub use crate::domain::model::{ChecklistReport, CommandSpec, StepStatus};
pub use crate::domain::ports::{CommandRunner, ProcessHandoff, ReadinessProbe};
pub use crate::utils::error::Result;

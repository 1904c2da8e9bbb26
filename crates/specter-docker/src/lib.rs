//! Adaptador de specter sobre el CLI de docker.

pub mod command;
pub mod driver;
pub mod error;
pub mod ps;
pub mod specs;

pub use command::CommandSpec;
pub use driver::{DockerCli, INTEL_CATEGORY};
pub use error::DockerError;
pub use specs::Specs;

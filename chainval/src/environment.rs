//! Collaborator switchboard used throughout chain validation

pub mod chain_environment;
pub mod chain_environment_traits;

pub use crate::environment::{chain_environment::*, chain_environment_traits::*};

//! Authorization resolution: entity → enforcer key → enforcer.

pub mod loaders;
pub mod resolver;

pub use loaders::{EnforcementIdLoader, EnforcerLoader, EnforcerSource, PolicyIdSource, Revisioned};
pub use resolver::EnforcerResolver;

/// Base flow, builder and step contract
pub mod flow;

/// Transactional and non-transactional execution boundaries
pub mod boundary;

/// Startup task executor
pub mod startup;

/// Application-started notifier
pub mod notifier;

//! Infrastructure layer: storage backends, application services, the action
//! boundary, configuration and process wiring.

pub mod actions;
pub mod bootstrap;
pub mod config;
pub mod services;
pub mod store;

pub use actions::{ActionError, ActionResult, HerdActions};
pub use bootstrap::{DynHerdActions, Herdbook};
pub use config::{ConfigError, HerdbookConfig};
pub use services::{AiClassifier, ErrorKind, ReportService, ServiceError, WeightLedger};
pub use store::{
    AnimalStore, HerdStore, InMemoryHerdStore, PostgresHerdStore, ReportStore, StoreError,
};

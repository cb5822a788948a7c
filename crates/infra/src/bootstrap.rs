//! Process wiring: configuration in, ready-to-use action facade out.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use herdbook_ai::{ChatCompletionsGenerator, TextGenerator};

use crate::actions::HerdActions;
use crate::config::{HerdbookConfig, StoreConfig};
use crate::services::AiClassifier;
use crate::store::{HerdStore, InMemoryHerdStore, PostgresHerdStore};

pub type DynHerdActions = HerdActions<dyn HerdStore, dyn TextGenerator>;

/// A configured herdbook instance.
pub struct Herdbook {
    config: HerdbookConfig,
    actions: DynHerdActions,
}

impl Herdbook {
    /// Initialize logging, open the configured store and build the actions.
    pub async fn from_config(config: HerdbookConfig) -> anyhow::Result<Self> {
        herdbook_observability::init_with(config.log_format);

        let store: Arc<dyn HerdStore> = match &config.store {
            StoreConfig::InMemory => {
                info!("using in-memory herd store");
                Arc::new(InMemoryHerdStore::new())
            }
            StoreConfig::Postgres { database_url } => {
                let pool = PgPool::connect(database_url)
                    .await
                    .context("failed to connect to Postgres")?;
                let store = PostgresHerdStore::new(pool);
                store.migrate().await.context("failed to create herd tables")?;
                info!("using Postgres herd store");
                Arc::new(store)
            }
        };

        let mut generator = ChatCompletionsGenerator::new(
            config.classifier.endpoint.clone(),
            config.classifier.model.clone(),
        );
        if let Some(api_key) = &config.classifier.api_key {
            generator = generator.with_api_key(api_key.clone());
        }
        info!(
            model = %generator.model(),
            timeout_secs = config.classifier.timeout.as_secs(),
            "classifier configured"
        );
        let generator: Arc<dyn TextGenerator> = Arc::new(generator);

        let classifier = AiClassifier::new(Arc::clone(&store), generator)
            .with_timeout(config.classifier.timeout);
        let actions = HerdActions::new(store, classifier);

        info!("herdbook ready");
        Ok(Self { config, actions })
    }

    /// Shorthand for `from_config(HerdbookConfig::from_env()?)`.
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = HerdbookConfig::from_env().context("invalid herdbook configuration")?;
        Self::from_config(config).await
    }

    pub fn actions(&self) -> &DynHerdActions {
        &self.actions
    }

    pub fn config(&self) -> &HerdbookConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::RecordWeightRequest;
    use herdbook_core::OwnerId;

    #[tokio::test]
    async fn in_memory_instance_serves_actions() {
        let config = HerdbookConfig::from_lookup(|_| None).unwrap();
        let herdbook = Herdbook::from_config(config).await.unwrap();

        let request: RecordWeightRequest = serde_json::from_value(serde_json::json!({
            "animalId": "cow-1",
            "date": "2024-05-01",
            "weight": 300.0,
            "notes": "spring weigh-in"
        }))
        .unwrap();
        let owner = OwnerId::new();
        assert!(herdbook.actions().record_weight(owner, request).await.is_ok());
        assert!(herdbook.actions().list_reports(owner).await.is_ok());
    }
}

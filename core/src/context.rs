use std::sync::Arc;

use crate::config::AppConfig;
use crate::controller::BatchController;
use crate::error::BatchError;
use crate::events_out::{start_events_out, EventLog, EventsOutTx};
use crate::kv::KeyValueStore;
use crate::scheduler::SchedulerOptions;
use crate::stage::{GenerationStage, VisionStage};

/// Concrete collaborators a controller is assembled from.
#[derive(Clone)]
pub struct Services {
    pub vision: Arc<dyn VisionStage>,
    pub generation: Arc<dyn GenerationStage>,
    pub settings: Arc<dyn KeyValueStore>,
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, BatchError>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    events_out: Option<EventsOutTx>,
    services_factory: Option<Arc<dyn ServicesFactory>>,
}

impl AppContext {
    pub async fn new(
        cfg: AppConfig,
        services_factory: Option<Arc<dyn ServicesFactory>>,
    ) -> Result<Self, BatchError> {
        let events_out = start_events_out(&cfg.events_out)
            .await
            .map_err(BatchError::Config)?;
        Ok(Self {
            cfg,
            events_out,
            services_factory,
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn events_out(&self) -> Option<EventsOutTx> {
        self.events_out.clone()
    }

    pub async fn build_services(&self) -> Result<Services, BatchError> {
        let Some(factory) = self.services_factory.as_ref() else {
            return Err(BatchError::Config(
                "services_factory missing (cannot build stage clients)".into(),
            ));
        };
        factory.build_services(&self.cfg).await
    }

    /// Wire a controller from the factory's services, the events tee and the
    /// scheduler section of the config.
    pub async fn build_controller(&self) -> Result<BatchController, BatchError> {
        let services = self.build_services().await?;
        let log = EventLog::with_events_out(self.events_out());
        Ok(BatchController::new(
            services,
            log,
            SchedulerOptions::from(&self.cfg.scheduler),
        ))
    }
}

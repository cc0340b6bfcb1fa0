use std::sync::Arc;

use crate::config::AppConfig;
use crate::images::{pixabay::PixabaySearch, ImageResolver};
use crate::llm::{gemini::GeminiGenerator, GenerationClient};
use crate::meals::services::Planner;
use crate::nutrition::NutritionState;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub nutrition: Arc<NutritionState>,
    pub planner: Arc<Planner>,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let llm = match GeminiGenerator::from_config(&config.gemini)? {
            Some(generator) => {
                tracing::info!(model = %config.gemini.model, "gemini generation enabled");
                GenerationClient::new(Arc::new(generator))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set; generation features will report gemini_not_configured");
                GenerationClient::disabled()
            }
        };

        let images = match PixabaySearch::from_config(&config.pixabay)? {
            Some(search) => ImageResolver::new(Arc::new(search)),
            None => {
                tracing::info!("PIXABAY_KEY not set; meal images use placeholders");
                ImageResolver::disabled()
            }
        };

        Ok(Self::from_parts(Arc::new(config), llm, images))
    }

    pub fn from_parts(config: Arc<AppConfig>, llm: GenerationClient, images: ImageResolver) -> Self {
        let nutrition = Arc::new(NutritionState::new());
        let planner = Arc::new(Planner::new(nutrition.clone(), llm, images));
        Self {
            config,
            nutrition,
            planner,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(GenerationClient::disabled())
    }

    #[cfg(test)]
    pub fn fake_with(llm: GenerationClient) -> Self {
        use crate::config::{GeminiConfig, PixabayConfig, SchedulerConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            gemini: GeminiConfig {
                api_key: None,
                model: "test".into(),
                base_url: "http://localhost".into(),
                timeout_secs: 1,
            },
            pixabay: PixabayConfig {
                api_key: None,
                base_url: "http://localhost".into(),
            },
            scheduler: SchedulerConfig {
                enabled: false,
                run_at: time::macros::time!(12:00),
            },
        });
        Self::from_parts(config, llm, ImageResolver::disabled())
    }
}

use std::sync::Arc;

use sqlx::AnyPool;

use crate::config::Settings;
use crate::error::AppError;
use crate::nutritionix::NutritionixClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: AnyPool,
    pub settings: Arc<Settings>,
    pub nutritionix: NutritionixClient,
}

impl AppState {
    pub fn new(pool: AnyPool, settings: Settings) -> Result<Self, AppError> {
        let nutritionix = NutritionixClient::new(settings.nutritionix.clone())?;
        Ok(Self {
            pool,
            settings: Arc::new(settings),
            nutritionix,
        })
    }
}

use std::sync::Arc;

use spares_order::LifecycleEngine;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub metrics: Arc<Metrics>,
}

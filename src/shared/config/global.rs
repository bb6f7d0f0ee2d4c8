use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;

use crate::shared::config::model::{Settings, load_settings};

/// Process-wide settings for callers that do not carry their own.
pub static CONFIG: Lazy<Arc<Settings>> = Lazy::new(|| {
    Arc::new(load_settings().unwrap_or_else(|e| {
        warn!(target: "config::global", error = %e, "Falling back to default settings");
        Settings::default()
    }))
});

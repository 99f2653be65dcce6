use std::path::Path;

use crate::{
    infra::{
        config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError,
        storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

/// Loads configuration and resolves storage. Logging is set up by the
/// caller because the console and the one-shot commands log to different
/// places.
pub fn bootstrap(config_path: Option<&Path>) -> anyhow::Result<AppContext> {
    let context = build_context(&FileConfigAdapter::new(config_path), StorageLayout::resolve)?;
    context.layout.ensure_dirs()?;
    Ok(context)
}

fn build_context(
    config_adapter: &dyn ConfigAdapter,
    resolve_layout: impl FnOnce() -> Result<StorageLayout, AppError>,
) -> anyhow::Result<AppContext> {
    let config = config_adapter.load()?;
    let layout = resolve_layout()?;

    Ok(AppContext::new(config, layout))
}

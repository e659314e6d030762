use specstruct_core::StructureConfig;

use crate::prelude::*;
use crate::Global;

/// Build the run configuration: TOML file first, then flag/env overrides.
pub fn load(global: &Global) -> Result<StructureConfig> {
    let mut config = match &global.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| f!("Failed to read config file {}", path.display()))?;
            StructureConfig::from_toml_str(&raw)
                .wrap_err_with(|| f!("Failed to load config file {}", path.display()))?
        }
        None => StructureConfig::default(),
    };

    apply_overrides(&mut config, global)?;
    log::debug!("config.loaded file={:?}", global.config);
    Ok(config)
}

fn apply_overrides(config: &mut StructureConfig, global: &Global) -> Result<()> {
    if global.no_suppress_toc {
        config.suppress_toc = false;
    }
    if global.no_suppress_running {
        config.suppress_running = false;
    }
    if let Some(threshold) = global.threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::InvalidThreshold(threshold).into());
        }
        config.score_threshold = threshold;
    }
    Ok(())
}

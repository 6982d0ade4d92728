//! CLI configuration: thin wrapper around `benchdeck_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--url, --profile, --timeout, --insecure).

use std::time::Duration;

use benchdeck_core::config::DEFAULT_URL;
use benchdeck_core::{PanelConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use benchdeck_config::{
    Config, Profile, config_path, load_config, parse_url, profile_to_panel_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build the `PanelConfig` for this invocation.
///
/// Flag values win over the profile, the profile wins over defaults. With
/// no profile at all the controller is expected at the default URL.
pub fn resolve_panel_config(global: &GlobalOpts) -> Result<PanelConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut panel = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile_to_panel_config(profile, &cfg.defaults)?,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            let profile = Profile {
                url: DEFAULT_URL.into(),
                ..Profile::default()
            };
            profile_to_panel_config(&profile, &cfg.defaults)?
        }
    };

    if let Some(ref url) = global.url {
        panel.url = parse_url(url)?;
    }
    if global.insecure {
        panel.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        panel.timeout = Duration::from_secs(secs);
    }
    Ok(panel)
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

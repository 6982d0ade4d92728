//! Config subcommand handlers.

use dialoguer::{Confirm, Input};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;

    let name: String = Input::new()
        .with_prompt("Profile name")
        .default(config::active_profile_name(global, &cfg))
        .interact_text()
        .map_err(prompt_err)?;

    let url: String = Input::new()
        .with_prompt("Controller URL")
        .default(
            global
                .url
                .clone()
                .unwrap_or_else(|| benchdeck_core::config::DEFAULT_URL.into()),
        )
        .validate_with(|input: &String| config::parse_url(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(prompt_err)?;

    let insecure = if url.starts_with("https://") {
        Confirm::new()
            .with_prompt("Accept self-signed certificates?")
            .default(false)
            .interact()
            .map_err(prompt_err)?
    } else {
        false
    };

    cfg.profiles.insert(
        name.clone(),
        Profile {
            url,
            insecure: insecure.then_some(true),
            ..Profile::default()
        },
    );
    if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(name.clone());
    }

    let path = config::save_config(&cfg)?;
    eprintln!("Profile '{name}' written to {}", path.display());
    Ok(())
}

fn set_default(name: String) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;
    if !cfg.profiles.contains_key(&name) {
        return Err(CliError::ProfileNotFound {
            available: config::available_profiles(&cfg),
            name,
        });
    }
    cfg.default_profile = Some(name);
    config::save_config(&cfg)?;
    Ok(())
}

fn show(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: e.to_string(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&show(&cfg)?, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            let lines: Vec<String> = cfg
                .profiles
                .iter()
                .map(|(name, p)| {
                    let marker = if *name == active { "*" } else { " " };
                    format!("{marker} {name}  {}", p.url)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            set_default(name.clone())?;
            output::print_output(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_renders_profiles_as_toml() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                url: "http://bench-pi.local:8080".into(),
                ..Profile::default()
            },
        );
        let text = show(&cfg).expect("render");
        assert!(text.contains("[profiles.lab]"));
        assert!(text.contains("url = \"http://bench-pi.local:8080\""));
    }
}

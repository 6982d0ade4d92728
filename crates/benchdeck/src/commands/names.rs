//! Bench name command handlers.

use serde::Serialize;
use tabled::Tabled;

use benchdeck_core::{BenchClient, BenchId, BenchNames, CoreError, Panel};

use crate::cli::{GlobalOpts, NamesArgs, NamesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct NameEntry {
    bench: u8,
    name: String,
    label: String,
}

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Bench")]
    bench: u8,
    #[tabled(rename = "Name")]
    label: String,
}

fn entries(names: &BenchNames) -> Vec<NameEntry> {
    BenchId::ALL
        .into_iter()
        .map(|id| {
            let name = names.get(id.number()).unwrap_or_default().trim().to_owned();
            let label = if name.is_empty() {
                id.default_label()
            } else {
                name.clone()
            };
            NameEntry {
                bench: id.number(),
                name,
                label,
            }
        })
        .collect()
}

pub async fn handle(
    panel: &Panel<BenchClient>,
    args: NamesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = panel.backend();

    let names = match args.command.unwrap_or(NamesCommand::List) {
        NamesCommand::List => client.bench_names().await.map_err(CoreError::from)?,
        NamesCommand::Set { bench, name } => {
            let bench = util::parse_bench(&bench)?;
            let mut names = client
                .bench_names()
                .await
                .map_err(CoreError::from)?;
            names.set(bench.number(), name);
            client
                .set_bench_names(&names)
                .await
                .map_err(CoreError::from)?
        }
    };

    let out = output::render_list(
        &global.output,
        &entries(&names),
        |e| NameRow {
            bench: e.bench,
            label: e.label.clone(),
        },
        |e| format!("bench{} {}", e.bench, e.label),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_get_default_labels() {
        let names = BenchNames {
            b2: "Scope rig".into(),
            ..BenchNames::default()
        };
        let rows = entries(&names);
        assert_eq!(rows[0].label, "Bench 1");
        assert_eq!(rows[0].name, "");
        assert_eq!(rows[1].label, "Scope rig");
    }
}

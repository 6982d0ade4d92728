//! `watch`: run the state poller and print a line whenever the board or
//! connectivity changes.

use benchdeck_core::{BenchClient, Connectivity, Panel, PanelView, Rail};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn summary(view: &PanelView, color: bool) -> String {
    let link = match &view.connectivity {
        Connectivity::Offline { error, .. } => format!("Offline ({error})"),
        other => other.label().to_owned(),
    };
    let benches: Vec<String> = view
        .benches
        .iter()
        .map(|b| {
            let rails: Vec<String> = Rail::POWER_UP
                .into_iter()
                .map(|r| format!("{}:{}", r.label(), output::switch_label(b.rail(r).on, color)))
                .collect();
            let service = if b.service { " SERVICE" } else { "" };
            format!("{} [{}]{service}", b.label(), rails.join(" "))
        })
        .collect();
    format!("{link} | {} | {}", benches.join(" | "), view.pressure)
}

pub async fn handle(panel: &Panel<BenchClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut view = panel.subscribe_view();
    panel.start();

    let mut last = String::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = summary(&view.borrow_and_update(), color);
                if line != last {
                    let stamp = chrono::Local::now().format("%H:%M:%S");
                    output::print_output(&format!("{stamp} {line}"), global.quiet);
                    last = line;
                }
            }
        }
    }

    panel.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_offline_reason() {
        let mut view = PanelView::new();
        view.connectivity = Connectivity::Offline {
            error: "HTTP 500".into(),
            last_ok: None,
        };
        let line = summary(&view, false);
        assert!(line.starts_with("Offline (HTTP 500)"));
        assert!(line.contains("Bench 1 [5V:OFF 12V:OFF HV:OFF]"));
        assert!(line.ends_with("-- psi"));
    }
}

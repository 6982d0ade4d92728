//! Channel command handlers: state, set, rails, all-off.

use serde::Serialize;
use tabled::Tabled;

use benchdeck_core::model::{self, ChannelKind};
use benchdeck_core::{BenchClient, BenchView, Confirmed, CoreError, DeviceState, Panel, Rail};

use crate::cli::{GlobalOpts, RailsArgs, SetArgs, StateArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct BenchStatus {
    bench: u8,
    name: String,
    #[serde(rename = "5v")]
    v5: bool,
    #[serde(rename = "12v")]
    v12: bool,
    hv: bool,
    service: bool,
}

impl From<&BenchView> for BenchStatus {
    fn from(b: &BenchView) -> Self {
        Self {
            bench: b.id.number(),
            name: b.label(),
            v5: b.rail(Rail::V5).on,
            v12: b.rail(Rail::V12).on,
            hv: b.rail(Rail::Hv).on,
            service: b.service,
        }
    }
}

#[derive(Tabled)]
struct BenchRow {
    #[tabled(rename = "Bench")]
    bench: u8,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "5V")]
    v5: String,
    #[tabled(rename = "12V")]
    v12: String,
    #[tabled(rename = "HV")]
    hv: String,
    #[tabled(rename = "Service")]
    service: String,
}

#[derive(Serialize)]
struct ChannelEntry {
    channel: String,
    kind: &'static str,
    on: bool,
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Serialize)]
struct SwitchResult {
    channel: String,
    on: bool,
}

fn channel_entries(state: &DeviceState) -> Vec<ChannelEntry> {
    state
        .iter()
        .map(|(channel, on)| ChannelEntry {
            channel: channel.to_owned(),
            kind: model::classify(channel).map_or("unknown", ChannelKind::group),
            on,
        })
        .collect()
}

fn switch_line(channel: &str, on: bool) -> String {
    format!("{channel} {}", if on { "on" } else { "off" })
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn state(
    panel: &Panel<BenchClient>,
    args: &StateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = panel.poll_once().await?;
    let color = output::should_color(&global.color);

    let out = if args.all {
        output::render_list(
            &global.output,
            &channel_entries(&state),
            |e| ChannelRow {
                channel: e.channel.clone(),
                kind: e.kind.into(),
                state: output::switch_label(e.on, color),
            },
            |e| switch_line(&e.channel, e.on),
        )?
    } else {
        if let Err(e) = panel.load_names().await {
            tracing::debug!(error = %e, "bench names unavailable");
        }
        let view = panel.view();
        let benches: Vec<BenchStatus> = view.benches.iter().map(BenchStatus::from).collect();
        output::render_list(
            &global.output,
            &benches,
            |b| BenchRow {
                bench: b.bench,
                name: b.name.clone(),
                v5: output::switch_label(b.v5, color),
                v12: output::switch_label(b.v12, color),
                hv: output::switch_label(b.hv, color),
                service: if b.service { "SERVICE".into() } else { "-".into() },
            },
            |b| {
                format!(
                    "bench{} 5v={} 12v={} hv={} service={}",
                    b.bench, b.v5, b.v12, b.hv, b.service
                )
            },
        )?
    };

    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn set(
    panel: &Panel<BenchClient>,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !args.force && !model::is_known(&args.channel) {
        return Err(CoreError::UnknownChannel { name: args.channel }.into());
    }

    let state = panel.set_channel(&args.channel, args.state.is_on()).await?;
    let result = SwitchResult {
        on: state.get(&args.channel),
        channel: args.channel,
    };

    let out = output::render_single(
        &global.output,
        &result,
        |r| switch_line(&r.channel, r.on),
        |r| switch_line(&r.channel, r.on),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn rails(
    panel: &Panel<BenchClient>,
    args: &RailsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bench = util::parse_bench(&args.bench)?;

    // The master lock is derived from state, so fetch it first.
    panel.poll_once().await?;
    panel.set_rails_master(bench, args.state.is_on()).await?;

    let view = panel.view();
    let status = view
        .bench(bench)
        .map(BenchStatus::from)
        .ok_or_else(|| CoreError::UnknownBench {
            value: args.bench.clone(),
        })?;

    let out = output::render_single(
        &global.output,
        &status,
        |s| {
            format!(
                "{}: 5V {}  12V {}  HV {}",
                s.name,
                output::switch_label(s.v5, false),
                output::switch_label(s.v12, false),
                output::switch_label(s.hv, false),
            )
        },
        |s| format!("bench{} 5v={} 12v={} hv={}", s.bench, s.v5, s.v12, s.hv),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn all_off(panel: &Panel<BenchClient>, global: &GlobalOpts) -> Result<(), CliError> {
    if !util::confirm(
        "all-off",
        "Switch off every rail and port on all benches?",
        global.yes,
    )? {
        output::print_output("Aborted.", global.quiet);
        return Ok(());
    }

    let state = panel.all_off(Confirmed::by_operator()).await?;
    let still_on: Vec<ChannelEntry> = channel_entries(&state).into_iter().filter(|e| e.on).collect();

    if still_on.is_empty() {
        output::print_output("All rails and ports off.", global.quiet);
    } else {
        let names: Vec<&str> = still_on.iter().map(|e| e.channel.as_str()).collect();
        output::print_output(
            &format!("All off sent; still on: {}", names.join(", ")),
            global.quiet,
        );
    }
    Ok(())
}

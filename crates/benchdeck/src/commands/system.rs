//! Controller-level command handlers: pressure, health, usb, logs.

use serde::Serialize;
use tabled::Tabled;

use benchdeck_core::{BenchClient, CoreError, HealthReport, LogLine, Panel, PressureDisplay};

use crate::cli::{GlobalOpts, LogsArgs, UsbArgs};
use crate::error::CliError;
use crate::output;

// ── Pressure ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PressureOut {
    psi: Option<f64>,
    max_psi: Option<f64>,
    display: String,
    error: Option<String>,
}

impl From<&PressureDisplay> for PressureOut {
    fn from(d: &PressureDisplay) -> Self {
        let (psi, max_psi, error) = match d {
            PressureDisplay::Reading { psi, max_psi } => (Some(*psi), *max_psi, None),
            PressureDisplay::Unavailable { reason } => (None, None, Some(reason.clone())),
            PressureDisplay::Unknown => (None, None, None),
        };
        Self {
            psi,
            max_psi,
            display: d.to_string(),
            error,
        }
    }
}

pub async fn pressure(panel: &Panel<BenchClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let display = panel.refresh_pressure().await;
    let out = output::render_single(
        &global.output,
        &PressureOut::from(&display),
        |p| match (&p.error, p.max_psi) {
            (Some(reason), _) => format!("{}  ({reason})", p.display),
            (None, Some(max)) => format!("{} / {max:.0} psi", p.display),
            (None, None) => p.display.clone(),
        },
        |p| p.psi.map_or_else(String::new, |psi| format!("{psi:.1}")),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Health ──────────────────────────────────────────────────────────

fn health_detail(h: &HealthReport, color: bool) -> String {
    let mut lines = vec![
        format!("Overall: {}", ok_label(h.ok, color)),
        format!("I2C:     {}", ok_label(h.i2c, color)),
    ];
    if let Some(ref err) = h.i2c_error {
        lines.push(format!("         {err}"));
    }
    lines.push(format!("MCP #1:  {}", ok_label(h.mcp1, color)));
    lines.push(format!("MCP #2:  {}", ok_label(h.mcp2, color)));
    lines.push(format!("ADC:     {}", ok_label(h.ads, color)));
    lines.push(format!("MQTT:    {}", ok_label(h.mqtt, color)));
    lines.join("\n")
}

fn ok_label(ok: bool, color: bool) -> String {
    use owo_colors::OwoColorize;
    match (ok, color) {
        (true, true) => "ok".green().to_string(),
        (false, true) => "missing".red().to_string(),
        (true, false) => "ok".into(),
        (false, false) => "missing".into(),
    }
}

pub async fn health(panel: &Panel<BenchClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let report = panel.backend().health().await.map_err(CoreError::from)?;
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |h| health_detail(h, color),
        |h| if h.ok { "ok".into() } else { "degraded".into() },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── USB ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct UsbResult {
    port: u8,
    data: bool,
    vbus: bool,
}

pub async fn usb(
    panel: &Panel<BenchClient>,
    args: &UsbArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = UsbResult {
        port: args.port,
        data: args.data.is_on(),
        vbus: args.vbus.is_on(),
    };
    panel
        .backend()
        .set_usb_port(result.port, result.data, result.vbus)
        .await
        .map_err(CoreError::from)?;

    let out = output::render_single(
        &global.output,
        &result,
        |r| {
            format!(
                "USB port {}: data {}, vbus {}",
                r.port,
                output::switch_label(r.data, false),
                output::switch_label(r.vbus, false),
            )
        },
        |r| format!("port{} data={} vbus={}", r.port, r.data, r.vbus),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Logs ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    ts: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Bench")]
    bench: String,
    #[tabled(rename = "Rail")]
    rail: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&LogLine> for LogRow {
    fn from(l: &LogLine) -> Self {
        if let Some(ref raw) = l.raw {
            return Self {
                ts: String::new(),
                event: raw.clone(),
                bench: String::new(),
                rail: String::new(),
                state: String::new(),
            };
        }
        Self {
            ts: l.ts.clone().unwrap_or_default(),
            event: l.event.clone().unwrap_or_default(),
            bench: l.bench.clone().unwrap_or_default(),
            rail: l.rail.clone().or_else(|| l.channel.clone()).unwrap_or_default(),
            state: l
                .state
                .map(|on| output::switch_label(on, false))
                .unwrap_or_default(),
        }
    }
}

pub async fn logs(
    panel: &Panel<BenchClient>,
    args: &LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let tail = panel
        .backend()
        .log_tail(u32::from(args.lines))
        .await
        .map_err(CoreError::from)?;

    if let Some(ref path) = tail.path {
        tracing::debug!(%path, records = tail.lines.len(), "log tail");
    }

    let out = output::render_list(
        &global.output,
        &tail.lines,
        |l: &LogLine| LogRow::from(l),
        LogLine::summary,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

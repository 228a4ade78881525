use anyhow::Context;
use clap::Parser;
use client_core::PhonebookConfig;
use crossbeam_channel::bounded;
use url::Url;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use backend_bridge::runtime::spawn_backend_thread;
use controller::events::UiEvent;
use ui::PhonebookApp;

/// Desktop phonebook client backed by a remote persons service.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the persons service.
    #[arg(long, default_value = "http://localhost:3001")]
    server_url: String,
    /// Clear the name/number inputs after a successful add.
    #[arg(long)]
    clear_after_add: bool,
    /// Show a notification when a submit is ignored for being too short.
    #[arg(long)]
    announce_invalid_input: bool,
}

fn parse_server_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
    anyhow::ensure!(
        url.scheme() == "http" || url.scheme() == "https",
        "server url must be http(s), got '{}'",
        url.scheme()
    );
    Ok(url)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let server_url = parse_server_url(&args.server_url)?;
    let config = PhonebookConfig {
        clear_inputs_after_create: args.clear_after_add,
        announce_rejected_input: args.announce_invalid_input,
        ..Default::default()
    };

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(server_url, config, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Phonebook")
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Phonebook",
        options,
        Box::new(|_cc| Ok(Box::new(PhonebookApp::new(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run phonebook window: {err}"))
}

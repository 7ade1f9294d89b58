#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

mod bulk;
mod cache;
mod config;
mod controller;
mod error;
mod fanout;
mod gateway;
mod logging;
mod model;
mod prefs;
#[cfg(test)]
mod testing;
mod ui;
mod version;
mod view;

use std::sync::Arc;

use config::AppConfig;
use controller::{ControllerHandle, Intent};
use gateway::{HttpGateway, SharedGateway};
use prefs::PreferenceStore;
use ui::app::TagFleetApp;

fn main() {
    let config = AppConfig::load();
    logging::init_tracing(&config);

    let server_url = config.server_url();
    let gateway: SharedGateway = match HttpGateway::new(&server_url) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            tracing::error!(target: "tagfleet", error = %err, %server_url, "cannot build the server client");
            std::process::exit(1);
        }
    };
    tracing::info!(target: "tagfleet", %server_url, "starting dashboard");

    let controller = ControllerHandle::spawn(
        gateway,
        PreferenceStore::open_default(),
        config.refresh_delay(),
    );
    controller.send(Intent::RefreshAll);

    let native_options = eframe::NativeOptions {
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    if let Err(err) = eframe::run_native(
        "TagFleet",
        native_options,
        Box::new(move |_cc| Box::new(TagFleetApp::new(controller, server_url))),
    ) {
        tracing::error!(target: "tagfleet", error = %err, "failed to start the UI");
        std::process::exit(1);
    }
}

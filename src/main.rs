#![cfg_attr(windows, windows_subsystem = "windows")]

mod bootstrap;
mod data_loaders;
#[cfg(windows)]
mod desktop;
mod logging;
mod mascot;
mod menu;
mod paths;
#[cfg(windows)]
mod utility;

use std::process::ExitCode;

use crate::{
	data_loaders::config::AppConfig,
	paths::{app_data_dir, config_file_path, log_file_path},
};

pub const APP_NAME: &str = "Desktop Mascot";
pub const DEBUG_NAME: &str = "MASCOT";

#[cfg(windows)]
fn enable_per_monitor_dpi_awareness() {
	use windows::Win32::UI::HiDpi::{
		SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
	};

	unsafe {
		if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
			warn!(
				"[{}] Failed to set process DPI awareness to PerMonitorV2; mascots may be scaled",
				DEBUG_NAME
			);
		}
	}
}

#[cfg(windows)]
fn run_shell(config: &AppConfig, data_dir: &std::path::Path) -> ExitCode {
	enable_per_monitor_dpi_awareness();
	match desktop::run(config, data_dir) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("[{}] Desktop shell failed: {}", DEBUG_NAME, e);
			ExitCode::FAILURE
		}
	}
}

#[cfg(not(windows))]
fn run_shell(_config: &AppConfig, _data_dir: &std::path::Path) -> ExitCode {
	error!("[{}] The desktop shell is only available on Windows", DEBUG_NAME);
	eprintln!("{APP_NAME}: the desktop shell is only available on Windows");
	ExitCode::FAILURE
}

fn main() -> ExitCode {
	let data_dir = app_data_dir();
	logging::init(log_file_path(&data_dir), true, "info");
	bootstrap::bootstrap_app(&data_dir);

	let config_path = config_file_path(&data_dir);
	let config = AppConfig::load(&config_path).unwrap_or_else(|| {
		warn!(
			"[{}] Could not read {}; using default settings",
			DEBUG_NAME,
			config_path.display()
		);
		AppConfig::default()
	});

	logging::set_debug(config.debug);
	logging::set_level(&config.log_level);
	std::panic::set_hook(Box::new(|panic_info| {
		error!("[{}] Panic: {}", DEBUG_NAME, panic_info);
	}));

	info!("!---------- [{}] Starting {} ----------!", DEBUG_NAME, APP_NAME);
	info!("[{}] Config loaded from {}", DEBUG_NAME, config_path.display());

	let code = run_shell(&config, &data_dir);
	info!("[{}] Exiting", DEBUG_NAME);
	code
}

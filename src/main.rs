//! Front panel driver
//!
//! Runs the panel controller with logging stand-ins for the audio engine and
//! UI. Exits on Ctrl+C or shift+settings.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use panel_driver::transport::{Key, Led, LedColor};
use panel_driver::{make_or_dummy, Controller, ControllerContext, InputEvent, LogSink, PanelConfig};

/// How often the main loop mirrors key presses onto LEDs
const UI_TICK: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "panel-driver")]
#[command(about = "Control-surface driver for the MCU front panel")]
struct Cli {
    /// Config file path (default: ~/.config/panel-driver/panel.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// FIFO device node, overrides the config file
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Separate outbound node for LED commands, overrides the config file
    #[arg(long)]
    tx_device: Option<PathBuf>,

    /// Send keyboard-section keys to the UI instead of synthesizing MIDI
    #[arg(long)]
    no_midi: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(PanelConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let mut config = PanelConfig::load(&config_path)?;
    if let Some(device) = cli.device {
        config.device_path = device;
    }
    if let Some(tx_device) = cli.tx_device {
        config.tx_device_path = Some(tx_device);
    }
    if cli.no_midi {
        config.send_midi = false;
    }
    config.validate()?;

    let running = setup_interrupt_handler();
    let sink = Arc::new(LogSink);
    let controller = make_or_dummy(&config, ControllerContext::new(sink.clone(), sink));
    if controller.is_dummy() {
        info!("No panel attached, running without input");
    }

    register_exit_combo(controller.as_ref(), &running);

    controller.clear_leds();
    controller.flush_leds();

    info!("Entering main loop. Press Ctrl+C or shift+settings to exit.");
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(UI_TICK);
        mirror_keys_on_leds(controller.as_ref());
    }

    // Dropping the controller joins the reader thread
    controller.clear_leds();
    controller.flush_leds();
    drop(controller);
    info!("Exiting");
    Ok(())
}

fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

/// Shift+settings clears `running`
///
/// Shift state is tracked in a flag owned by the handlers so they hold no
/// reference back to the controller.
fn register_exit_combo(controller: &dyn Controller, running: &Arc<AtomicBool>) {
    let shift_held = Arc::new(AtomicBool::new(false));

    let on_press = Arc::clone(&shift_held);
    let on_release = Arc::clone(&shift_held);
    controller.register_key_handler(
        Key::Shift,
        Arc::new(move |_: Key| on_press.store(true, Ordering::SeqCst)),
        Some(Arc::new(move |_: Key| on_release.store(false, Ordering::SeqCst))),
    );

    let running = Arc::clone(running);
    controller.register_key_handler(
        Key::Settings,
        Arc::new(move |_: Key| {
            if shift_held.load(Ordering::SeqCst) {
                info!("Exit requested from panel");
                running.store(false, Ordering::SeqCst);
            }
        }),
        None,
    );
}

/// Light the LED under each held key
fn mirror_keys_on_leds(controller: &dyn Controller) {
    let mut changed = false;
    controller.drain_input_events(&mut |events: &[InputEvent]| {
        for event in events {
            match *event {
                InputEvent::KeyPress(key) => controller.set_color(Led::new(key), LedColor::WHITE),
                InputEvent::KeyRelease(key) => controller.set_color(Led::new(key), LedColor::BLACK),
                InputEvent::Encoder(_) => continue,
            }
            changed = true;
        }
    });
    if changed {
        controller.flush_leds();
    }
}

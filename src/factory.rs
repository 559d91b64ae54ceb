//! Controller construction with graceful degradation

use tracing::error;

use crate::config::PanelConfig;
use crate::controller::Controller;
use crate::dummy::DummyController;
use crate::runtime::McuFifoController;
use crate::sinks::ControllerContext;

/// Open the panel named in `config`, or fall back to a [`DummyController`]
///
/// Construction failures are logged and never returned; the caller always
/// gets a usable controller.
pub fn make_or_dummy(config: &PanelConfig, context: ControllerContext) -> Box<dyn Controller> {
    match McuFifoController::open(config, context) {
        Ok(controller) => Box::new(controller),
        Err(e) => {
            error!("{}; continuing without panel", e);
            Box::new(DummyController::new(config.send_midi))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use panel_transport::{Key, KeyGroup, Led, LedColor};

    use crate::controller::InputEvent;

    #[test]
    fn test_missing_device_gives_dummy() {
        let config = PanelConfig {
            device_path: PathBuf::from("/nonexistent/mcu_fifo"),
            ..PanelConfig::default()
        };
        let controller = make_or_dummy(&config, ControllerContext::null());
        assert!(controller.is_dummy());

        controller.set_color(Led::new(Key::S0), LedColor::WHITE);
        controller.clear_led_group(KeyGroup::Channel);
        controller.clear_leds();
        controller.flush_leds();
        assert!(!controller.is_pressed(Key::Shift));
        assert!(controller.midi_routing());

        let mut batches = 0;
        controller.drain_input_events(&mut |events: &[InputEvent]| {
            assert!(events.is_empty());
            batches += 1;
        });
        assert_eq!(batches, 1);
    }
}

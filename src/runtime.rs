//! Live controller backed by a panel link
//!
//! One reader thread per controller owns the link. Each iteration it makes a
//! bounded read attempt, dispatches any complete line, and then transmits the
//! outbound write buffer if a flush was requested or the flush interval passed.
//! LED calls from any thread only append to the write buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use panel_transport::{
    AfterSwap, BufferWriter, DoubleBuffered, FifoLink, Guarded, Key, KeyGroup, Led, LedColor,
    LedCommand, Message, PanelLink, TransportError,
};

use crate::config::PanelConfig;
use crate::controller::{Controller, InputEvent, KeyHandler};
use crate::dispatch::Dispatcher;
use crate::error::ControllerError;
use crate::sinks::ControllerContext;
use crate::worker::{RunFlag, Worker};

/// Settings for the reader loop
#[derive(Debug, Clone)]
struct ReaderConfig {
    error_sleep: Duration,
    flush_interval: Option<Duration>,
}

/// State owned by the reader thread
struct ReaderLoop<L> {
    link: L,
    dispatcher: Arc<Dispatcher>,
    write_buffer: DoubleBuffered<Vec<u8>>,
    flush_requested: Arc<AtomicBool>,
    config: ReaderConfig,
    last_transmit: Instant,
}

impl<L: PanelLink> ReaderLoop<L> {
    fn run(mut self, run: RunFlag) {
        debug!("Panel reader started on {}", self.link.describe());

        while run.is_running() {
            match self.link.read_line() {
                Ok(line) => {
                    if let Err(e) = self.dispatcher.handle_line(&line) {
                        warn!("{} ({:02X?})", e, line);
                    }
                }
                Err(e) if e.is_transient() => {}
                Err(e) => {
                    error!("Panel read error on {}: {}", self.link.describe(), e);
                    std::thread::sleep(self.config.error_sleep);
                }
            }
            self.poll_transmit();
        }

        // Anything queued before shutdown still goes out
        self.transmit();
        debug!("Panel reader exiting");
    }

    fn poll_transmit(&mut self) {
        let requested = self.flush_requested.swap(false, Ordering::AcqRel);
        let due = self
            .config
            .flush_interval
            .is_some_and(|interval| self.last_transmit.elapsed() >= interval);
        if requested || due {
            self.transmit();
        }
    }

    /// Swap the write buffer and send the drained slot
    fn transmit(&mut self) {
        self.last_transmit = Instant::now();
        self.write_buffer.swap();
        let bytes = self.write_buffer.inner();
        if bytes.is_empty() {
            return;
        }
        match self.link.write_all(bytes) {
            Ok(()) => debug!("Sent {} bytes to panel", bytes.len()),
            Err(e) => error!("Dropping {} outbound bytes: {}", bytes.len(), e),
        }
    }
}

/// Controller driving a physical panel
pub struct McuFifoController {
    dispatcher: Arc<Dispatcher>,
    write_buffer: BufferWriter<Vec<u8>>,
    flush_requested: Arc<AtomicBool>,
    input_events: Guarded<DoubleBuffered<Vec<InputEvent>>>,
    worker: Worker,
    description: String,
}

impl McuFifoController {
    /// Open the FIFO named in `config` and start the reader thread
    pub fn open(config: &PanelConfig, context: ControllerContext) -> Result<Self, ControllerError> {
        let link = FifoLink::open(&config.device_path, config.fifo())
            .map_err(ControllerError::Construction)?;
        Self::with_link(link, config, context)
    }

    /// Start a controller on an already-open link
    pub fn with_link<L>(
        link: L,
        config: &PanelConfig,
        context: ControllerContext,
    ) -> Result<Self, ControllerError>
    where
        L: PanelLink + 'static,
    {
        let description = link.describe();
        let write_buffer = DoubleBuffered::new(AfterSwap::ClearOuter);
        let writer = write_buffer.writer();
        let input_events = DoubleBuffered::new(AfterSwap::ClearOuter);
        let dispatcher = Arc::new(Dispatcher::new(
            context,
            config.line_delimiter,
            config.send_midi,
            input_events.writer(),
        ));
        let flush_requested = Arc::new(AtomicBool::new(false));

        let reader = ReaderLoop {
            link,
            dispatcher: Arc::clone(&dispatcher),
            write_buffer,
            flush_requested: Arc::clone(&flush_requested),
            config: ReaderConfig {
                error_sleep: config.error_sleep(),
                flush_interval: config.flush_interval(),
            },
            last_transmit: Instant::now(),
        };
        let worker = Worker::spawn("panel-reader", move |run| reader.run(run))
            .map_err(|e| ControllerError::Construction(TransportError::Io(e)))?;

        info!("Panel controller running on {}", description);
        Ok(Self {
            dispatcher,
            write_buffer: writer,
            flush_requested,
            input_events: Guarded::new(input_events),
            worker,
            description,
        })
    }

    /// Append encoded command bytes to the outbound buffer
    pub fn queue_message(&self, bytes: &[u8]) {
        self.write_buffer
            .outer_locked(|buf| buf.extend_from_slice(bytes));
    }

    fn queue(&self, message: Message) {
        self.queue_message(&message.to_bytes());
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    /// Stop and join the reader thread. Called on drop.
    pub fn shutdown(&mut self) {
        self.worker.stop();
    }
}

impl Controller for McuFifoController {
    fn set_color(&self, led: Led, color: LedColor) {
        self.queue(LedCommand::SetColor { led, color }.to_message());
    }

    fn flush_leds(&self) {
        self.flush_requested.store(true, Ordering::Release);
    }

    fn clear_leds(&self) {
        self.queue(LedCommand::ClearAll.to_message());
    }

    fn clear_led_group(&self, group: KeyGroup) {
        self.queue(LedCommand::ClearGroup(group).to_message());
    }

    fn is_pressed(&self, key: Key) -> bool {
        self.dispatcher.is_pressed(key)
    }

    fn register_key_handler(&self, key: Key, on_press: KeyHandler, on_release: Option<KeyHandler>) {
        self.dispatcher
            .register_key_handler(key, on_press, on_release);
    }

    fn set_midi_routing(&self, enabled: bool) {
        self.dispatcher.set_midi_routing(enabled);
    }

    fn midi_routing(&self) -> bool {
        self.dispatcher.midi_routing()
    }

    fn drain_input_events(&self, f: &mut dyn FnMut(&[InputEvent])) {
        self.input_events.apply(|events| {
            events.swap();
            f(events.inner());
        });
        self.dispatcher.input_log_drained();
    }
}

impl Drop for McuFifoController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

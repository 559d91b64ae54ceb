//! Controller over real named pipes

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use panel_driver::{
    make_or_dummy, Controller, ControllerContext, MidiEvent, PanelConfig, RecordingSink,
};
use tempfile::{tempdir, TempDir};

fn make_fifo(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
    // SAFETY: `c_path` is a valid NUL-terminated string
    let ret = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    assert_eq!(ret, 0, "mkfifo failed: {}", std::io::Error::last_os_error());
    path
}

fn config(device_path: PathBuf) -> PanelConfig {
    PanelConfig {
        device_path,
        poll_timeout_ms: 2,
        flush_interval_ms: 0,
        ..PanelConfig::default()
    }
}

/// The controller holds each pipe open read-write, so these never block
fn open_peer(path: &Path, write: bool) -> File {
    OpenOptions::new()
        .read(!write)
        .write(write)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .unwrap()
}

fn wait_for_midi(sink: &RecordingSink, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while sink.len() < count {
        assert!(Instant::now() < deadline, "timed out waiting for MIDI events");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_named_pipe_key_to_midi() {
    let dir = tempdir().unwrap();
    let path = make_fifo(&dir, "mcu_fifo");
    let sink = Arc::new(RecordingSink::new());
    let controller = make_or_dummy(
        &config(path.clone()),
        ControllerContext::new(sink.clone(), sink.clone()),
    );
    assert!(!controller.is_dummy());

    let mut writer = open_peer(&path, true);
    // Split a line across two writes to exercise partial reads
    writer.write_all(&[0x20]).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    writer.write_all(&[0xC0, b'\n', 0x21, 0xC0, b'\n']).unwrap();

    wait_for_midi(&sink, 2);
    assert_eq!(
        sink.midi_events(),
        vec![MidiEvent::note_on(47), MidiEvent::note_off(47)]
    );
}

#[test]
fn test_key_after_led_flush_on_split_pipes() {
    let dir = tempdir().unwrap();
    let rx_path = make_fifo(&dir, "mcu_rx");
    let tx_path = make_fifo(&dir, "mcu_tx");
    let config = PanelConfig {
        tx_device_path: Some(tx_path.clone()),
        ..config(rx_path.clone())
    };
    let sink = Arc::new(RecordingSink::new());
    let controller = make_or_dummy(&config, ControllerContext::new(sink.clone(), sink.clone()));
    assert!(!controller.is_dummy());

    let mut panel_in = open_peer(&tx_path, false);
    let mut panel_out = open_peer(&rx_path, true);

    controller.clear_leds();
    controller.flush_leds();

    let mut received = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    while received.is_empty() {
        assert!(Instant::now() < deadline, "timed out waiting for LED bytes");
        let mut buf = [0u8; 16];
        match panel_in.read(&mut buf) {
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(received, vec![0xE0]);

    // The clear command must not have leaked into the inbound stream
    panel_out.write_all(&[0x20, 0xC0, b'\n']).unwrap();
    wait_for_midi(&sink, 1);
    assert_eq!(sink.midi_events(), vec![MidiEvent::note_on(47)]);
}

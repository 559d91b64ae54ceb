//! FifoLink over real named pipes

use std::ffi::CString;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use panel_transport::{
    decode_event, FifoConfig, FifoLink, Key, PanelEvent, PanelLink, TransportError,
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

fn open_peer(path: &Path, write: bool) -> std::fs::File {
    OpenOptions::new()
        .read(!write)
        .write(write)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .unwrap()
}

fn read_line_within(link: &mut FifoLink, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    loop {
        match link.read_line() {
            Ok(line) => return line,
            Err(TransportError::EmptyBuffer) => {
                assert!(Instant::now() < deadline, "no line within {:?}", timeout);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[test]
fn test_idle_pipe_read_is_bounded() {
    let dir = tempdir().unwrap();
    let path = make_fifo(&dir, "rx");
    let config = FifoConfig {
        poll_timeout: Duration::from_millis(10),
        ..FifoConfig::default()
    };
    let mut link = FifoLink::open(&path, config).unwrap();

    let start = Instant::now();
    assert!(matches!(link.read_line(), Err(TransportError::EmptyBuffer)));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_lines_from_external_writer() {
    let dir = tempdir().unwrap();
    let path = make_fifo(&dir, "rx");
    let mut link = FifoLink::open(&path, FifoConfig::default()).unwrap();
    let mut writer = open_peer(&path, true);

    writer.write_all(&[0x20, 0xC3, b'\n', 0x32]).unwrap();
    let line = read_line_within(&mut link, Duration::from_secs(1));
    assert_eq!(decode_event(&line), Ok(PanelEvent::KeyDown(Key::S3)));

    writer.write_all(&[0x01, b'\n']).unwrap();
    let line = read_line_within(&mut link, Duration::from_secs(1));
    assert_eq!(line, vec![0x32, 0x01, b'\n']);
}

#[test]
fn test_separate_tx_pipe_keeps_input_clean() {
    let dir = tempdir().unwrap();
    let rx_path = make_fifo(&dir, "rx");
    let tx_path = make_fifo(&dir, "tx");
    let config = FifoConfig {
        tx_path: Some(tx_path.clone()),
        ..FifoConfig::default()
    };
    let mut link = FifoLink::open(&rx_path, config).unwrap();
    let mut panel_in = open_peer(&tx_path, false);
    let mut panel_out = open_peer(&rx_path, true);

    link.write_all(&[0xE0, 0xE1, 0x03]).unwrap();
    let mut buf = [0u8; 8];
    let n = panel_in.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], &[0xE0, 0xE1, 0x03]);

    // Outbound bytes never show up on the inbound side
    panel_out.write_all(&[0x20, 0xC0, b'\n']).unwrap();
    let line = read_line_within(&mut link, Duration::from_secs(1));
    assert_eq!(line, vec![0x20, 0xC0, b'\n']);
}

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ctor::ctor;
use nesium_bsv::{
    ContentIdentity, MovieSettings, Notification, NotificationSink, SerializeError,
    SettingsStore, SnapshotPort, StreamOpener,
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Frontend double: a machine whose whole state is `state`, plus the message
/// queue and settings the controller talks to.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub state: Vec<u8>,
    pub crc: u32,
    pub settings: MovieSettings,
    pub notifications: Vec<Notification>,
    pub restored: Vec<Vec<u8>>,
    /// Makes `unserialize` fail, like a core handed a corrupt state.
    pub reject_snapshots: bool,
}

impl FakeHost {
    pub fn new(state: &[u8], crc: u32) -> Self {
        Self {
            state: state.to_vec(),
            crc,
            settings: MovieSettings {
                state_slot: 0,
                rewind_granularity: 4,
            },
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.notifications
            .iter()
            .map(|n| n.message.as_str())
            .collect()
    }
}

impl SnapshotPort for FakeHost {
    fn serialize_size(&self) -> usize {
        self.state.len()
    }

    fn serialize(&mut self, dst: &mut [u8]) -> Result<usize, SerializeError> {
        if dst.len() < self.state.len() {
            return Err(SerializeError::BufferTooSmall {
                required: self.state.len(),
            });
        }
        dst[..self.state.len()].copy_from_slice(&self.state);
        Ok(self.state.len())
    }

    fn unserialize(&mut self, src: &[u8]) -> Result<(), SerializeError> {
        if self.reject_snapshots {
            return Err(SerializeError::Message("corrupt state".into()));
        }
        self.state = src.to_vec();
        self.restored.push(src.to_vec());
        Ok(())
    }
}

impl ContentIdentity for FakeHost {
    fn content_crc(&self) -> u32 {
        self.crc
    }
}

impl NotificationSink for FakeHost {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

impl SettingsStore for FakeHost {
    fn state_slot(&self) -> i32 {
        self.settings.state_slot
    }

    fn set_rewind_granularity(&mut self, granularity: u32) {
        self.settings.set_rewind_granularity(granularity);
    }
}

/// In-memory file whose bytes stay visible to the test after the session
/// holding it has been closed.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
    position: u64,
}

impl SharedBuffer {
    pub fn new(bytes: Rc<RefCell<Vec<u8>>>) -> Self {
        Self { bytes, position: 0 }
    }
}

impl Read for SharedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.bytes.borrow();
        let start = (self.position as usize).min(bytes.len());
        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.borrow_mut();
        let start = self.position as usize;
        let end = start + buf.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SharedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.bytes.borrow().len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.position as i64 + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

/// Path-keyed in-memory filesystem.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    files: HashMap<PathBuf, Rc<RefCell<Vec<u8>>>>,
}

impl MemoryOpener {
    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(path.into(), Rc::new(RefCell::new(bytes)));
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.get(path.as_ref()).map(|b| b.borrow().clone())
    }
}

impl StreamOpener for MemoryOpener {
    type Stream = SharedBuffer;

    fn open_read(&mut self, path: &Path) -> io::Result<SharedBuffer> {
        self.files
            .get(path)
            .cloned()
            .map(SharedBuffer::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such movie"))
    }

    fn open_write(&mut self, path: &Path) -> io::Result<SharedBuffer> {
        let bytes = Rc::new(RefCell::new(Vec::new()));
        self.files.insert(path.to_path_buf(), Rc::clone(&bytes));
        Ok(SharedBuffer::new(bytes))
    }
}

/// Opener for a read-only medium: every open is refused.
#[derive(Debug, Default)]
pub struct ReadOnlyOpener;

impl StreamOpener for ReadOnlyOpener {
    type Stream = SharedBuffer;

    fn open_read(&mut self, _path: &Path) -> io::Result<SharedBuffer> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such movie"))
    }

    fn open_write(&mut self, _path: &Path) -> io::Result<SharedBuffer> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        ))
    }
}

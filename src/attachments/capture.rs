//! Audio capture providers. The manager only needs "open a session" and
//! "stop it and hand me the bytes"; the encoding is the provider's business.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("device busy")]
    Busy,
    #[error("no input: {0}")]
    NotFound(String),
    #[error("device lost: {0}")]
    Lost(String),
}

/// An open recording. Dropping a session releases the device, so every
/// exit path gives the microphone back.
pub trait CaptureSession {
    fn stop(self: Box<Self>) -> Result<Vec<u8>, DeviceError>;
}

pub trait AudioCaptureProvider {
    fn request_session(&mut self) -> Result<Box<dyn CaptureSession>, DeviceError>;
}

/// Provider for hosts that only manage stored notes. Every request is
/// refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl AudioCaptureProvider for NoCapture {
    fn request_session(&mut self) -> Result<Box<dyn CaptureSession>, DeviceError> {
        Err(DeviceError::NotFound("no capture device".into()))
    }
}

/// Imports an already recorded audio file as the captured note.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioCaptureProvider for FileCapture {
    fn request_session(&mut self) -> Result<Box<dyn CaptureSession>, DeviceError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(Box::new(FileSession {
                path: self.path.clone(),
            })),
            Ok(_) => Err(DeviceError::NotFound(format!(
                "{} is not a file",
                self.path.display()
            ))),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(DeviceError::PermissionDenied),
            Err(e) => Err(DeviceError::NotFound(format!("{}: {}", self.path.display(), e))),
        }
    }
}

struct FileSession {
    path: PathBuf,
}

impl CaptureSession for FileSession {
    fn stop(self: Box<Self>) -> Result<Vec<u8>, DeviceError> {
        std::fs::read(&self.path)
            .map_err(|e| DeviceError::Lost(format!("{}: {}", self.path.display(), e)))
    }
}

/// What the next requested session does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Record(Vec<u8>),
    Deny(DeviceError),
    FailOnStop(DeviceError),
}

/// Provider that plays back a queue of scripted outcomes and counts how many
/// sessions are currently holding the device.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCapture {
    script: VecDeque<Script>,
    open: Arc<AtomicUsize>,
}

impl ScriptedCapture {
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: script.into_iter().collect(),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared view of the open-session count, still readable after the
    /// provider has moved into a manager.
    pub fn open_sessions(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.open)
    }
}

impl AudioCaptureProvider for ScriptedCapture {
    fn request_session(&mut self) -> Result<Box<dyn CaptureSession>, DeviceError> {
        let outcome = match self.script.pop_front() {
            Some(Script::Deny(e)) => return Err(e),
            Some(Script::Record(bytes)) => Ok(bytes),
            Some(Script::FailOnStop(e)) => Err(e),
            None => Ok(Vec::new()),
        };
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            outcome,
            open: Arc::clone(&self.open),
        }))
    }
}

struct ScriptedSession {
    outcome: Result<Vec<u8>, DeviceError>,
    open: Arc<AtomicUsize>,
}

impl CaptureSession for ScriptedSession {
    fn stop(mut self: Box<Self>) -> Result<Vec<u8>, DeviceError> {
        std::mem::replace(&mut self.outcome, Ok(Vec::new()))
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_capture_reads_the_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFF....WAVE").unwrap();
        let mut provider = FileCapture::new(file.path());
        let session = provider.request_session().unwrap();
        assert_eq!(session.stop().unwrap(), b"RIFF....WAVE".to_vec());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = FileCapture::new(dir.path().join("nope.ogg"));
        assert!(matches!(
            provider.request_session().err(),
            Some(DeviceError::NotFound(_))
        ));
        let mut provider = FileCapture::new(dir.path());
        assert!(matches!(
            provider.request_session().err(),
            Some(DeviceError::NotFound(_))
        ));
    }

    #[test]
    fn scripted_sessions_release_on_drop() {
        let mut provider = ScriptedCapture::new([Script::Record(vec![1, 2])]);
        let open = provider.open_sessions();
        let session = provider.request_session().unwrap();
        assert_eq!(open.load(Ordering::SeqCst), 1);
        assert_eq!(session.stop().unwrap(), vec![1, 2]);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_capture_refuses_every_session() {
        let mut provider = NoCapture;
        assert!(matches!(
            provider.request_session().err(),
            Some(DeviceError::NotFound(_))
        ));
    }
}

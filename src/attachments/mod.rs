pub mod capture;
pub mod manager;

pub use capture::{
    AudioCaptureProvider, CaptureSession, DeviceError, FileCapture, NoCapture, Script,
    ScriptedCapture,
};
pub use manager::AttachmentManager;

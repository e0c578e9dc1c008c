use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;

use crate::attachments::capture::{AudioCaptureProvider, CaptureSession};
use crate::error::{Result, TrackerError};
use crate::models::{AttachmentId, PlaybackHandle, PrayerName, VoiceAttachment};

struct ActiveCapture {
    date: NaiveDate,
    prayer: PrayerName,
    session: Box<dyn CaptureSession>,
}

/// Owns voice-note recording and the stored audio.
///
/// At most one capture session is open at a time, enforced here rather than
/// trusted to the device layer. The session is taken out of the manager
/// before it is stopped, so the device is released whether stopping
/// succeeds, yields nothing, or fails.
pub struct AttachmentManager<P: AudioCaptureProvider> {
    provider: P,
    active: Option<ActiveCapture>,
    notes: HashMap<AttachmentId, VoiceAttachment>,
    playback: HashMap<PlaybackHandle, AttachmentId>,
    next_handle: u64,
    max_bytes: usize,
}

impl<P: AudioCaptureProvider> AttachmentManager<P> {
    pub fn new(provider: P, max_bytes: usize) -> Self {
        Self {
            provider,
            active: None,
            notes: HashMap::new(),
            playback: HashMap::new(),
            next_handle: 1,
            max_bytes,
        }
    }

    pub fn begin_capture(&mut self, prayer: PrayerName, date: NaiveDate) -> Result<()> {
        if self.active.is_some() {
            warn!("capture for {} on {} refused: session already open", prayer, date);
            return Err(TrackerError::CaptureBusy);
        }
        let session = self
            .provider
            .request_session()
            .map_err(|e| TrackerError::CaptureUnavailable(e.to_string()))?;
        self.active = Some(ActiveCapture {
            date,
            prayer,
            session,
        });
        info!("recording voice note for {} on {}", prayer, date);
        Ok(())
    }

    /// Finalize the open session into a stored, immutable attachment.
    pub fn end_capture(&mut self) -> Result<VoiceAttachment> {
        let ActiveCapture {
            date,
            prayer,
            session,
        } = self.active.take().ok_or(TrackerError::NoActiveCapture)?;

        let audio = session
            .stop()
            .map_err(|e| TrackerError::CaptureFailed(e.to_string()))?;
        if audio.is_empty() {
            return Err(TrackerError::EmptyCapture);
        }
        if audio.len() > self.max_bytes {
            return Err(TrackerError::CaptureFailed(format!(
                "note is {} bytes, limit is {}",
                audio.len(),
                self.max_bytes
            )));
        }

        let attachment = self.store(AttachmentId::new(), date, prayer, audio, Utc::now());
        info!(
            "voice note {} saved for {} on {} ({} bytes)",
            attachment.id,
            prayer,
            date,
            attachment.len()
        );
        Ok(attachment)
    }

    /// Abandon the open session, if any, without keeping its audio.
    pub fn cancel_capture(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                debug!("capture for {} on {} cancelled", active.prayer, active.date);
                true
            }
            None => false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_target(&self) -> Option<(NaiveDate, PrayerName)> {
        self.active.as_ref().map(|a| (a.date, a.prayer))
    }

    /// Register audio that was captured in an earlier session.
    pub fn adopt(
        &mut self,
        id: AttachmentId,
        date: NaiveDate,
        prayer: PrayerName,
        audio: Vec<u8>,
        captured_at: DateTime<Utc>,
    ) -> VoiceAttachment {
        self.store(id, date, prayer, audio, captured_at)
    }

    pub fn get(&self, id: AttachmentId) -> Option<&VoiceAttachment> {
        self.notes.get(&id)
    }

    /// Release stored audio and every playback handle for it. Discarding an
    /// unknown or already discarded note does nothing.
    pub fn discard(&mut self, id: AttachmentId) -> bool {
        self.playback.retain(|_, owner| *owner != id);
        let removed = self.notes.remove(&id).is_some();
        if removed {
            debug!("voice note {} discarded", id);
        }
        removed
    }

    pub fn is_playable(&self, handle: PlaybackHandle) -> bool {
        self.playback.contains_key(&handle)
    }

    /// Let a playback handle expire; the audio stays stored.
    pub fn release_playback(&mut self, handle: PlaybackHandle) {
        self.playback.remove(&handle);
    }

    /// Expire every playback handle of a note while keeping its audio.
    /// Returns how many handles were released.
    pub fn release_note(&mut self, id: AttachmentId) -> usize {
        let before = self.playback.len();
        self.playback.retain(|_, owner| *owner != id);
        let released = before - self.playback.len();
        if released > 0 {
            debug!("voice note {}: {} playback handle(s) released", id, released);
        }
        released
    }

    /// Issue a fresh playback handle for stored audio.
    pub fn open_playback(&mut self, id: AttachmentId) -> Option<PlaybackHandle> {
        if !self.notes.contains_key(&id) {
            return None;
        }
        Some(self.issue_handle(id))
    }

    fn store(
        &mut self,
        id: AttachmentId,
        date: NaiveDate,
        prayer: PrayerName,
        audio: Vec<u8>,
        captured_at: DateTime<Utc>,
    ) -> VoiceAttachment {
        let playback = self.issue_handle(id);
        let attachment = VoiceAttachment {
            id,
            date,
            prayer,
            audio,
            captured_at,
            playback,
        };
        self.notes.insert(id, attachment.clone());
        attachment
    }

    fn issue_handle(&mut self, id: AttachmentId) -> PlaybackHandle {
        let handle = PlaybackHandle(self.next_handle);
        self.next_handle += 1;
        self.playback.insert(handle, id);
        handle
    }
}

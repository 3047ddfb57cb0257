use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Sender;

use super::{AudioMessage, Mixer, MusicCommand, MusicCommandKind, OggDecoder, StreamingSource};

/// Opens sound files into sources ready for the mixer.
pub trait SourceOpener: Send + Sync {
    fn open(&self, path: &Path, looping: bool) -> Result<StreamingSource>;
}

impl<F> SourceOpener for F
where
    F: Fn(&Path, bool) -> Result<StreamingSource> + Send + Sync,
{
    fn open(&self, path: &Path, looping: bool) -> Result<StreamingSource> {
        self(path, looping)
    }
}

/// Opens Ogg/Vorbis files through symphonia.
#[derive(Debug, Default, Copy, Clone)]
pub struct OggOpener;

impl SourceOpener for OggOpener {
    fn open(&self, path: &Path, looping: bool) -> Result<StreamingSource> {
        let decoder = OggDecoder::open(path)?;
        Ok(StreamingSource::new(path.display().to_string(), Box::new(decoder), looping))
    }
}

/// Options for the music calls that open a new track.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MusicOptions {
    pub looping: bool,
    /// Fade the audible track out before switching.
    pub fade_current: bool,
    /// Fade the new track in after switching.
    pub fade_next: bool,
}

impl Default for MusicOptions {
    fn default() -> Self {
        Self {
            looping: false,
            fade_current: true,
            fade_next: false,
        }
    }
}

impl MusicOptions {
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn fades(mut self, fade_current: bool, fade_next: bool) -> Self {
        self.fade_current = fade_current;
        self.fade_next = fade_next;
        self
    }
}

/// Producer side of the mixer, used from the game thread.
///
/// Files are opened and decoding starts here, off the audio thread; the
/// mixer only receives ready sources. Once the mixer is gone, requests are
/// dropped.
#[derive(Clone)]
pub struct AudioHandle {
    tx: Sender<AudioMessage>,
    opener: Arc<dyn SourceOpener>,
}

/// Creates a connected handle and mixer.
pub fn channel(opener: impl SourceOpener + 'static) -> (AudioHandle, Mixer) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = AudioHandle {
        tx,
        opener: Arc::new(opener),
    };
    (handle, Mixer::new(rx))
}

impl AudioHandle {
    /// Replaces the main track and clears the music stack.
    pub fn play_music(&self, path: impl AsRef<Path>, options: MusicOptions) -> Result<()> {
        self.music_with_source(MusicCommandKind::Play, path.as_ref(), options)
    }

    /// Replaces the main track. When a pushed track is audible the stack is left alone.
    pub fn set_main_music(&self, path: impl AsRef<Path>, options: MusicOptions) -> Result<()> {
        self.music_with_source(MusicCommandKind::SetMain, path.as_ref(), options)
    }

    /// Plays a track over the current one.
    pub fn push_music(&self, path: impl AsRef<Path>, options: MusicOptions) -> Result<()> {
        self.music_with_source(MusicCommandKind::Push, path.as_ref(), options)
    }

    /// Returns to the track underneath the pushed one.
    pub fn pop_music(&self, fade_current: bool, fade_next: bool) {
        self.send(AudioMessage::Music(MusicCommand {
            kind: MusicCommandKind::Pop,
            source: None,
            fade_current,
            fade_next,
        }));
    }

    pub fn stop_music(&self, fade_out: bool) {
        self.send(AudioMessage::Music(MusicCommand {
            kind: MusicCommandKind::Stop,
            source: None,
            fade_current: fade_out,
            fade_next: false,
        }));
    }

    /// Plays a one-shot effect at full volume.
    pub fn play_sfx(&self, path: impl AsRef<Path>) -> Result<()> {
        let source = self.opener.open(path.as_ref(), false)?;
        self.send(AudioMessage::Sfx(source));
        Ok(())
    }

    fn music_with_source(&self, kind: MusicCommandKind, path: &Path, options: MusicOptions) -> Result<()> {
        let source = self.opener.open(path, options.looping)?;
        self.send(AudioMessage::Music(MusicCommand {
            kind,
            source: Some(source),
            fade_current: options.fade_current,
            fade_next: options.fade_next,
        }));
        Ok(())
    }

    fn send(&self, msg: AudioMessage) {
        if self.tx.send(msg).is_err() {
            log::trace!("audio request dropped: mixer is gone");
        }
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle").finish_non_exhaustive()
    }
}

use std::collections::VecDeque;

use crossbeam_channel::Receiver;

use super::{BUFFER_SAMPLES, FADE_STEP, StreamingSource};

// Fades accumulate 0.05 steps in f32; snap when within this of the target.
const FADE_EPSILON: f32 = 1e-4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MusicCommandKind {
    /// Replace the main track and clear the stack.
    Play,
    /// Replace the main track only.
    SetMain,
    /// Play over the current track, keeping it underneath.
    Push,
    /// Return to the track underneath the current one.
    Pop,
    /// Silence everything.
    Stop,
}

/// One queued music transition.
#[derive(Debug)]
pub struct MusicCommand {
    pub kind: MusicCommandKind,
    pub source: Option<StreamingSource>,
    pub fade_current: bool,
    pub fade_next: bool,
}

/// Producer to mixer messages.
#[derive(Debug)]
pub enum AudioMessage {
    Music(MusicCommand),
    Sfx(StreamingSource),
}

/// Music stack, command queue and effect pool, driven once per output buffer.
///
/// Only the audio thread touches this state; producers talk to it through the
/// channel drained at the top of every `mix`.
pub struct Mixer {
    rx: Receiver<AudioMessage>,
    commands: VecDeque<MusicCommand>,
    main: Option<StreamingSource>,
    stack: Vec<StreamingSource>,
    sfx: Vec<StreamingSource>,
}

impl Mixer {
    pub(crate) fn new(rx: Receiver<AudioMessage>) -> Self {
        Self {
            rx,
            commands: VecDeque::new(),
            main: None,
            stack: Vec::new(),
            sfx: Vec::new(),
        }
    }

    /// Produces one buffer of interleaved stereo samples.
    pub fn mix(&mut self, out: &mut [i16]) {
        debug_assert_eq!(out.len(), BUFFER_SAMPLES);
        out.fill(0);
        self.drain_messages();

        let on_stack = !self.stack.is_empty();
        let mut command_ready = !self.commands.is_empty();
        let mut playing = false;
        let has_song = self.current().is_some();

        if let Some(song) = self.current_mut() {
            playing = song.stream();
            if playing {
                if song.fade_in {
                    song.volume += FADE_STEP;
                    if song.volume >= 1.0 - FADE_EPSILON {
                        song.volume = 1.0;
                        song.fade_in = false;
                    } else {
                        // A fade-in always completes before the next transition.
                        command_ready = false;
                    }
                }
                mix_into(out, song.buffer(), song.volume);
            }
        }

        if command_ready {
            self.step_command(playing, on_stack);
        } else if self.commands.is_empty() && has_song && !playing {
            if on_stack {
                self.commands.push_back(MusicCommand {
                    kind: MusicCommandKind::Pop,
                    source: None,
                    fade_current: false,
                    fade_next: false,
                });
            } else if let Some(main) = self.main.take() {
                log::debug!("music finished: {}", main.name());
            }
        }

        self.sfx.retain_mut(|s| {
            if s.stream() {
                mix_into(out, s.buffer(), 1.0);
                true
            } else {
                false
            }
        });
    }

    fn drain_messages(&mut self) {
        for msg in self.rx.try_iter() {
            match msg {
                AudioMessage::Music(cmd) => self.commands.push_back(cmd),
                AudioMessage::Sfx(source) => self.sfx.push(source),
            }
        }
    }

    fn step_command(&mut self, mut playing: bool, on_stack: bool) {
        let Some(cmd) = self.commands.front() else {
            return;
        };

        if cmd.kind == MusicCommandKind::SetMain && on_stack {
            // The main track is buried; swap it without touching playback.
            if let Some(cmd) = self.commands.pop_front() {
                self.main = cmd.source;
            }
            return;
        }

        let reveals_main = cmd.kind == MusicCommandKind::Pop && !on_stack;
        let fade_out = cmd.fade_current && playing && !reveals_main;
        match self.current_mut() {
            Some(song) if fade_out && song.volume > 0.0 => {
                song.volume -= FADE_STEP;
                if song.volume <= FADE_EPSILON {
                    song.volume = 0.0;
                    playing = false;
                }
            }
            _ => playing = false,
        }
        if playing {
            return;
        }

        let Some(cmd) = self.commands.pop_front() else {
            return;
        };
        let check_fade = match cmd.kind {
            MusicCommandKind::Play => {
                self.stack.clear();
                self.main = cmd.source;
                true
            }
            MusicCommandKind::SetMain => {
                self.main = cmd.source;
                true
            }
            MusicCommandKind::Push => match cmd.source {
                Some(source) => {
                    self.stack.push(source);
                    true
                }
                None => false,
            },
            MusicCommandKind::Pop => self.stack.pop().is_some(),
            MusicCommandKind::Stop => {
                self.main = None;
                self.stack.clear();
                false
            }
        };

        if !check_fade {
            return;
        }
        if let Some(song) = self.current_mut() {
            if cmd.fade_next {
                song.fade_in = true;
                song.volume = 0.0;
            } else {
                song.volume = 1.0;
            }
        }
    }

    fn current(&self) -> Option<&StreamingSource> {
        self.stack.last().or(self.main.as_ref())
    }

    fn current_mut(&mut self) -> Option<&mut StreamingSource> {
        match self.stack.last_mut() {
            Some(top) => Some(top),
            None => self.main.as_mut(),
        }
    }

    // ── inspection ───────────────────────────────────────────────────────

    /// Name of the audible track.
    pub fn current_name(&self) -> Option<&str> {
        self.current().map(StreamingSource::name)
    }

    pub fn current_volume(&self) -> Option<f32> {
        self.current().map(StreamingSource::volume)
    }

    pub fn main_name(&self) -> Option<&str> {
        self.main.as_ref().map(StreamingSource::name)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn sfx_count(&self) -> usize {
        self.sfx.len()
    }

    /// Drops every source and pending command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.main = None;
        self.stack.clear();
        self.sfx.clear();
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("commands", &self.commands.len())
            .field("main", &self.main_name())
            .field("stack", &self.stack.len())
            .field("sfx", &self.sfx.len())
            .finish()
    }
}

/// Adds `src * volume` into `out`, saturating at the `i16` range.
pub fn mix_into(out: &mut [i16], src: &[i16], volume: f32) {
    for (o, &s) in out.iter_mut().zip(src) {
        *o = o.saturating_add((s as f32 * volume) as i16);
    }
}

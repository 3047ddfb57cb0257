use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision};
use symphonia::core::probe::Hint;

use super::{CHANNELS, LoopWindow, PcmDecoder, SAMPLE_RATE, parse_loop_tags};

/// Ogg/Vorbis stream decoded packet by packet.
///
/// Mono input is duplicated to both channels; channels past the second are
/// dropped. Loop points come from the `LOOPSTART`/`LOOPEND`/`LOOPLENGTH`
/// comments.
pub struct OggDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pending: VecDeque<i16>,
    /// Frames to drop after an accurate seek landed early.
    skip_frames: u64,
    window: LoopWindow,
}

impl OggDecoder {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening sound {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        let mut probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("{}: not a supported sound file", path.display()))?;

        let mut tags: Vec<(String, String)> = Vec::new();
        if let Some(rev) = probed.metadata.get().as_ref().and_then(|m| m.current()) {
            collect_tags(rev, &mut tags);
        }
        let mut format = probed.format;
        if let Some(rev) = format.metadata().current() {
            collect_tags(rev, &mut tags);
        }
        let window = parse_loop_tags(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("{}: no audio track", path.display()))?;
        let track_id = track.id;
        if let Some(rate) = track.codec_params.sample_rate.filter(|&r| r != SAMPLE_RATE) {
            log::warn!("{}: {rate} Hz stream played at {SAMPLE_RATE} Hz", path.display());
        }
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .with_context(|| format!("{}: unsupported codec", path.display()))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            pending: VecDeque::new(),
            skip_frames: 0,
            window,
        })
    }

    /// Decodes the next packet of our track into `pending`. `false` at end of stream.
    fn decode_packet(&mut self) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut samples = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            samples.copy_interleaved_ref(decoded);

            for frame in samples.samples().chunks_exact(channels) {
                if self.skip_frames > 0 {
                    self.skip_frames -= 1;
                    continue;
                }
                let left = frame[0];
                let right = if channels > 1 { frame[1] } else { left };
                self.pending.extend([left, right]);
            }
            return Ok(true);
        }
    }
}

fn collect_tags(rev: &MetadataRevision, out: &mut Vec<(String, String)>) {
    out.extend(rev.tags().iter().map(|t| (t.key.clone(), t.value.to_string())));
}

impl PcmDecoder for OggDecoder {
    fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        let want = out.len() / CHANNELS * CHANNELS;
        let mut written = 0;
        while written < want {
            if self.pending.is_empty() && !self.decode_packet()? {
                break;
            }
            let n = (want - written).min(self.pending.len());
            for (dst, src) in out[written..written + n].iter_mut().zip(self.pending.drain(..n)) {
                *dst = src;
            }
            written += n;
        }
        Ok(written)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let seeked = self
            .format
            .seek(SeekMode::Accurate, SeekTo::TimeStamp { ts: frame, track_id: self.track_id })
            .context("seeking sound stream")?;
        self.decoder.reset();
        self.pending.clear();
        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        Ok(())
    }

    fn loop_window(&self) -> LoopWindow {
        self.window
    }
}

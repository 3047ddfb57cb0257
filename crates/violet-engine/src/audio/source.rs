use super::{BUFFER_SAMPLES, CHANNELS, LoopWindow, PcmDecoder};

/// A decoder plus the per-source playback state the mixer drives.
///
/// Each `stream` call refills one mixer buffer. Looping sources wrap back to
/// the loop start when the loop end (or the end of stream) is reached and keep
/// filling from there.
pub struct StreamingSource {
    name: String,
    decoder: Box<dyn PcmDecoder>,
    buffer: Vec<i16>,
    cursor: u64,
    window: LoopWindow,
    looping: bool,
    pub(crate) fade_in: bool,
    pub(crate) volume: f32,
}

impl StreamingSource {
    pub fn new(name: impl Into<String>, decoder: Box<dyn PcmDecoder>, looping: bool) -> Self {
        let window = decoder.loop_window();
        let name = name.into();
        log::debug!("sound opened: {name} (loop = {looping})");
        Self {
            name,
            decoder,
            buffer: vec![0; BUFFER_SAMPLES],
            cursor: 0,
            window,
            looping,
            fade_in: false,
            volume: 1.0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    #[inline]
    pub fn is_fading_in(&self) -> bool {
        self.fade_in
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[inline]
    pub fn loop_window(&self) -> LoopWindow {
        self.window
    }

    /// Read position in frames.
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Samples produced by the last `stream` call.
    #[inline]
    pub fn buffer(&self) -> &[i16] {
        &self.buffer
    }

    /// Refills the buffer. Returns `false` once the source is finished: end of
    /// stream without looping, or a decode error.
    pub fn stream(&mut self) -> bool {
        let mut filled = 0;
        let mut empty_reads = 0;

        while filled < BUFFER_SAMPLES {
            let mut want = BUFFER_SAMPLES - filled;
            if let (true, Some(end)) = (self.looping, self.window.end) {
                let left = end.saturating_sub(self.cursor) as usize * CHANNELS;
                want = want.min(left);
            }

            let read = if want == 0 {
                0
            } else {
                match self.decoder.read(&mut self.buffer[filled..filled + want]) {
                    Ok(n) => n,
                    Err(e) => {
                        log::debug!("sound {}: decode failed: {e:#}", self.name);
                        return false;
                    }
                }
            };
            filled += read;
            self.cursor += (read / CHANNELS) as u64;

            let at_loop_end = self.window.end.is_some_and(|end| self.cursor >= end);
            if self.looping && (read == 0 || at_loop_end) {
                // Two empty reads in a row: nothing left to loop over.
                empty_reads = if read == 0 { empty_reads + 1 } else { 0 };
                if empty_reads > 1 {
                    log::debug!("sound {}: empty loop window", self.name);
                    return false;
                }
                if let Err(e) = self.decoder.seek(self.window.start) {
                    log::debug!("sound {}: loop seek failed: {e:#}", self.name);
                    return false;
                }
                self.cursor = self.window.start;
            } else if read == 0 {
                return false;
            } else {
                empty_reads = 0;
            }
        }

        true
    }
}

impl Drop for StreamingSource {
    fn drop(&mut self) {
        log::debug!("sound released: {}", self.name);
    }
}

impl std::fmt::Debug for StreamingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSource")
            .field("name", &self.name)
            .field("cursor", &self.cursor)
            .field("window", &self.window)
            .field("looping", &self.looping)
            .field("fade_in", &self.fade_in)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BUFFER_FRAMES, MemoryDecoder};
    use anyhow::{Result, bail};

    fn frames(buf: &[i16]) -> Vec<i16> {
        buf.chunks_exact(CHANNELS).map(|f| f[0]).collect()
    }

    // ── one-shot ─────────────────────────────────────────────────────────

    #[test]
    fn plays_through_then_ends() {
        let mut s = StreamingSource::new("ramp", Box::new(MemoryDecoder::ramp(BUFFER_FRAMES + 10)), false);
        assert!(s.stream());
        assert_eq!(frames(s.buffer())[BUFFER_FRAMES - 1], (BUFFER_FRAMES - 1) as i16);
        assert!(!s.stream());
    }

    #[test]
    fn loop_tags_are_ignored_without_looping() {
        let d = MemoryDecoder::ramp(3000).with_loop_window(LoopWindow { start: 0, end: Some(100) });
        let mut s = StreamingSource::new("ramp", Box::new(d), false);
        assert!(s.stream());
        assert_eq!(s.cursor(), BUFFER_FRAMES as u64);
    }

    // ── looping ──────────────────────────────────────────────────────────

    #[test]
    fn wraps_inside_window() {
        let d = MemoryDecoder::ramp(6000).with_loop_window(LoopWindow { start: 1000, end: Some(5000) });
        let mut s = StreamingSource::new("ramp", Box::new(d), true);

        let mut seen = Vec::new();
        for _ in 0..12 {
            assert!(s.stream());
            seen.extend(frames(s.buffer()));
        }
        assert!(seen.iter().all(|&f| f < 5000));
        // Frame 4999 is followed directly by frame 1000.
        let wrap = seen.iter().position(|&f| f == 4999).unwrap();
        assert_eq!(seen[wrap + 1], 1000);
    }

    #[test]
    fn wraps_at_end_of_stream_without_window() {
        let mut s = StreamingSource::new("ramp", Box::new(MemoryDecoder::ramp(1500)), true);
        assert!(s.stream());
        assert!(s.stream());
        let f = frames(s.buffer());
        assert_eq!(f[1500 - BUFFER_FRAMES - 1], 1499);
        assert_eq!(f[1500 - BUFFER_FRAMES], 0);
    }

    #[test]
    fn empty_stream_stops_looping() {
        let mut s = StreamingSource::new("empty", Box::new(MemoryDecoder::new(Vec::new())), true);
        assert!(!s.stream());
    }

    // ── errors ───────────────────────────────────────────────────────────

    struct Failing;

    impl PcmDecoder for Failing {
        fn read(&mut self, _out: &mut [i16]) -> Result<usize> {
            bail!("corrupt packet")
        }

        fn seek(&mut self, _frame: u64) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn decode_error_is_end_of_stream() {
        let mut s = StreamingSource::new("bad", Box::new(Failing), true);
        assert!(!s.stream());
    }
}

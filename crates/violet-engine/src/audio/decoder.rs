use anyhow::Result;

use super::CHANNELS;

/// Loop window in frames. `end == None` loops at end of stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LoopWindow {
    pub start: u64,
    pub end: Option<u64>,
}

/// Reads `LOOPSTART`, `LOOPEND` and `LOOPLENGTH` stream comments.
///
/// Values that do not parse count as 0. `LOOPLENGTH` only applies when no
/// `LOOPEND` was given.
pub fn parse_loop_tags<'a, I>(tags: I) -> LoopWindow
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut start = 0u64;
    let mut end = 0u64;
    let mut length = 0u64;
    for (key, value) in tags {
        let value = value.trim().parse::<u64>().unwrap_or(0);
        match key.trim().to_ascii_uppercase().as_str() {
            "LOOPSTART" => start = value,
            "LOOPEND" => end = value,
            "LOOPLENGTH" => length = value,
            _ => {}
        }
    }
    if length > 0 && end == 0 {
        end = start + length;
    }
    LoopWindow {
        start,
        end: (end > 0).then_some(end),
    }
}

/// Streaming PCM source: interleaved stereo `i16` at 44.1 kHz.
pub trait PcmDecoder: Send {
    /// Fills `out` from the current position. Returns the number of samples
    /// written (a multiple of the channel count); 0 means end of stream.
    fn read(&mut self, out: &mut [i16]) -> Result<usize>;

    /// Moves the read position to `frame`.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Loop metadata found in the stream, if any.
    fn loop_window(&self) -> LoopWindow {
        LoopWindow::default()
    }
}

/// Decoder over samples already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDecoder {
    samples: Vec<i16>,
    position: usize,
    window: LoopWindow,
}

impl MemoryDecoder {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            position: 0,
            window: LoopWindow::default(),
        }
    }

    /// `frames` stereo frames where both channels hold the frame index.
    pub fn ramp(frames: usize) -> Self {
        let samples = (0..frames)
            .flat_map(|f| {
                let v = (f % 32768) as i16;
                [v; CHANNELS]
            })
            .collect();
        Self::new(samples)
    }

    pub fn with_loop_window(mut self, window: LoopWindow) -> Self {
        self.window = window;
        self
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }
}

impl PcmDecoder for MemoryDecoder {
    fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        let n = (out.len() / CHANNELS * CHANNELS).min(self.samples.len() - self.position);
        out[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        self.position = (frame as usize * CHANNELS).min(self.samples.len());
        Ok(())
    }

    fn loop_window(&self) -> LoopWindow {
        self.window
    }
}

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use super::{BUFFER_FRAMES, BUFFER_SAMPLES, CHANNELS, Mixer, SAMPLE_RATE};

/// Pulls fixed-size mixer buffers and spreads them over device callbacks of
/// any length, channel count and rate.
///
/// Frames left over from one callback are played at the start of the next.
/// Rate conversion picks the nearest earlier frame.
pub struct MixerPump {
    mixer: Mixer,
    buffer: Vec<i16>,
    scratch: Vec<f32>,
    position: f64,
    step: f64,
}

impl MixerPump {
    pub fn new(mixer: Mixer, device_rate: u32) -> Self {
        let step = if device_rate == 0 {
            1.0
        } else {
            SAMPLE_RATE as f64 / device_rate as f64
        };
        Self {
            mixer,
            buffer: vec![0; BUFFER_SAMPLES],
            scratch: Vec::new(),
            // Forces a mix on the first frame.
            position: BUFFER_FRAMES as f64,
            step,
        }
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Fills an interleaved `f32` device buffer with `channels` channels.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            while self.position >= BUFFER_FRAMES as f64 {
                self.mixer.mix(&mut self.buffer);
                self.position -= BUFFER_FRAMES as f64;
            }
            let i = self.position as usize * CHANNELS;
            let left = self.buffer[i] as f32 / 32768.0;
            let right = self.buffer[i + 1] as f32 / 32768.0;

            match frame {
                [mono] => *mono = (left + right) * 0.5,
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
            self.position += self.step;
        }
    }

    /// `fill` for integer device formats. Mixes into an `f32` scratch buffer
    /// and converts with cpal's sample conversions.
    pub fn fill_as<T: FromSample<f32>>(&mut self, out: &mut [T], channels: usize) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(out.len(), 0.0);
        self.fill(&mut scratch, channels);
        for (o, &s) in out.iter_mut().zip(&scratch) {
            *o = T::from_sample_(s);
        }
        self.scratch = scratch;
    }
}

/// The default output device playing a mixer.
///
/// Dropping it stops the stream and releases the mixer with every source.
pub struct AudioOutput {
    _stream: cpal::Stream,
}

impl AudioOutput {
    pub fn start(mixer: Mixer) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default audio output device"))?;
        let supported = device
            .default_output_config()
            .context("querying default audio output config")?;
        let format = supported.sample_format();

        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let rate: u32 = config.sample_rate;
        let pump = MixerPump::new(mixer, rate);

        let stream = match format {
            cpal::SampleFormat::F32 => open_stream::<f32>(&device, &config, pump)?,
            cpal::SampleFormat::I16 => open_stream::<i16>(&device, &config, pump)?,
            cpal::SampleFormat::U16 => open_stream::<u16>(&device, &config, pump)?,
            other => bail!("unsupported audio sample format: {other}"),
        };
        stream.play().context("starting audio output stream")?;

        log::info!("audio output: {channels} channels at {rate} Hz, {format}");
        Ok(Self { _stream: stream })
    }
}

fn open_stream<T>(device: &cpal::Device, config: &cpal::StreamConfig, mut pump: MixerPump) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| pump.fill_as(out, channels),
            |err| log::error!("audio stream error: {err}"),
            None,
        )
        .context("building audio output stream")
}

//! In-memory PCM audio buffers.
//!
//! [`AudioBuffer`] is the audio capability the synthesizer is built on: WAV
//! decode/encode through [`hound`], duration, resampling, concatenation, gain
//! and chunked time-compression. Samples are held interleaved as `f32` in
//! `[-1.0, 1.0]`; the stored sample width and format are only used when the
//! buffer is written back to disk.

use std::path::Path;

use hound::{SampleFormat, WavSpec};
use rubato::{FftFixedIn, Resampler};

/// Frame rate of the handheld playback engine.
pub const DEVICE_SAMPLE_RATE: u32 = 22_050;

/// Sample width of the handheld playback engine (unsigned 8-bit PCM on disk).
pub const DEVICE_BITS_PER_SAMPLE: u16 = 8;

/// Input frames per resampler block.
const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported sample width: {0} bits")]
    UnsupportedWidth(u16),
    #[error("Failed to create resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),
    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("Speed factor must be at least 1.0, got {0}")]
    InvalidSpeed(f32),
    #[error(
        "Audio too short ({duration_secs:.3}s) to speed up {factor:.1}x with {chunk_ms}ms chunks"
    )]
    TooShort {
        duration_secs: f64,
        factor: f32,
        chunk_ms: u32,
    },
}

/// A decoded, uncompressed audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    sample_format: SampleFormat,
}

impl AudioBuffer {
    /// Wrap interleaved samples as 16-bit integer PCM.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Mono 16-bit silence of the given length.
    pub fn silent(duration_ms: u32, sample_rate: u32) -> Self {
        let frames = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::from_samples(vec![0.0; frames], sample_rate, 1)
    }

    /// Decode a WAV file.
    pub fn decode_wav(path: &Path) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let scale = int_scale(spec.bits_per_sample)?;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| (v as f64 / scale) as f32))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format,
        })
    }

    /// Write the buffer as a WAV file, replacing any existing file.
    pub fn export_wav(&self, path: &Path) -> Result<(), AudioError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: self.sample_format,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;

        match (self.sample_format, self.bits_per_sample) {
            (SampleFormat::Float, _) => {
                for &sample in &self.samples {
                    writer.write_sample(sample)?;
                }
            }
            // hound stores 8-bit PCM unsigned on disk; the API takes i8.
            (SampleFormat::Int, 8) => {
                for &sample in &self.samples {
                    writer.write_sample(quantize(sample, 8) as i8)?;
                }
            }
            (SampleFormat::Int, 16) => {
                for &sample in &self.samples {
                    writer.write_sample(quantize(sample, 16) as i16)?;
                }
            }
            (SampleFormat::Int, bits @ (24 | 32)) => {
                for &sample in &self.samples {
                    writer.write_sample(quantize(sample, bits))?;
                }
            }
            (SampleFormat::Int, bits) => return Err(AudioError::UnsupportedWidth(bits)),
        }

        writer.finalize()?;
        Ok(())
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Convert to integer PCM of `bits_per_sample` at `sample_rate`.
    pub fn resample(&self, bits_per_sample: u16, sample_rate: u32) -> Result<Self, AudioError> {
        self.clone()
            .with_frame_rate(sample_rate)?
            .with_sample_width(bits_per_sample)
    }

    /// Requantize to integer PCM of the given width.
    pub fn with_sample_width(mut self, bits_per_sample: u16) -> Result<Self, AudioError> {
        let scale = int_scale(bits_per_sample)?;
        if self.sample_format != SampleFormat::Int || self.bits_per_sample != bits_per_sample {
            for sample in &mut self.samples {
                *sample = (quantize(*sample, bits_per_sample) as f64 / scale) as f32;
            }
        }
        self.bits_per_sample = bits_per_sample;
        self.sample_format = SampleFormat::Int;
        Ok(self)
    }

    /// Band-limited frame rate conversion.
    ///
    /// The output holds `frames * sample_rate / self.sample_rate` frames,
    /// aligned with the input (the resampler's delay is trimmed).
    pub fn with_frame_rate(mut self, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == self.sample_rate || self.samples.is_empty() {
            self.sample_rate = sample_rate;
            return Ok(self);
        }

        let channels = self.channels as usize;
        let planar: Vec<Vec<f32>> = (0..channels)
            .map(|c| self.samples.iter().skip(c).step_by(channels).copied().collect())
            .collect();
        let resampled = resample_planar(&planar, self.sample_rate, sample_rate)?;

        let frames = resampled.first().map_or(0, Vec::len);
        let mut out = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            out.extend(resampled.iter().map(|channel| channel[i]));
        }

        self.samples = out;
        self.sample_rate = sample_rate;
        Ok(self)
    }

    /// Up- or down-mix to `channels`.
    pub fn with_channels(mut self, channels: u16) -> Self {
        let channels = channels.max(1);
        if channels == self.channels {
            return self;
        }

        let from = self.channels as usize;
        let to = channels as usize;
        let mut out = Vec::with_capacity(self.frames() * to);
        for frame in self.samples.chunks_exact(from) {
            if from == 1 {
                out.extend(std::iter::repeat(frame[0]).take(to));
            } else {
                let mixed = frame.iter().sum::<f32>() / from as f32;
                out.extend(std::iter::repeat(mixed).take(to));
            }
        }

        self.samples = out;
        self.channels = channels;
        self
    }

    /// Append `other`, first bringing both clips to a common format
    /// (highest frame rate, channel count and sample width of the two).
    pub fn append(self, other: &AudioBuffer) -> Result<Self, AudioError> {
        self.append_with_crossfade(other, 0)
    }

    /// Append `other`, overlapping the seam by `crossfade_ms` with a linear fade.
    pub fn append_with_crossfade(
        self,
        other: &AudioBuffer,
        crossfade_ms: u32,
    ) -> Result<Self, AudioError> {
        let target = Format::common(&self, other);
        let mut lhs = self.conform(target)?;
        let rhs = other.clone().conform(target)?;

        let channels = lhs.channels as usize;
        let crossfade = lhs.ms_to_frames(crossfade_ms);
        append_with_crossfade(&mut lhs.samples, &rhs.samples, crossfade, channels);
        Ok(lhs)
    }

    /// Concatenate buffers in order. `Ok(None)` when `buffers` is empty.
    pub fn concat_all<I>(buffers: I) -> Result<Option<AudioBuffer>, AudioError>
    where
        I: IntoIterator<Item = AudioBuffer>,
    {
        let mut iter = buffers.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        iter.try_fold(first, |acc, next| acc.append(&next)).map(Some)
    }

    /// Amplify by `gain_db` decibels, clipping at full scale.
    pub fn apply_gain(mut self, gain_db: f32) -> Self {
        let factor = 10f32.powf(gain_db / 20.0);
        for sample in &mut self.samples {
            *sample = (*sample * factor).clamp(-1.0, 1.0);
        }
        self
    }

    /// Shorten the clip by `factor` without changing pitch.
    ///
    /// The clip is cut into chunks of `chunk_ms` plus the amount to drop; the
    /// tail of every chunk but the last is discarded and the remaining pieces
    /// are rejoined with a `crossfade_ms` overlap.
    pub fn speedup(&self, factor: f32, chunk_ms: u32, crossfade_ms: u32) -> Result<Self, AudioError> {
        if factor.is_nan() || factor < 1.0 {
            return Err(AudioError::InvalidSpeed(factor));
        }
        if factor == 1.0 {
            return Ok(self.clone());
        }

        let keep = 1.0 / factor as f64;
        let (chunk_ms, remove_ms) = if factor < 2.0 {
            (chunk_ms, (chunk_ms as f64 * (1.0 - keep) / keep) as u32)
        } else {
            ((keep * chunk_ms as f64 / (1.0 - keep)) as u32, chunk_ms)
        };
        if remove_ms == 0 {
            return Ok(self.clone());
        }
        let crossfade_ms = crossfade_ms.min(remove_ms - 1);

        let span = self.ms_to_frames(chunk_ms + remove_ms).max(1);
        let total = self.frames();
        let n_chunks = total.div_ceil(span);
        if n_chunks < 2 {
            return Err(AudioError::TooShort {
                duration_secs: self.duration_secs(),
                factor,
                chunk_ms,
            });
        }

        let channels = self.channels as usize;
        let trim = self.ms_to_frames(remove_ms - crossfade_ms);
        let crossfade = self.ms_to_frames(crossfade_ms);

        let mut out = Vec::with_capacity(self.samples.len());
        for k in 0..n_chunks - 1 {
            let start = k * span;
            let end = start + span - trim;
            let piece = &self.samples[start * channels..end * channels];
            append_with_crossfade(&mut out, piece, crossfade, channels);
        }
        let last_start = (n_chunks - 1) * span;
        out.extend_from_slice(&self.samples[last_start * channels..]);

        Ok(Self {
            samples: out,
            ..self.clone_format()
        })
    }

    fn ms_to_frames(&self, ms: u32) -> usize {
        (self.sample_rate as u64 * ms as u64 / 1000) as usize
    }

    fn clone_format(&self) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            sample_format: self.sample_format,
        }
    }

    fn conform(self, target: Format) -> Result<Self, AudioError> {
        let mut out = self
            .with_channels(target.channels)
            .with_frame_rate(target.sample_rate)?;
        out.bits_per_sample = target.bits_per_sample;
        out.sample_format = target.sample_format;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy)]
struct Format {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    sample_format: SampleFormat,
}

impl Format {
    fn common(a: &AudioBuffer, b: &AudioBuffer) -> Self {
        let sample_format = if a.sample_format == b.sample_format {
            a.sample_format
        } else {
            SampleFormat::Float
        };
        let bits_per_sample = match sample_format {
            SampleFormat::Float => 32,
            SampleFormat::Int => a.bits_per_sample.max(b.bits_per_sample),
        };
        Self {
            sample_rate: a.sample_rate.max(b.sample_rate),
            channels: a.channels.max(b.channels),
            bits_per_sample,
            sample_format,
        }
    }
}

fn int_scale(bits_per_sample: u16) -> Result<f64, AudioError> {
    match bits_per_sample {
        8 | 16 | 24 | 32 => Ok((1u64 << (bits_per_sample - 1)) as f64),
        other => Err(AudioError::UnsupportedWidth(other)),
    }
}

fn quantize(sample: f32, bits_per_sample: u16) -> i32 {
    let full = (1i64 << (bits_per_sample - 1)) as f64;
    let value = (sample.clamp(-1.0, 1.0) as f64 * full).round();
    value.clamp(-full, full - 1.0) as i32
}

/// FFT resampling of equal-length channels, trimmed to the input's timeline.
fn resample_planar(
    channels: &[Vec<f32>],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<Vec<f32>>, AudioError> {
    let in_frames = channels.first().map_or(0, Vec::len);
    let expected = (in_frames as u64 * to_rate as u64 / from_rate as u64) as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        channels.len(),
    )?;
    let delay = resampler.output_delay();
    let mut out = vec![Vec::with_capacity(delay + expected); channels.len()];

    let mut pos = 0;
    while out.first().map_or(0, Vec::len) < delay + expected {
        let needed = resampler.input_frames_next();
        let block = if pos + needed <= in_frames {
            let slices: Vec<&[f32]> = channels.iter().map(|c| &c[pos..pos + needed]).collect();
            pos += needed;
            resampler.process(&slices, None)?
        } else if pos < in_frames {
            let slices: Vec<&[f32]> = channels.iter().map(|c| &c[pos..]).collect();
            pos = in_frames;
            resampler.process_partial(Some(slices.as_slice()), None)?
        } else {
            // Flush with silence until the delayed tail is out.
            resampler.process_partial(None::<&[Vec<f32>]>, None)?
        };
        for (dst, src) in out.iter_mut().zip(block) {
            dst.extend(src);
        }
    }

    for channel in &mut out {
        channel.drain(..delay);
        channel.truncate(expected);
    }
    Ok(out)
}

fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_frames: usize, channels: usize) {
    let overlap = crossfade_frames
        .min(dst.len() / channels)
        .min(src.len() / channels);
    if overlap == 0 {
        dst.extend_from_slice(src);
        return;
    }

    let dst_start = dst.len() - overlap * channels;
    for i in 0..overlap {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        for c in 0..channels {
            let j = i * channels + c;
            dst[dst_start + j] = dst[dst_start + j] * (1.0 - t) + src[j] * t;
        }
    }

    dst.extend_from_slice(&src[overlap * channels..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tone(frames: usize, sample_rate: u32) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (i as f32 * 0.05).sin() * 0.25)
            .collect();
        AudioBuffer::from_samples(samples, sample_rate, 1)
    }

    #[test]
    fn silence_has_requested_length() {
        let silence = AudioBuffer::silent(100, 22_050);
        assert_eq!(silence.frames(), 2205);
        assert_eq!(silence.channels(), 1);
        assert!(silence.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gain_scales_and_clips() {
        let buffer = AudioBuffer::from_samples(vec![0.1, -0.1, 0.9], 8000, 1).apply_gain(6.0206);
        let s = buffer.samples();
        assert!((s[0] - 0.2).abs() < 1e-3);
        assert!((s[1] + 0.2).abs() < 1e-3);
        assert_eq!(s[2], 1.0);
    }

    #[test]
    fn append_upgrades_to_common_format() {
        let mono = AudioBuffer::from_samples(vec![0.5; 10], 11_025, 1);
        let stereo = AudioBuffer::from_samples(vec![0.25; 40], 22_050, 2);
        let joined = mono.append(&stereo).unwrap();
        assert_eq!(joined.sample_rate(), 22_050);
        assert_eq!(joined.channels(), 2);
        assert_eq!(joined.frames(), 20 + 20);
    }

    #[test]
    fn concat_all_keeps_order() {
        let a = AudioBuffer::from_samples(vec![0.1, 0.2], 8000, 1);
        let b = AudioBuffer::from_samples(vec![0.3], 8000, 1);
        let joined = AudioBuffer::concat_all(vec![a, b]).unwrap().unwrap();
        assert_eq!(joined.samples(), &[0.1f32, 0.2, 0.3]);
    }

    #[test]
    fn concat_all_of_nothing_is_none() {
        assert!(AudioBuffer::concat_all(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn speedup_roughly_halves_duration() {
        let buffer = tone(22_050, 22_050);
        let faster = buffer.speedup(2.0, 50, 25).unwrap();
        let secs = faster.duration_secs();
        assert!(secs > 0.5 && secs < 0.6, "got {secs}s");
        assert_eq!(faster.sample_rate(), 22_050);
    }

    #[test]
    fn speedup_rejects_clip_shorter_than_two_chunks() {
        let buffer = tone(1000, 22_050);
        assert!(matches!(
            buffer.speedup(2.0, 50, 25),
            Err(AudioError::TooShort { .. })
        ));
    }

    #[test]
    fn speedup_rejects_slowdown() {
        let buffer = tone(22_050, 22_050);
        assert!(matches!(
            buffer.speedup(0.5, 50, 25),
            Err(AudioError::InvalidSpeed(_))
        ));
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    fn sine(freq: f32, frames: usize, sample_rate: u32) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        AudioBuffer::from_samples(samples, sample_rate, 1)
    }

    #[test]
    fn resampling_keeps_length_and_passband_tone() {
        let tone = sine(1_000.0, 44_100, 44_100).with_frame_rate(22_050).unwrap();
        assert_eq!(tone.frames(), 22_050);
        let body = &tone.samples()[2_000..20_000];
        assert!((rms(body) - 0.5 / 2f32.sqrt()).abs() < 0.02, "rms {}", rms(body));
    }

    #[test]
    fn downsampling_filters_content_above_nyquist() {
        // 15 kHz cannot be represented at 22.05 kHz; without a low-pass it
        // would fold back to 7.05 kHz at full level.
        let tone = sine(15_000.0, 44_100, 44_100).with_frame_rate(22_050).unwrap();
        let body = &tone.samples()[2_000..20_000];
        assert!(rms(body) < 0.02, "rms {}", rms(body));
    }

    #[test]
    fn resampling_interleaved_stereo_keeps_channels_apart() {
        let samples = (0..16_000).flat_map(|_| [0.5f32, -0.25]).collect();
        let stereo = AudioBuffer::from_samples(samples, 16_000, 2)
            .with_frame_rate(8_000)
            .unwrap();
        assert_eq!(stereo.frames(), 8_000);
        let mid = &stereo.samples()[8_000..8_002];
        assert!((mid[0] - 0.5).abs() < 0.01 && (mid[1] + 0.25).abs() < 0.01, "{mid:?}");
    }

    #[test]
    fn device_resample_writes_unsigned_8bit_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("k.wav");

        let device = tone(44_100, 44_100)
            .resample(DEVICE_BITS_PER_SAMPLE, DEVICE_SAMPLE_RATE)
            .unwrap();
        assert_eq!(device.frames(), 22_050);
        device.export_wav(&path).unwrap();

        let spec = hound::WavReader::open(&path).unwrap().spec();
        assert_eq!(spec.bits_per_sample, 8);
        assert_eq!(spec.sample_rate, DEVICE_SAMPLE_RATE);

        let decoded = AudioBuffer::decode_wav(&path).unwrap();
        assert_eq!(decoded, device);
    }
}

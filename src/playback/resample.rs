// Track-rate to device-rate conversion with rubato
use anyhow::Result;
use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};

/// Frames fed to rubato per process call
const CHUNK_FRAMES: usize = 1024;

pub struct Resampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    pending: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(from_rate: u32, to_rate: u32, channels: usize) -> Result<Self> {
        let ratio = to_rate as f64 / from_rate as f64;
        let inner = FastFixedIn::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )?;
        Ok(Self {
            inner,
            channels,
            pending: vec![Vec::new(); channels],
        })
    }

    /// Feed interleaved samples; converted interleaved samples are appended
    /// to `out`. Input is buffered until a full chunk is available, so some
    /// audio stays pending until the next push or a flush.
    pub fn push(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.pending[ch].push(*sample);
            }
        }

        while self.pending[0].len() >= CHUNK_FRAMES {
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..CHUNK_FRAMES).collect())
                .collect();
            let resampled = self.inner.process(&chunk, None)?;
            interleave_into(&resampled, out);
        }
        Ok(())
    }

    /// Convert whatever is still pending at end of stream.
    pub fn flush(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if self.pending[0].is_empty() {
            return Ok(());
        }
        let tail: Vec<Vec<f32>> = self.pending.iter_mut().map(|ch| ch.drain(..).collect()).collect();
        let resampled = self.inner.process_partial(Some(&tail), None)?;
        interleave_into(&resampled, out);
        Ok(())
    }

    /// Forget pending input and internal filter state (used when seeking).
    pub fn reset(&mut self) {
        self.inner.reset();
        for ch in &mut self.pending {
            ch.clear();
        }
    }
}

fn interleave_into(planar: &[Vec<f32>], out: &mut Vec<f32>) {
    if planar.is_empty() {
        return;
    }
    let frames = planar[0].len();
    out.reserve(frames * planar.len());
    for frame in 0..frames {
        for ch in planar {
            out.push(ch[frame]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampling_yields_roughly_the_ratio_more_frames() {
        let mut resampler = Resampler::new(44100, 48000, 1).unwrap();
        let input = vec![0.5f32; 44100];
        let mut out = Vec::new();
        resampler.push(&input, &mut out).unwrap();
        resampler.flush(&mut out).unwrap();

        let expected = 48000.0;
        let actual = out.len() as f64;
        assert!(
            (actual - expected).abs() / expected < 0.05,
            "expected about {} frames, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn channel_order_is_preserved() {
        let mut resampler = Resampler::new(48000, 48000, 2).unwrap();
        // Left fixed at 1.0, right at 0.0
        let mut input = Vec::new();
        for _ in 0..8192 {
            input.push(1.0f32);
            input.push(0.0f32);
        }
        let mut out = Vec::new();
        resampler.push(&input, &mut out).unwrap();
        assert!(out.len() >= 2048);

        // Check a stretch away from the filter edges
        let mid = out.len() / 2 & !1;
        for frame in out[mid..mid + 64].chunks_exact(2) {
            assert!((frame[0] - 1.0).abs() < 0.1, "left was {}", frame[0]);
            assert!(frame[1].abs() < 0.1, "right was {}", frame[1]);
        }
    }

    #[test]
    fn reset_discards_pending_input() {
        let mut resampler = Resampler::new(44100, 48000, 1).unwrap();
        let mut out = Vec::new();
        resampler.push(&vec![0.25f32; 100], &mut out).unwrap();
        assert!(out.is_empty());

        resampler.reset();
        resampler.flush(&mut out).unwrap();
        assert!(out.is_empty());
    }
}

//! Fixed-window sample accumulation.

use thiserror::Error;

use crate::audio::SampleFrame;

/// Accumulation errors
#[derive(Error, Debug)]
pub enum AccumulatorError {
    #[error("Unsupported channel layout: expected mono, got {0} channels")]
    UnsupportedChannelLayout(u16),

    #[error("Sample rate mismatch: accumulator at {expected}Hz, frame at {actual}Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
}

/// Accumulates mono frames and yields complete fixed-size windows.
///
/// Incoming samples append to a pending buffer; every time the buffer
/// reaches `samples_per_window` a window is sliced off in FIFO order and
/// the remainder carries over. The pending buffer is always shorter than
/// one window after a drain.
///
/// Single-writer: only the driver's processing task mutates this.
#[derive(Debug)]
pub struct SampleAccumulator {
    pending: Vec<f32>,
    samples_per_window: usize,
    sample_rate: u32,
}

impl SampleAccumulator {
    pub fn new(sample_rate: u32, samples_per_window: usize) -> Self {
        Self {
            pending: Vec::with_capacity(samples_per_window),
            samples_per_window,
            sample_rate,
        }
    }

    /// Append a frame, returning every window it completes (possibly none).
    ///
    /// Frames must be mono at the accumulator's sample rate; no data is
    /// ever silently dropped.
    pub fn append(&mut self, frame: &SampleFrame) -> Result<Vec<Vec<f32>>, AccumulatorError> {
        if frame.channels() != 1 {
            return Err(AccumulatorError::UnsupportedChannelLayout(frame.channels()));
        }
        if frame.sample_rate() != self.sample_rate {
            return Err(AccumulatorError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: frame.sample_rate(),
            });
        }

        self.pending.extend_from_slice(frame.samples());

        let mut windows = Vec::new();
        while self.pending.len() >= self.samples_per_window {
            let rest = self.pending.split_off(self.samples_per_window);
            windows.push(std::mem::replace(&mut self.pending, rest));
        }

        Ok(windows)
    }

    /// Samples currently pending (always < one window after `append`).
    pub fn residual_len(&self) -> usize {
        self.pending.len()
    }

    pub fn samples_per_window(&self) -> usize {
        self.samples_per_window
    }

    /// Discard any pending residual (used on stream stop).
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(len: usize, rate: u32) -> SampleFrame {
        SampleFrame::mono((0..len).map(|i| i as f32 * 1e-4).collect(), rate)
    }

    #[test]
    fn device_cadence_fills_one_window() {
        // 0.3s at 48kHz = 14400 samples, fed as 4096 + 4096 + 6208.
        let mut acc = SampleAccumulator::new(48000, 14400);

        assert!(acc.append(&frame(4096, 48000)).unwrap().is_empty());
        assert!(acc.append(&frame(4096, 48000)).unwrap().is_empty());
        assert_eq!(acc.residual_len(), 8192);

        let windows = acc.append(&frame(6208, 48000)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 14400);
        assert_eq!(acc.residual_len(), 0);
    }

    #[test]
    fn exact_multiple_leaves_no_residual() {
        let mut acc = SampleAccumulator::new(16000, 100);
        let mut total_windows = 0;
        for _ in 0..5 {
            total_windows += acc.append(&frame(160, 16000)).unwrap().len();
        }
        // 800 samples = 8 windows of 100
        assert_eq!(total_windows, 8);
        assert_eq!(acc.residual_len(), 0);
    }

    #[test]
    fn oversized_frame_yields_multiple_windows_in_order() {
        let mut acc = SampleAccumulator::new(16000, 10);
        let samples: Vec<f32> = (0..25).map(|i| i as f32).collect();
        let windows = acc
            .append(&SampleFrame::mono(samples, 16000))
            .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0][0], 0.0);
        assert_eq!(windows[0][9], 9.0);
        assert_eq!(windows[1][0], 10.0);
        assert_eq!(acc.residual_len(), 5);
    }

    #[test]
    fn residual_carries_across_appends() {
        let mut acc = SampleAccumulator::new(16000, 10);
        acc.append(&SampleFrame::mono(vec![1.0; 7], 16000)).unwrap();
        let windows = acc
            .append(&SampleFrame::mono(vec![2.0; 7], 16000))
            .unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(&windows[0][..7], &[1.0; 7]);
        assert_eq!(&windows[0][7..], &[2.0; 3]);
        assert_eq!(acc.residual_len(), 4);
    }

    #[test]
    fn empty_frame_is_a_no_op() {
        let mut acc = SampleAccumulator::new(16000, 10);
        acc.append(&SampleFrame::mono(vec![1.0; 4], 16000)).unwrap();

        let windows = acc.append(&SampleFrame::mono(vec![], 16000)).unwrap();
        assert!(windows.is_empty());
        assert_eq!(acc.residual_len(), 4);
    }

    #[test]
    fn rejects_non_mono_frames() {
        let mut acc = SampleAccumulator::new(16000, 10);
        let stereo = SampleFrame::new(vec![0.0; 8], 16000, 2);
        assert!(matches!(
            acc.append(&stereo),
            Err(AccumulatorError::UnsupportedChannelLayout(2))
        ));
        assert_eq!(acc.residual_len(), 0);
    }

    #[test]
    fn rejects_mismatched_sample_rate() {
        let mut acc = SampleAccumulator::new(48000, 10);
        assert!(matches!(
            acc.append(&frame(8, 44100)),
            Err(AccumulatorError::SampleRateMismatch {
                expected: 48000,
                actual: 44100
            })
        ));
    }

    #[test]
    fn reset_discards_residual() {
        let mut acc = SampleAccumulator::new(16000, 10);
        acc.append(&SampleFrame::mono(vec![1.0; 7], 16000)).unwrap();
        acc.reset();
        assert_eq!(acc.residual_len(), 0);
    }
}

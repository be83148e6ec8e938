//! Optional exponential smoothing stage.
//!
//! Post-processes active windows before encoding to soften abrupt
//! amplitude jumps in the lip-sync output. Off by default; enabled via
//! [`StreamConfig::smoothing`](crate::pipeline::StreamConfig).

/// First-order exponential smoother: `y[n] = alpha * x[n] + (1 - alpha) * y[n-1]`.
///
/// State carries across windows so smoothing is continuous over the
/// stream, not per-window. `alpha` = 1.0 is a passthrough; smaller
/// values smooth more.
#[derive(Debug)]
pub struct ExponentialSmoother {
    alpha: f32,
    previous: Option<f32>,
}

impl ExponentialSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            previous: None,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Smooth a window in place.
    pub fn process(&mut self, window: &mut [f32]) {
        let mut prev = match self.previous {
            Some(p) => p,
            None => match window.first() {
                Some(&first) => first,
                None => return,
            },
        };

        for sample in window.iter_mut() {
            prev = self.alpha * *sample + (1.0 - self.alpha) * prev;
            *sample = prev;
        }
        self.previous = Some(prev);
    }

    /// Forget carried state (used on stream stop).
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

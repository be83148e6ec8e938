//! Amplitude-threshold silence gate.
//!
//! Silent windows are dropped before encoding: they cost nothing
//! downstream and avoid empty-mouth artifacts in the lip-sync consumer.

/// Default amplitude threshold below which a window counts as silent.
///
/// Operational values range from 0.0001 to 0.001 depending on the
/// capture environment.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.001;

/// Classification of a sample window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClassification {
    Silent,
    Active,
}

/// Classify a window: active iff any sample's absolute value exceeds
/// `threshold`. Pure and deterministic.
pub fn classify(window: &[f32], threshold: f32) -> WindowClassification {
    if window.iter().any(|s| s.abs() > threshold) {
        WindowClassification::Active
    } else {
        WindowClassification::Silent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_below_threshold_is_silent() {
        let window = vec![0.0005; 14400];
        assert_eq!(classify(&window, 0.001), WindowClassification::Silent);
    }

    #[test]
    fn single_sample_above_threshold_is_active() {
        let mut window = vec![0.0; 1000];
        window[500] = 0.002;
        assert_eq!(classify(&window, 0.001), WindowClassification::Active);
    }

    #[test]
    fn negative_excursions_count() {
        let window = vec![0.0, -0.5, 0.0];
        assert_eq!(classify(&window, 0.001), WindowClassification::Active);
    }

    #[test]
    fn threshold_is_exclusive() {
        // Exactly at the threshold does not exceed it.
        let window = vec![0.001; 100];
        assert_eq!(classify(&window, 0.001), WindowClassification::Silent);
    }

    #[test]
    fn empty_window_is_silent() {
        assert_eq!(classify(&[], 0.001), WindowClassification::Silent);
    }
}

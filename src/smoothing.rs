//! Rolling average over raw temperature samples.

use crate::ring::RingBuffer;
use crate::{Temperature, AVERAGE_WINDOW};

/// Flattens short spikes in the raw samples.
///
/// Slots still holding the `0.0` sentinel are treated as unwritten and left out
/// of the mean, so during warm-up the average covers only the samples seen so
/// far. A genuine reading of exactly `0.0 °C` is skipped the same way.
#[derive(Debug, Clone, Default)]
pub struct SampleSmoother<const N: usize> {
    raw: RingBuffer<Temperature, N>,
    averages: RingBuffer<Temperature, AVERAGE_WINDOW>,
}

impl<const N: usize> SampleSmoother<N> {
    pub fn new() -> Self {
        Self {
            raw: RingBuffer::new(),
            averages: RingBuffer::new(),
        }
    }

    /// Stores a raw sample and records the resulting average.
    ///
    /// Returns `None` while no non-sentinel sample exists yet.
    pub fn push(&mut self, sample: Temperature) -> Option<Temperature> {
        self.raw.insert(sample);
        let average = self.average()?;
        self.averages.insert(average);
        Some(average)
    }

    /// Mean of all written slots in the raw buffer.
    pub fn average(&self) -> Option<Temperature> {
        let (sum, count) = self
            .raw
            .iter()
            .filter(|&&t| t != 0.0)
            .fold((0.0, 0u32), |(sum, count), &t| (sum + t, count + 1));

        match count {
            0 => None,
            n => Some(sum / n as f32),
        }
    }

    pub fn raw(&self) -> &RingBuffer<Temperature, N> {
        &self.raw
    }

    /// History of the averages produced by [`SampleSmoother::push`].
    pub fn averages(&self) -> &RingBuffer<Temperature, AVERAGE_WINDOW> {
        &self.averages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_smoother_is_not_warmed() {
        let smoother: SampleSmoother<100> = SampleSmoother::new();
        assert_eq!(smoother.average(), None);
    }

    #[test]
    fn averages_only_written_samples() {
        let mut smoother: SampleSmoother<100> = SampleSmoother::new();
        smoother.push(10.0);
        smoother.push(20.0);
        let avg = smoother.push(30.0);

        assert_eq!(avg, Some(20.0));
        assert_eq!(smoother.average(), Some(20.0));
    }

    #[test]
    fn zero_reading_is_skipped() {
        let mut smoother: SampleSmoother<100> = SampleSmoother::new();
        smoother.push(10.0);
        smoother.push(0.0);
        smoother.push(30.0);

        assert_eq!(smoother.average(), Some(20.0));
    }

    #[test]
    fn only_zero_readings_stay_unwarmed() {
        let mut smoother: SampleSmoother<10> = SampleSmoother::new();
        assert_eq!(smoother.push(0.0), None);
        assert_eq!(smoother.averages().as_slice(), &[0.0; 10]);
    }

    #[test]
    fn old_samples_roll_out_once_warmed() {
        let mut smoother: SampleSmoother<4> = SampleSmoother::new();
        for t in [10.0, 10.0, 10.0, 10.0, 20.0, 20.0] {
            smoother.push(t);
        }

        assert_relative_eq!(smoother.average().unwrap(), 15.0);
    }

    #[test]
    fn averages_are_recorded() {
        let mut smoother: SampleSmoother<10> = SampleSmoother::new();
        smoother.push(21.0);
        smoother.push(23.0);

        assert_relative_eq!(smoother.averages().newest(), 22.0);
        assert_relative_eq!(smoother.averages().lagged(2), 21.0);
    }
}

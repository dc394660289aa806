//! Running mean of bar volume, used for the volume-ratio filter.

/// Mean volume over the bars pushed so far.
#[derive(Debug, Clone, Default)]
pub struct RunningVolume {
    total: f64,
    count: usize,
}

impl RunningVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, volume: u64) {
        self.total += volume as f64;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    /// `volume / average` of the bars pushed *before* this one.
    ///
    /// `None` with no prior bars or a zero average.
    pub fn ratio(&self, volume: u64) -> Option<f64> {
        self.average()
            .filter(|avg| *avg > 0.0)
            .map(|avg| volume as f64 / avg)
    }
}

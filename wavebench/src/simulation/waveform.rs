use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use super::RealSignal;

/// A time-dependent waveform.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Waveform {
    /// List of [`TimePoint`]s.
    values: Vec<TimePoint>,
}

/// A waveform over borrowed time/value slices, aligned by index.
pub struct SharedWaveform<'a> {
    t: &'a [f64],
    x: &'a [f64],
}

#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimePoint {
    t: f64,
    x: f64,
}

impl TimePoint {
    #[inline]
    pub fn new(t: f64, x: f64) -> Self {
        Self { t, x }
    }

    #[inline]
    pub fn t(&self) -> f64 {
        self.t
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }
}

impl From<(f64, f64)> for TimePoint {
    fn from(value: (f64, f64)) -> Self {
        Self {
            t: value.0,
            x: value.1,
        }
    }
}

pub trait TimeWaveform {
    fn get(&self, idx: usize) -> Option<TimePoint>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_t(&self) -> Option<f64> {
        Some(self.first()?.t())
    }

    fn first_x(&self) -> Option<f64> {
        Some(self.first()?.x())
    }

    fn last_t(&self) -> Option<f64> {
        Some(self.last()?.t())
    }

    fn last_x(&self) -> Option<f64> {
        Some(self.last()?.x())
    }

    fn first(&self) -> Option<TimePoint> {
        self.get(0)
    }

    fn last(&self) -> Option<TimePoint> {
        if self.is_empty() {
            return None;
        }
        self.get(self.len() - 1)
    }

    fn values(&self) -> Values<'_, Self> {
        Values {
            waveform: self,
            idx: 0,
        }
    }

    fn max_x(&self) -> Option<f64> {
        self.values().map(|p| p.x()).reduce(f64::max)
    }

    fn min_x(&self) -> Option<f64> {
        self.values().map(|p| p.x()).reduce(f64::min)
    }

    /// The value at time `t`, linearly interpolated between the two
    /// surrounding points. `None` outside the waveform's time span.
    ///
    /// Points must be sorted by time.
    fn sample_at(&self, t: f64) -> Option<f64> {
        let idx = search_for_time(self, t)?;
        let p0 = self.get(idx)?;
        let p1 = match self.get(idx + 1) {
            Some(p1) => p1,
            None => {
                return if t == p0.t() { Some(p0.x()) } else { None };
            }
        };
        debug_assert!(t >= p0.t() && t <= p1.t());
        if p1.t() == p0.t() {
            return Some(p0.x());
        }
        let frac = (t - p0.t()) / (p1.t() - p0.t());
        Some(p0.x() + frac * (p1.x() - p0.x()))
    }

    /// Trapezoidal integral of the waveform over its full time span.
    fn integral(&self) -> f64 {
        let mut total = 0.0;
        for i in 1..self.len() {
            if let (Some(p0), Some(p1)) = (self.get(i - 1), self.get(i)) {
                total += 0.5 * (p0.x() + p1.x()) * (p1.t() - p0.t());
            }
        }
        total
    }
}

pub struct Values<'a, W: ?Sized> {
    waveform: &'a W,
    idx: usize,
}

impl<'a, W> Iterator for Values<'a, W>
where
    W: TimeWaveform + ?Sized,
{
    type Item = TimePoint;

    fn next(&mut self) -> Option<Self::Item> {
        let out = self.waveform.get(self.idx);
        if out.is_some() {
            self.idx += 1;
        }
        out
    }
}

impl<'a, W> FusedIterator for Values<'a, W> where W: TimeWaveform + ?Sized {}

impl Waveform {
    #[inline]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_values(values: Vec<TimePoint>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, t: f64, x: f64) {
        if let Some(last) = self.values.last() {
            debug_assert!(t >= last.t());
        }
        self.values.push(TimePoint::new(t, x));
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<TimePoint> for Waveform {
    fn from_iter<T: IntoIterator<Item = TimePoint>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl TimeWaveform for Waveform {
    fn get(&self, idx: usize) -> Option<TimePoint> {
        self.values.get(idx).copied()
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

impl<'a> SharedWaveform<'a> {
    /// Pairs a time axis with a signal sampled on it.
    ///
    /// # Panics
    ///
    /// Panics if the two signals have different lengths.
    pub fn from_signal(t: &'a RealSignal, x: &'a RealSignal) -> Self {
        assert_eq!(
            t.len(),
            x.len(),
            "time axis and signal must have the same length"
        );
        Self {
            t: &t.values,
            x: &x.values,
        }
    }

    pub fn to_waveform(&self) -> Waveform {
        self.values().collect()
    }
}

impl<'a> TimeWaveform for SharedWaveform<'a> {
    fn get(&self, idx: usize) -> Option<TimePoint> {
        Some(TimePoint::new(
            self.t.get(idx).copied()?,
            self.x.get(idx).copied()?,
        ))
    }

    fn len(&self) -> usize {
        self.t.len()
    }
}

/// Index of the latest point whose time is at most `target`.
/// `None` if every point is later than `target`, or the waveform is empty.
fn search_for_time<T>(data: &T, target: f64) -> Option<usize>
where
    T: TimeWaveform + ?Sized,
{
    let mut lo = 0usize;
    let mut hi = data.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if data.get(mid)?.t() <= target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo == 0 {
        None
    } else {
        Some(lo - 1)
    }
}

/// Index of the latest value at most `target` in a sorted slice.
pub(crate) fn binary_search_before(data: &[f64], target: f64) -> Option<usize> {
    let idx = data.partition_point(|x| *x <= target);
    if idx == 0 {
        None
    } else {
        Some(idx - 1)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::float_eq;

    use super::*;

    fn waveform(points: &[(f64, f64)]) -> Waveform {
        points.iter().map(|&p| TimePoint::from(p)).collect()
    }

    #[test]
    fn waveform_integral() {
        let wav = waveform(&[
            (0., 0.),
            (1., 1.),
            (2., 0.9),
            (3., 0.1),
            (4., 0.),
            (5., 1.),
            (8., 1.1),
        ]);
        let expected = 0.5 + 0.95 + 0.5 + 0.05 + 0.5 + 3.0 * 1.05;
        let integral = wav.integral();
        assert!(float_eq!(integral, expected, r2nd <= 1e-8));
    }

    #[test]
    fn waveform_sample_at() {
        let wav = waveform(&[(0., 0.), (1., 1.), (2., 0.5)]);
        assert!(float_eq!(wav.sample_at(0.5).unwrap(), 0.5, abs <= 1e-12));
        assert!(float_eq!(wav.sample_at(1.5).unwrap(), 0.75, abs <= 1e-12));
        assert!(float_eq!(wav.sample_at(2.0).unwrap(), 0.5, abs <= 1e-12));
        assert_eq!(wav.sample_at(-0.1), None);
        assert_eq!(wav.sample_at(2.1), None);
    }

    #[test]
    fn waveform_extrema() {
        let wav = waveform(&[(0., 0.2), (1., -1.), (2., 0.5)]);
        assert_eq!(wav.max_x(), Some(0.5));
        assert_eq!(wav.min_x(), Some(-1.0));
    }

    #[test]
    fn search_before() {
        let data = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(binary_search_before(&data, -0.5), None);
        assert_eq!(binary_search_before(&data, 0.0), Some(0));
        assert_eq!(binary_search_before(&data, 1.5), Some(1));
        assert_eq!(binary_search_before(&data, 10.0), Some(3));
    }
}

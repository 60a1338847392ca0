use std::collections::HashMap;
use std::path::PathBuf;

use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use self::waveform::{binary_search_before, SharedWaveform};
use crate::error::{ErrorSource, Result};

pub mod rawdata;
pub mod waveform;

/// Input to one batch simulation run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimInput {
    pub work_dir: PathBuf,
    /// The circuit description consumed by the simulator.
    pub schematic: PathBuf,
    pub opts: SimOpts,
    pub includes: Vec<PathBuf>,
    pub libs: Vec<Lib>,
    pub save: Save,
    /// Analyses this run is expected to produce.
    ///
    /// Backends that render their own deck (ngspice) turn these into
    /// directives; backends whose schematic owns its directives (LTspice)
    /// validate the simulator's output against them. An empty list accepts
    /// whatever the simulator produces.
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOutput {
    pub data: Vec<AnalysisData>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOpts {
    /// Simulation temperature, in degrees Celsius.
    pub temp: Option<f64>,
    /// The temperature at which model parameters were measured, in degrees Celsius.
    pub tnom: Option<f64>,
    /// Flags to pass to the simulator invocation.
    pub flags: Option<String>,
    pub other: HashMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Lib {
    pub path: PathBuf,
    pub section: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum Save {
    #[default]
    All,
    None,
    Signals(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Analysis {
    Op(OpAnalysis),
    Dc(DcAnalysis),
    Tran(TranAnalysis),
    Ac(AcAnalysis),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    Op,
    Dc,
    Tran,
    Ac,
    Other,
}

#[derive(Debug, Default, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct OpAnalysis {}

impl OpAnalysis {
    #[inline]
    pub fn new() -> Self {
        Self {}
    }
}

#[derive(Debug, Clone, Builder, PartialEq, Serialize, Deserialize)]
pub struct DcAnalysis {
    /// The name of the source or parameter to sweep.
    #[builder(setter(into))]
    pub sweep: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl DcAnalysis {
    #[inline]
    pub fn builder() -> DcAnalysisBuilder {
        DcAnalysisBuilder::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct TranAnalysis {
    pub stop: f64,
    pub step: f64,
    #[builder(default)]
    pub start: f64,
}

impl TranAnalysis {
    #[inline]
    pub fn builder() -> TranAnalysisBuilder {
        TranAnalysisBuilder::default()
    }
}

#[derive(Debug, Clone, Builder, PartialEq, Serialize, Deserialize)]
pub struct AcAnalysis {
    pub fstart: f64,
    pub fstop: f64,
    pub points: usize,
    pub sweep: SweepMode,
}

impl AcAnalysis {
    #[inline]
    pub fn builder() -> AcAnalysisBuilder {
        AcAnalysisBuilder::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSignal {
    pub value: f64,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealSignal {
    pub values: Vec<f64>,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexSignal {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Quantity {
    Voltage,
    Current,
    Frequency,
    Time,
    Temperature,
    Unknown,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SweepMode {
    Dec,
    Oct,
    Lin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpData {
    /// All saved signals.
    pub data: HashMap<String, ScalarSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranData {
    /// All saved signals, not including time.
    pub data: HashMap<String, RealSignal>,
    pub time: RealSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcData {
    /// All saved signals, not including frequency.
    pub data: HashMap<String, ComplexSignal>,
    pub freq: RealSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcData {
    /// All saved signals, including the swept variable.
    pub data: HashMap<String, RealSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisData {
    Op(OpData),
    Tran(TranData),
    Ac(AcData),
    Dc(DcData),
    Other,
}

impl AnalysisData {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Self::Op(_) => AnalysisType::Op,
            Self::Tran(_) => AnalysisType::Tran,
            Self::Ac(_) => AnalysisType::Ac,
            Self::Dc(_) => AnalysisType::Dc,
            Self::Other => AnalysisType::Other,
        }
    }

    /// Get the results of an operating point analysis.
    ///
    /// # Panics
    ///
    /// This function panics if this analysis does not correspond to an operating point analysis.
    pub fn op(&self) -> &OpData {
        match self {
            Self::Op(x) => x,
            _ => panic!("Expected op analysis, got {:?}", self.analysis_type()),
        }
    }

    /// Get the results of a transient analysis.
    ///
    /// # Panics
    ///
    /// This function panics if this analysis does not correspond to a transient analysis.
    pub fn tran(&self) -> &TranData {
        match self {
            Self::Tran(x) => x,
            _ => panic!("Expected tran analysis, got {:?}", self.analysis_type()),
        }
    }

    /// Get the results of an AC analysis.
    ///
    /// # Panics
    ///
    /// This function panics if this analysis does not correspond to an AC analysis.
    pub fn ac(&self) -> &AcData {
        match self {
            Self::Ac(x) => x,
            _ => panic!("Expected ac analysis, got {:?}", self.analysis_type()),
        }
    }

    /// Get the results of a DC analysis.
    ///
    /// # Panics
    ///
    /// This function panics if this analysis does not correspond to a DC analysis.
    pub fn dc(&self) -> &DcData {
        match self {
            Self::Dc(x) => x,
            _ => panic!("Expected dc analysis, got {:?}", self.analysis_type()),
        }
    }
}

impl From<OpData> for AnalysisData {
    fn from(value: OpData) -> Self {
        Self::Op(value)
    }
}
impl From<TranData> for AnalysisData {
    fn from(value: TranData) -> Self {
        Self::Tran(value)
    }
}
impl From<AcData> for AnalysisData {
    fn from(value: AcData) -> Self {
        Self::Ac(value)
    }
}
impl From<DcData> for AnalysisData {
    fn from(value: DcData) -> Self {
        Self::Dc(value)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorOpts {
    pub opts: HashMap<String, String>,
}

/// A batch simulation backend.
pub trait Simulator {
    fn new(opts: SimulatorOpts) -> Result<Self>
    where
        Self: Sized;

    /// Runs one blocking simulation and decodes its output.
    fn simulate(&self, input: SimInput) -> Result<SimOutput>;

    /// The trace name this backend records for the voltage of `node`.
    fn node_voltage_string(&self, node: &str) -> String;
}

impl Analysis {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Analysis::Op(_) => AnalysisType::Op,
            Analysis::Tran(_) => AnalysisType::Tran,
            Analysis::Ac(_) => AnalysisType::Ac,
            Analysis::Dc(_) => AnalysisType::Dc,
        }
    }
}

impl From<TranAnalysis> for Analysis {
    fn from(value: TranAnalysis) -> Self {
        Self::Tran(value)
    }
}

impl From<OpAnalysis> for Analysis {
    fn from(value: OpAnalysis) -> Self {
        Self::Op(value)
    }
}

impl From<DcAnalysis> for Analysis {
    fn from(value: DcAnalysis) -> Self {
        Self::Dc(value)
    }
}

impl From<AcAnalysis> for Analysis {
    fn from(value: AcAnalysis) -> Self {
        Self::Ac(value)
    }
}

impl RealSignal {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the index of the first value that is at least `v`.
    pub fn where_at_least(&self, v: f64) -> Option<usize> {
        self.values
            .iter()
            .find_position(|&x| *x >= v)
            .map(|(idx, _)| idx)
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }

    /// Gets the index into the signal
    /// corresponding to the latest value less than or equal to `x`.
    ///
    /// The signal must be monotonically increasing. This is intended
    /// for use with timestamps, eg. from a transient analysis.
    pub fn idx_before_sorted(&self, x: f64) -> Option<usize> {
        binary_search_before(&self.values, x)
    }
}

impl std::ops::Index<usize> for RealSignal {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        self.values.index(index)
    }
}

impl std::ops::IndexMut<usize> for RealSignal {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.values.index_mut(index)
    }
}

impl ComplexSignal {
    #[inline]
    pub fn len(&self) -> usize {
        self.real.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// The magnitude of each sample.
    pub fn magnitude(&self) -> Vec<f64> {
        self.real
            .iter()
            .zip(self.imag.iter())
            .map(|(re, im)| re.hypot(*im))
            .collect()
    }
}

impl TranData {
    pub fn signal(&self, name: &str) -> Option<&RealSignal> {
        self.data.get(name)
    }

    /// Like [`TranData::signal`], but a missing name is an error naming the
    /// signal rather than `None`.
    pub fn try_signal(&self, name: &str) -> Result<&RealSignal> {
        self.data
            .get(name)
            .ok_or_else(|| ErrorSource::SignalNotFound(name.to_string()).into())
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn waveform(&self, name: &str) -> Option<SharedWaveform> {
        let x = self.data.get(name)?;
        Some(SharedWaveform::from_signal(&self.time, x))
    }

    pub fn time_waveform(&self) -> SharedWaveform<'_> {
        SharedWaveform::from_signal(&self.time, &self.time)
    }
}

impl AcData {
    pub fn signal(&self, name: &str) -> Option<&ComplexSignal> {
        self.data.get(name)
    }

    pub fn try_signal(&self, name: &str) -> Result<&ComplexSignal> {
        self.data
            .get(name)
            .ok_or_else(|| ErrorSource::SignalNotFound(name.to_string()).into())
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl DcData {
    pub fn signal(&self, name: &str) -> Option<&RealSignal> {
        self.data.get(name)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl OpData {
    pub fn signal(&self, name: &str) -> Option<&ScalarSignal> {
        self.data.get(name)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tran_data() -> TranData {
        let time = RealSignal {
            values: vec![0.0, 1e-6, 2e-6, 3e-6],
            quantity: Quantity::Time,
        };
        let vout = RealSignal {
            values: vec![0.0, 0.5, 0.9, 1.0],
            quantity: Quantity::Voltage,
        };
        TranData {
            data: HashMap::from([("V(out)".to_string(), vout)]),
            time,
        }
    }

    #[test]
    fn try_signal_reports_missing_names() {
        let data = tran_data();
        assert_eq!(data.try_signal("V(out)").unwrap().len(), 4);

        let err = data.try_signal("V(missing)").unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::SignalNotFound(name) if name == "V(missing)"
        ));
    }

    #[test]
    fn signal_helpers() {
        let data = tran_data();
        let vout = data.signal("V(out)").unwrap();
        assert_eq!(vout.where_at_least(0.9), Some(2));
        assert_eq!(vout.where_at_least(2.0), None);
        assert_eq!(data.time.idx_before_sorted(1.5e-6), Some(1));
        assert_eq!(data.time.idx_before_sorted(-1.0), None);
    }

    #[test]
    fn complex_magnitude() {
        let sig = ComplexSignal {
            real: vec![3.0, 0.0],
            imag: vec![4.0, 1.0],
            quantity: Quantity::Voltage,
        };
        assert_eq!(sig.magnitude(), vec![5.0, 1.0]);
    }

    #[test]
    fn waveform_accessor_pairs_time_with_samples() {
        use super::waveform::TimeWaveform;

        let data = tran_data();
        let wav = data.waveform("V(out)").unwrap();
        assert_eq!(wav.len(), 4);
        assert_eq!(wav.first_x(), Some(0.0));
        assert_eq!(wav.last_t(), Some(3e-6));
        assert!(data.waveform("V(missing)").is_none());
    }
}

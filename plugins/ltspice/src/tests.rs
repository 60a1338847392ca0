use std::collections::HashMap;
use std::path::{Path, PathBuf};

use approx::abs_diff_eq;
use wavebench::error::ErrorSource;
use wavebench::simulation::{
    Analysis, AnalysisData, AnalysisType, OpAnalysis, Quantity, RealSignal, SimInput, Simulator,
    SimulatorOpts, TranAnalysis, TranData,
};

use crate::{check_declared, Ltspice};

pub(crate) const TEST_BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");
pub(crate) const EXAMPLES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/examples");
pub(crate) const SPICE_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../spice");

#[test]
fn executable_resolution_prefers_opts() {
    let opts = SimulatorOpts {
        opts: HashMap::from([(
            "executable".to_string(),
            "/opt/ltspice/LTspice".to_string(),
        )]),
    };
    let simulator = Ltspice::new(opts).unwrap();
    assert_eq!(simulator.executable(), Path::new("/opt/ltspice/LTspice"));
}

#[test]
fn node_voltage_probe_names() {
    let simulator = Ltspice::new(SimulatorOpts::default()).unwrap();
    assert_eq!(simulator.node_voltage_string("out"), "V(out)");
    assert_eq!(simulator.node_voltage_string("amp"), "V(amp)");
}

fn tran_data() -> AnalysisData {
    AnalysisData::Tran(TranData {
        data: HashMap::new(),
        time: RealSignal {
            values: vec![0.0],
            quantity: Quantity::Time,
        },
    })
}

#[test]
fn declared_analyses_are_validated() {
    let tran = Analysis::Tran(TranAnalysis::builder().stop(1e-3).step(1e-6).build().unwrap());

    check_declared(&[], &[tran_data()]).unwrap();
    check_declared(&[tran.clone()], &[tran_data()]).unwrap();

    let err = check_declared(&[tran.clone(), Analysis::Op(OpAnalysis::new())], &[tran_data()])
        .unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::AnalysisCountMismatch {
            expected: 2,
            found: 1
        }
    ));

    let err = check_declared(&[Analysis::Op(OpAnalysis::new())], &[tran_data()]).unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::AnalysisMismatch {
            idx: 0,
            declared: AnalysisType::Op,
            produced: AnalysisType::Tran,
        }
    ));
}

#[test]
#[ignore = "requires LTspice"]
fn vdivider_test() {
    let path = PathBuf::from(EXAMPLES_PATH).join("vdivider_tb.asc");
    let work_dir = PathBuf::from(TEST_BUILD_PATH).join("vdivider_tb/sim/");
    let input = SimInput {
        work_dir,
        schematic: path,
        analyses: vec![Analysis::Tran(
            TranAnalysis::builder()
                .stop(5e-3f64)
                .step(1e-6f64)
                .build()
                .unwrap(),
        )],
        ..Default::default()
    };
    let opts = SimulatorOpts {
        opts: Default::default(),
    };

    let simulator = Ltspice::new(opts).unwrap();
    let out = simulator.simulate(input).unwrap();

    assert_eq!(out.data.len(), 1);
    assert_eq!(out.data[0].analysis_type(), AnalysisType::Tran);

    let tran = out.data[0].tran();
    let vout = tran
        .try_signal(&simulator.node_voltage_string("out"))
        .unwrap();
    assert!(!vout.is_empty());
    assert_eq!(vout.len(), tran.time.len());
    assert!(abs_diff_eq!(
        tran.time.get(tran.time.len() - 1).unwrap(),
        5e-3f64,
        epsilon = 1e-4
    ));
}

#[test]
#[ignore = "requires LTspice"]
fn conditioning_circuit_end_to_end() {
    let path = PathBuf::from(SPICE_PATH).join("andres_conditioning_circuit.asc");
    let work_dir = PathBuf::from(TEST_BUILD_PATH).join("conditioning/sim/");
    let input = SimInput {
        work_dir,
        schematic: path,
        ..Default::default()
    };

    let simulator = Ltspice::new(SimulatorOpts::default()).unwrap();
    let out = simulator.simulate(input).unwrap();

    let tran = out.data[0].tran();
    let vout = tran
        .try_signal(&simulator.node_voltage_string("out"))
        .unwrap();
    assert!(!vout.is_empty());
    assert_eq!(vout.len(), tran.time.len());
}

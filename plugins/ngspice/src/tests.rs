use std::collections::HashMap;
use std::path::PathBuf;

use approx::abs_diff_eq;
use wavebench::simulation::{
    AcAnalysis, Analysis, AnalysisData, AnalysisType, DcAnalysis, OpAnalysis, Quantity,
    RealSignal, SimInput, Simulator, SimulatorOpts, SweepMode, TranAnalysis, TranData,
};

use crate::{analysis_line, arrange, Ngspice};

pub(crate) const TEST_BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");
pub(crate) const EXAMPLES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/examples");

#[test]
fn analysis_lines() {
    let tran = Analysis::Tran(
        TranAnalysis::builder()
            .stop(5e-3f64)
            .step(1e-3f64)
            .build()
            .unwrap(),
    );
    assert_eq!(analysis_line(&tran), ".tran 0.001 0.005 0");

    let ac = Analysis::Ac(
        AcAnalysis::builder()
            .fstart(1e-3f64)
            .fstop(1f64)
            .points(4)
            .sweep(SweepMode::Dec)
            .build()
            .unwrap(),
    );
    assert_eq!(analysis_line(&ac), ".ac dec 4 0.001 1");

    assert_eq!(analysis_line(&Analysis::Op(OpAnalysis::new())), ".op");

    let dc = Analysis::Dc(
        DcAnalysis::builder()
            .sweep("TEMP")
            .start(200.0)
            .stop(300.0)
            .step(20.0)
            .build()
            .unwrap(),
    );
    assert_eq!(analysis_line(&dc), ".dc TEMP 200 300 20");
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
fn arrange_matches_by_type() {
    let tran = Analysis::Tran(TranAnalysis::builder().stop(1e-3).step(1e-6).build().unwrap());

    let out = arrange(&[tran.clone()], vec![tran_data()]).unwrap();
    assert_eq!(out.len(), 1);

    assert!(arrange(&[Analysis::Op(OpAnalysis::new())], vec![tran_data()]).is_err());
    assert!(arrange(&[], vec![tran_data()]).is_ok());
    assert!(arrange(&[tran], vec![tran_data(), tran_data()]).is_err());
}

#[test]
#[ignore = "requires ngspice"]
fn vdivider_test() {
    let path = PathBuf::from(EXAMPLES_PATH).join("vdivider_tb.spice");
    let work_dir = PathBuf::from(TEST_BUILD_PATH).join("vdivider_tb/sim/");
    let input = SimInput {
        work_dir,
        schematic: path,
        analyses: vec![
            Analysis::Op(OpAnalysis {}),
            Analysis::Tran(
                TranAnalysis::builder()
                    .stop(5e-3f64)
                    .step(1e-3f64)
                    .build()
                    .unwrap(),
            ),
            Analysis::Ac(
                AcAnalysis::builder()
                    .fstop(1f64)
                    .fstart(1e-3f64)
                    .points(4)
                    .sweep(SweepMode::Dec)
                    .build()
                    .unwrap(),
            ),
            Analysis::Dc(
                DcAnalysis::builder()
                    .sweep("TEMP")
                    .start(200.0)
                    .stop(300.0)
                    .step(20.0)
                    .build()
                    .unwrap(),
            ),
        ],
        ..Default::default()
    };
    let opts = SimulatorOpts {
        opts: Default::default(),
    };

    let simulator = Ngspice::new(opts).unwrap();
    let out = simulator.simulate(input).unwrap();

    assert_eq!(out.data.len(), 4);
    assert_eq!(out.data[0].analysis_type(), AnalysisType::Op);
    assert_eq!(out.data[1].analysis_type(), AnalysisType::Tran);
    assert_eq!(out.data[2].analysis_type(), AnalysisType::Ac);
    assert_eq!(out.data[3].analysis_type(), AnalysisType::Dc);

    let tran = out.data[1].tran();
    let vout = tran
        .try_signal(&simulator.node_voltage_string("out"))
        .unwrap();
    assert_eq!(vout.len(), tran.time.len());
    assert!(abs_diff_eq!(
        tran.time.get(tran.time.len() - 1).unwrap(),
        5e-3f64,
        epsilon = 1e-4
    ));

    let freq = &out.data[2].ac().freq;
    assert!(abs_diff_eq!(freq.get(0).unwrap(), 1e-3f64));
}

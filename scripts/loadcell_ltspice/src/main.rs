//! Runs the load cell conditioning circuit through LTspice and plots the
//! conditioned output voltage.

use std::collections::HashMap;
use std::path::PathBuf;

use ltspice::Ltspice;
use wavebench::simulation::{Analysis, SimInput, Simulator, SimulatorOpts, TranAnalysis};
use waveview::TraceView;

// Adjust for your platform's install location.
const LTSPICE_EXECUTABLE: &str = "/Applications/LTspice.app/Contents/MacOS/LTspice";
const SCHEMATIC: &str = "spice/andres_conditioning_circuit.asc";
const WORK_DIR: &str = "build/loadcell_ltspice/sim";
const PROBED_NODE: &str = "out";

fn main() {
    env_logger::init();

    let opts = SimulatorOpts {
        opts: HashMap::from([(
            "executable".to_string(),
            LTSPICE_EXECUTABLE.to_string(),
        )]),
    };
    let simulator = Ltspice::new(opts).expect("failed to configure LTspice");

    // The schematic carries its own .tran directive; the declaration here is
    // checked against what the simulator actually ran.
    let input = SimInput {
        work_dir: PathBuf::from(WORK_DIR),
        schematic: PathBuf::from(SCHEMATIC),
        analyses: vec![Analysis::Tran(
            TranAnalysis::builder()
                .stop(40e-3)
                .step(10e-6)
                .build()
                .unwrap(),
        )],
        ..Default::default()
    };

    let out = simulator.simulate(input).expect("simulation failed");
    let tran = out.data[0].tran();
    log::info!(
        "decoded traces: {:?}",
        tran.signal_names().collect::<Vec<_>>()
    );

    let probe = simulator.node_voltage_string(PROBED_NODE);
    let vout = tran.try_signal(&probe).expect("probed node was not saved");

    TraceView::new("LTspice Simulation: Vout", "Time [s]", "Voltage [V]")
        .with_series(probe, &tran.time, vout)
        .expect("mismatched trace lengths")
        .show()
        .expect("failed to display plot");
}

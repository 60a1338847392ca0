//! Runs the load cell conditioning circuit through ngspice and plots the
//! conditioned output voltage.

use std::path::PathBuf;

use ngspice::Ngspice;
use wavebench::simulation::{Analysis, SimInput, Simulator, SimulatorOpts, TranAnalysis};
use waveview::TraceView;

const NETLIST: &str = "spice/andres_conditioning_circuit.cir";
const WORK_DIR: &str = "build/loadcell_ngspice/sim";
const PROBED_NODE: &str = "out";

fn main() {
    env_logger::init();

    let simulator =
        Ngspice::new(SimulatorOpts::default()).expect("failed to configure ngspice");

    let input = SimInput {
        work_dir: PathBuf::from(WORK_DIR),
        schematic: PathBuf::from(NETLIST),
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

    TraceView::new("ngspice Simulation: Vout", "Time [s]", "Voltage [V]")
        .with_series(probe, &tran.time, vout)
        .expect("mismatched trace lengths")
        .show()
        .expect("failed to display plot");
}

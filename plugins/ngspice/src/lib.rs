use std::path::{Path, PathBuf};
use std::process::Command;

use wavebench::error::{with_err_context, ErrorContext, ErrorSource};
pub(crate) use wavebench::error::Result;
use wavebench::simulation::rawdata::analyses_from_rawfile;
use wavebench::simulation::{
    Analysis, AnalysisData, Save, SimInput, SimOutput, Simulator, SimulatorOpts, SweepMode,
};
use templates::{render_netlist, NetlistCtx};

pub(crate) mod templates;
#[cfg(test)]
mod tests;

pub struct Ngspice {
    executable: PathBuf,
}

impl Ngspice {
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Resolution order: the `executable` option, then `NGSPICE_PATH`, then
    /// `ngspice` on the search path.
    fn resolve_executable(opts: &SimulatorOpts) -> PathBuf {
        if let Some(exe) = opts.opts.get("executable") {
            PathBuf::from(exe)
        } else if let Ok(exe) = std::env::var("NGSPICE_PATH") {
            PathBuf::from(exe)
        } else {
            PathBuf::from("ngspice")
        }
    }
}

impl Simulator for Ngspice {
    fn new(opts: SimulatorOpts) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(Self {
            executable: Self::resolve_executable(&opts),
        })
    }

    fn simulate(&self, input: SimInput) -> Result<SimOutput> {
        wavebench::io::create_dir_all(&input.work_dir)?;
        // ngspice runs inside the work directory, so every path handed to it
        // must survive the directory change.
        let work_dir = wavebench::io::canonicalize(&input.work_dir)?;
        let schematic = wavebench::io::canonicalize(&input.schematic)?;
        let analyses = get_analyses(&input.analyses);
        let directives = get_directives(&input);
        let ctx = NetlistCtx {
            schematic: &schematic,
            libs: &input.libs,
            includes: &input.includes,
            directives: &directives,
            analyses: &analyses,
        };
        let path = render_netlist(ctx, &work_dir)?;

        let rawpath = work_dir.join("rawspice.raw");
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-n").arg("-b").arg("-r").arg(&rawpath);
        if let Some(flags) = &input.opts.flags {
            cmd.args(flags.split_whitespace());
        }
        cmd.current_dir(&work_dir).arg(path);
        log::info!("running {cmd:?}");

        let status = with_err_context(cmd.status(), || {
            ErrorContext::RunSimulator(self.executable.clone())
        })?;
        if !status.success() {
            return Err(ErrorSource::Internal(format!(
                "ngspice exited unsuccessfully: {status}"
            ))
            .into());
        }

        let data = wavebench::io::read(&rawpath)?;
        log::debug!("decoding {} bytes from {rawpath:?}", data.len());
        let raw = spice_rawfile::parse(&data)?;
        let produced = analyses_from_rawfile(raw)?;
        let data = arrange(&input.analyses, produced)?;

        Ok(SimOutput { data })
    }

    fn node_voltage_string(&self, node: &str) -> String {
        format!("v({node})")
    }
}

/// Matches decoded plots back to the declared analyses by analysis type.
/// ngspice emits one plot per directive, but not necessarily in deck order.
fn arrange(declared: &[Analysis], produced: Vec<AnalysisData>) -> Result<Vec<AnalysisData>> {
    if declared.is_empty() {
        return Ok(produced);
    }
    let found = produced.len();
    let mut slots: Vec<Option<AnalysisData>> = produced.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(declared.len());
    for declared in declared {
        let slot = slots.iter_mut().find(|s| {
            s.as_ref()
                .is_some_and(|p| p.analysis_type() == declared.analysis_type())
        });
        match slot.and_then(Option::take) {
            Some(data) => out.push(data),
            None => {
                return Err(ErrorSource::Internal(format!(
                    "simulator output is missing a {:?} analysis",
                    declared.analysis_type()
                ))
                .into())
            }
        }
    }
    if slots.iter().any(Option::is_some) {
        return Err(ErrorSource::AnalysisCountMismatch {
            expected: declared.len(),
            found,
        }
        .into());
    }
    Ok(out)
}

fn get_analyses(input: &[Analysis]) -> Vec<String> {
    input.iter().map(analysis_line).collect()
}

fn get_directives(input: &SimInput) -> Vec<String> {
    let mut directives = Vec::new();
    if let Some(t) = input.opts.temp {
        directives.push(format!(".temp {t}"));
    }
    if let Some(t) = input.opts.tnom {
        directives.push(format!(".options tnom={t}"));
    }
    save_directives(&input.save, &mut directives);
    directives
}

fn save_directives(save: &Save, directives: &mut Vec<String>) {
    match save {
        // ngspice saves every node in batch mode.
        Save::All => {}
        Save::None => {
            log::warn!("ngspice cannot disable saving in batch mode; ignoring Save::None")
        }
        Save::Signals(signals) => directives.push(format!(".save {}", signals.join(" "))),
    }
}

fn analysis_line(input: &Analysis) -> String {
    match input {
        Analysis::Op(_) => String::from(".op"),
        Analysis::Tran(a) => format!(".tran {} {} {}", a.step, a.stop, a.start),
        Analysis::Ac(a) => format!(
            ".ac {} {} {} {}",
            fmt_sweep_mode(a.sweep),
            a.points,
            a.fstart,
            a.fstop
        ),
        Analysis::Dc(a) => format!(".dc {} {} {} {}", a.sweep, a.start, a.stop, a.step),
    }
}

fn fmt_sweep_mode(mode: SweepMode) -> &'static str {
    match mode {
        SweepMode::Dec => "dec",
        SweepMode::Oct => "oct",
        SweepMode::Lin => "lin",
    }
}

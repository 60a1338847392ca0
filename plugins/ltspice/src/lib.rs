use std::path::{Path, PathBuf};
use std::process::Command;

use wavebench::error::{with_err_context, ErrorContext, ErrorSource};
pub(crate) use wavebench::error::Result;
use wavebench::simulation::rawdata::analyses_from_rawfile;
use wavebench::simulation::{
    Analysis, AnalysisData, SimInput, SimOutput, Simulator, SimulatorOpts,
};

#[cfg(test)]
mod tests;

#[cfg(target_os = "macos")]
const DEFAULT_EXECUTABLE: &str = "/Applications/LTspice.app/Contents/MacOS/LTspice";
#[cfg(target_os = "windows")]
const DEFAULT_EXECUTABLE: &str = "C:\\Program Files\\LTC\\LTspiceXVII\\XVIIx64.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_EXECUTABLE: &str = "ltspice";

pub struct Ltspice {
    executable: PathBuf,
}

impl Ltspice {
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Resolution order: the `executable` option, then `LTSPICE_PATH`, then
    /// the platform's usual install location.
    fn resolve_executable(opts: &SimulatorOpts) -> PathBuf {
        if let Some(exe) = opts.opts.get("executable") {
            PathBuf::from(exe)
        } else if let Ok(exe) = std::env::var("LTSPICE_PATH") {
            PathBuf::from(exe)
        } else {
            PathBuf::from(DEFAULT_EXECUTABLE)
        }
    }
}

impl Simulator for Ltspice {
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
        if input.opts.temp.is_some() || input.opts.tnom.is_some() {
            log::warn!("the LTspice backend ignores temp/tnom options; set them in the schematic");
        }

        // LTspice writes the trace file next to the schematic.
        let rawpath = input.schematic.with_extension("raw");
        let stdout = wavebench::io::create_file(input.work_dir.join("ltspice.out"))?;
        let stderr = wavebench::io::create_file(input.work_dir.join("ltspice.err"))?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-b").arg("-Run");
        if let Some(flags) = &input.opts.flags {
            cmd.args(flags.split_whitespace());
        }
        cmd.arg(&input.schematic).stdout(stdout).stderr(stderr);
        log::info!("running {cmd:?}");

        let status = with_err_context(cmd.status(), || {
            ErrorContext::RunSimulator(self.executable.clone())
        })?;
        if !status.success() {
            return Err(ErrorSource::Internal(format!(
                "LTspice exited unsuccessfully: {status}"
            ))
            .into());
        }

        let data = wavebench::io::read(&rawpath)?;
        log::debug!("decoding {} bytes from {rawpath:?}", data.len());
        let raw = spice_rawfile::parse(&data)?;
        let data = analyses_from_rawfile(raw)?;
        check_declared(&input.analyses, &data)?;

        Ok(SimOutput { data })
    }

    fn node_voltage_string(&self, node: &str) -> String {
        format!("V({node})")
    }
}

/// An LTspice schematic owns its analysis directives, so declared analyses
/// are checked against the decoded output instead of being rendered into a
/// deck. An empty declaration accepts whatever the schematic ran.
pub(crate) fn check_declared(declared: &[Analysis], produced: &[AnalysisData]) -> Result<()> {
    if declared.is_empty() {
        return Ok(());
    }
    if declared.len() != produced.len() {
        return Err(ErrorSource::AnalysisCountMismatch {
            expected: declared.len(),
            found: produced.len(),
        }
        .into());
    }
    for (idx, (d, p)) in declared.iter().zip(produced).enumerate() {
        if d.analysis_type() != p.analysis_type() {
            return Err(ErrorSource::AnalysisMismatch {
                idx,
                declared: d.analysis_type(),
                produced: p.analysis_type(),
            }
            .into());
        }
    }
    Ok(())
}

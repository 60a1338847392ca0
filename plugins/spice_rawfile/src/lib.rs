//! Decoder for SPICE simulator rawfiles.
//!
//! Handles the ngspice dialect (UTF-8 headers, ASCII `Values:` or all-f64
//! binary sections) and the LTspice dialect (UTF-16LE headers, f32 samples
//! against an f64 time axis, negated compressed time points).

use error::Result;
pub use parser::Rawfile;
use parser::{Analysis, Variable};

pub mod error;
pub mod parser;

/// Parse the given rawfile data.
pub fn parse<T>(input: &T) -> Result<Rawfile>
where
    T: AsRef<[u8]> + ?Sized,
{
    parser::parse_rawfile(input.as_ref())
}

impl Rawfile {
    /// Returns an iterator over the plots in this rawfile.
    pub fn plots(&self) -> impl Iterator<Item = &Analysis> {
        self.analyses.iter()
    }
}

impl Analysis {
    /// True if this plot holds complex data.
    pub fn is_complex(&self) -> bool {
        self.data.complex().is_some()
    }

    /// Returns an iterator over the trace names recorded in this plot.
    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.trim())
    }

    /// Returns the column index and declaration of the named trace.
    pub fn variable_named(&self, name: impl AsRef<str>) -> Option<(usize, &Variable)> {
        let name = name.as_ref();
        self.variables
            .iter()
            .enumerate()
            .find(|(_, v)| v.name.trim() == name)
    }
}

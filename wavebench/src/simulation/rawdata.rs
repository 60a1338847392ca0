//! Conversion from decoded rawfiles into analysis data.
//!
//! Both batch backends produce rawfiles, so the mapping from rawfile plots
//! to [`AnalysisData`] lives here rather than in each plugin.

use std::collections::HashMap;

use spice_rawfile::parser::{Analysis as RawAnalysis, Data};
use spice_rawfile::Rawfile;

use super::{
    AcData, AnalysisData, AnalysisType, ComplexSignal, DcData, OpData, Quantity, RealSignal,
    ScalarSignal, TranData,
};
use crate::error::{ErrorSource, Result};
use crate::log::warn;

/// Converts every plot in `raw`, in file order.
pub fn analyses_from_rawfile(raw: Rawfile) -> Result<Vec<AnalysisData>> {
    raw.analyses.into_iter().map(convert_plot).collect()
}

/// Classifies a plot by its plotname.
pub fn plot_type(raw: &RawAnalysis) -> Result<AnalysisType> {
    let name = raw.plotname.to_lowercase();
    if name.contains("transient") {
        Ok(AnalysisType::Tran)
    } else if name.contains("ac analysis") {
        Ok(AnalysisType::Ac)
    } else if name.contains("operating") {
        Ok(AnalysisType::Op)
    } else if name.contains("dc transfer") {
        Ok(AnalysisType::Dc)
    } else {
        Err(ErrorSource::UnrecognizedPlot(raw.plotname.clone()).into())
    }
}

fn convert_plot(raw: RawAnalysis) -> Result<AnalysisData> {
    match plot_type(&raw)? {
        AnalysisType::Tran => convert_tran(raw).map(AnalysisData::Tran),
        AnalysisType::Ac => convert_ac(raw).map(AnalysisData::Ac),
        AnalysisType::Op => convert_op(raw).map(AnalysisData::Op),
        AnalysisType::Dc => convert_dc(raw).map(AnalysisData::Dc),
        AnalysisType::Other => Err(ErrorSource::UnrecognizedPlot(raw.plotname).into()),
    }
}

fn real_columns(raw: RawAnalysis) -> Result<(Vec<spice_rawfile::parser::Variable>, Vec<Vec<f64>>)> {
    let RawAnalysis {
        plotname,
        variables,
        data,
        ..
    } = raw;
    match data {
        Data::Real(cols) => Ok((variables, cols)),
        Data::Complex(_) => Err(ErrorSource::Internal(format!(
            "plot {plotname:?} holds complex data where real data was expected"
        ))
        .into()),
    }
}

fn convert_tran(raw: RawAnalysis) -> Result<TranData> {
    let (variables, cols) = real_columns(raw)?;
    let mut map = HashMap::with_capacity(variables.len().saturating_sub(1));
    let mut time = None;
    for (values, var) in cols.into_iter().zip(variables.iter()) {
        let sig = RealSignal {
            values,
            quantity: quantity(&var.unit),
        };
        if var.name.trim() == "time" {
            time = Some(sig);
        } else {
            map.insert(var.name.trim().to_string(), sig);
        }
    }
    let time = time.ok_or_else(|| ErrorSource::SignalNotFound("time".to_string()))?;
    Ok(TranData { data: map, time })
}

fn convert_ac(raw: RawAnalysis) -> Result<AcData> {
    let RawAnalysis {
        plotname,
        variables,
        data,
        ..
    } = raw;
    let cols = match data {
        Data::Complex(cols) => cols,
        Data::Real(_) => {
            return Err(ErrorSource::Internal(format!(
                "plot {plotname:?} holds real data where complex data was expected"
            ))
            .into())
        }
    };

    let mut map = HashMap::with_capacity(variables.len().saturating_sub(1));
    let mut freq = None;
    for (col, var) in cols.into_iter().zip(variables.iter()) {
        if var.name.trim() == "frequency" {
            freq = Some(RealSignal {
                values: col.real,
                quantity: Quantity::Frequency,
            });
        } else {
            map.insert(
                var.name.trim().to_string(),
                ComplexSignal {
                    real: col.real,
                    imag: col.imag,
                    quantity: quantity(&var.unit),
                },
            );
        }
    }

    let freq = freq.ok_or_else(|| ErrorSource::SignalNotFound("frequency".to_string()))?;
    Ok(AcData { data: map, freq })
}

fn convert_op(raw: RawAnalysis) -> Result<OpData> {
    let (variables, cols) = real_columns(raw)?;
    let mut map = HashMap::with_capacity(variables.len());
    for (values, var) in cols.into_iter().zip(variables.iter()) {
        if values.len() != 1 {
            return Err(ErrorSource::Internal(format!(
                "operating point trace {:?} has {} samples",
                var.name.trim(),
                values.len()
            ))
            .into());
        }
        map.insert(
            var.name.trim().to_string(),
            ScalarSignal {
                value: values[0],
                quantity: quantity(&var.unit),
            },
        );
    }
    Ok(OpData { data: map })
}

fn convert_dc(raw: RawAnalysis) -> Result<DcData> {
    let (variables, cols) = real_columns(raw)?;
    let mut map = HashMap::with_capacity(variables.len());
    for (values, var) in cols.into_iter().zip(variables.iter()) {
        map.insert(
            var.name.trim().to_string(),
            RealSignal {
                values,
                quantity: quantity(&var.unit),
            },
        );
    }
    Ok(DcData { data: map })
}

fn quantity(unit: &str) -> Quantity {
    match unit.trim() {
        "voltage" => Quantity::Voltage,
        "current" | "device_current" | "subckt_current" => Quantity::Current,
        "frequency" => Quantity::Frequency,
        "time" => Quantity::Time,
        "temp" | "temp-sweep" | "temperature" => Quantity::Temperature,
        other => {
            warn!("unrecognized quantity: {other}");
            Quantity::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAN_RAW: &str = "Title: conditioning
Date: Thu Aug  6 12:00:00 2026
Plotname: Transient Analysis
Flags: real
No. Variables: 2
No. Points: 3
Variables:
\t0\ttime\ttime
\t1\tV(out)\tvoltage
Values:
0\t0.0
\t0.1
1\t1e-3
\t0.2
2\t2e-3
\t0.3
";

    #[test]
    fn converts_transient_plots() {
        let raw = spice_rawfile::parse(TRAN_RAW).unwrap();
        let data = analyses_from_rawfile(raw).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].analysis_type(), AnalysisType::Tran);

        let tran = data[0].tran();
        assert_eq!(tran.time.quantity, Quantity::Time);
        assert_eq!(tran.time.values, vec![0.0, 1e-3, 2e-3]);

        let vout = tran.signal("V(out)").unwrap();
        assert_eq!(vout.quantity, Quantity::Voltage);
        assert_eq!(vout.len(), tran.time.len());
    }

    #[test]
    fn converts_operating_points() {
        let raw = "Title: conditioning
Date: d
Plotname: Operating Point
Flags: real
No. Variables: 2
No. Points: 1
Variables:
\t0\tv(out)\tvoltage
\t1\ti(v1)\tcurrent
Values:
0\t2.5
\t-1e-3
";
        let raw = spice_rawfile::parse(raw).unwrap();
        let data = analyses_from_rawfile(raw).unwrap();
        let op = data[0].op();
        assert_eq!(op.signal("v(out)").unwrap().value, 2.5);
        assert_eq!(op.signal("i(v1)").unwrap().quantity, Quantity::Current);
    }

    #[test]
    fn unknown_plotname_is_an_error() {
        let raw = "Title: t
Date: d
Plotname: Noise Spectral Density
Flags: real
No. Variables: 1
No. Points: 1
Variables:
\t0\tonoise\tvoltage
Values:
0\t1.0
";
        let raw = spice_rawfile::parse(raw).unwrap();
        let err = analyses_from_rawfile(raw).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::UnrecognizedPlot(name) if name == "Noise Spectral Density"
        ));
    }

    #[test]
    fn missing_time_axis_is_an_error() {
        let raw = "Title: t
Date: d
Plotname: Transient Analysis
Flags: real
No. Variables: 1
No. Points: 1
Variables:
\t0\tV(out)\tvoltage
Values:
0\t1.0
";
        let raw = spice_rawfile::parse(raw).unwrap();
        let err = analyses_from_rawfile(raw).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::SignalNotFound(name) if name == "time"
        ));
    }
}

//! Rawfile parsing.
//!
//! A rawfile is a sequence of plots. Each plot carries a line-oriented text
//! header (`Title:`, `Plotname:`, `Flags:`, `No. Variables:`, `No. Points:`,
//! a `Variables:` table) followed by a data section introduced by a
//! `Values:` (ASCII) or `Binary:` marker. ngspice writes UTF-8 headers with
//! all-f64 binary data; LTspice writes UTF-16LE headers and stores transient
//! samples as f32 against an f64 time axis.

use std::str;

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_till, take_till1};
use nom::character::complete::{char, digit1, line_ending, multispace0, multispace1, space1};
use nom::combinator::{eof, map, map_res};
use nom::multi::{many0, many1};
use nom::number::complete::{double, le_f32, le_f64};
use nom::sequence::{preceded, separated_pair, terminated};
use nom::IResult;
use serde::Serialize;

use crate::error::{Error, Result};


/// A parsed rawfile: one entry per plot in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rawfile {
    pub analyses: Vec<Analysis>,
}

/// A single plot from a rawfile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub title: String,
    pub date: String,
    pub plotname: String,
    pub flags: Vec<String>,
    pub command: String,
    pub offset: f64,
    pub num_points: usize,
    pub variables: Vec<Variable>,
    pub data: Data,
}

/// One column declaration from the `Variables:` table.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Variable {
    pub idx: usize,
    pub name: String,
    pub unit: String,
}

/// Decoded sample columns, one per variable, aligned by point index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Data {
    Real(Vec<Vec<f64>>),
    Complex(Vec<ComplexValues>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexValues {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

impl Data {
    /// Returns the real columns.
    ///
    /// # Panics
    ///
    /// Panics if this plot holds complex data.
    pub fn unwrap_real(self) -> Vec<Vec<f64>> {
        match self {
            Self::Real(cols) => cols,
            Self::Complex(_) => panic!("expected real data, got complex data"),
        }
    }

    /// Returns the complex columns.
    ///
    /// # Panics
    ///
    /// Panics if this plot holds real data.
    pub fn unwrap_complex(self) -> Vec<ComplexValues> {
        match self {
            Self::Complex(cols) => cols,
            Self::Real(_) => panic!("expected complex data, got real data"),
        }
    }

    pub fn real(&self) -> Option<&Vec<Vec<f64>>> {
        match self {
            Self::Real(cols) => Some(cols),
            Self::Complex(_) => None,
        }
    }

    pub fn complex(&self) -> Option<&Vec<ComplexValues>> {
        match self {
            Self::Complex(cols) => Some(cols),
            Self::Real(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Encoding {
    Utf8,
    Utf16le,
}

impl Encoding {
    fn detect(bytes: &[u8]) -> Encoding {
        if bytes.len() >= 2 && (bytes[..2] == [0xFF, 0xFE] || (bytes[1] == 0 && bytes[0] != 0)) {
            Encoding::Utf16le
        } else {
            Encoding::Utf8
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|_| Error::Header("invalid UTF-8 in rawfile header".to_string())),
            Encoding::Utf16le => {
                let bytes = bytes.strip_prefix(&[0xFF, 0xFE][..]).unwrap_or(bytes);
                if bytes.len() % 2 != 0 {
                    return Err(Error::Header(
                        "odd-length UTF-16 rawfile header".to_string(),
                    ));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map_err(|_| Error::Header("invalid UTF-16 in rawfile header".to_string()))
            }
        }
    }

    fn encode_ascii(self, s: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => s.as_bytes().to_vec(),
            Encoding::Utf16le => s.bytes().flat_map(|b| [b, 0]).collect(),
        }
    }

    /// Number of bytes `s` occupies in this encoding.
    fn byte_len(self, s: &str) -> usize {
        match self {
            Encoding::Utf8 => s.len(),
            Encoding::Utf16le => s.chars().map(char::len_utf16).sum::<usize>() * 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Section {
    Values,
    Binary,
}

#[derive(Debug, Default)]
struct Header {
    title: String,
    date: String,
    plotname: String,
    flags: Vec<String>,
    command: String,
    offset: f64,
    num_points: usize,
    variables: Vec<Variable>,
}

impl Header {
    fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    fn into_analysis(self, data: Data) -> Analysis {
        Analysis {
            title: self.title,
            date: self.date,
            plotname: self.plotname,
            flags: self.flags,
            command: self.command,
            offset: self.offset,
            num_points: self.num_points,
            variables: self.variables,
            data,
        }
    }
}

pub(crate) fn parse_rawfile(input: &[u8]) -> Result<Rawfile> {
    let mut analyses = Vec::new();
    let mut rest = input;
    while !is_blank(rest) {
        let (consumed, analysis) = parse_plot(rest)?;
        analyses.push(analysis);
        rest = &rest[consumed..];
    }
    if analyses.is_empty() {
        return Err(Error::Header("rawfile contains no plots".to_string()));
    }
    Ok(Rawfile { analyses })
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0 || b.is_ascii_whitespace())
}

fn parse_plot(bytes: &[u8]) -> Result<(usize, Analysis)> {
    let enc = Encoding::detect(bytes);
    let (section, marker_start, data_start) = find_section(bytes, enc)?;
    let header_text = enc.decode(&bytes[..marker_start])?;
    let header = parse_header(&header_text)?;

    if header.flag("fastaccess") {
        return Err(Error::Unsupported(
            "fastaccess (column-major) rawfiles".to_string(),
        ));
    }

    let complex = header.flag("complex");
    match section {
        Section::Binary => {
            let (consumed, data) = parse_binary(&bytes[data_start..], &header, complex)?;
            Ok((data_start + consumed, header.into_analysis(data)))
        }
        Section::Values => {
            let text = enc.decode(&bytes[data_start..])?;
            let (consumed, data) = parse_values(&text, &header, complex)?;
            let consumed = enc.byte_len(&text[..consumed]);
            Ok((data_start + consumed, header.into_analysis(data)))
        }
    }
}

/// Locates the earliest `Values:`/`Binary:` marker at the start of a line.
/// Returns the section kind, the marker's byte offset, and the byte offset
/// of the first data byte (just past the marker line's newline).
fn find_section(bytes: &[u8], enc: Encoding) -> Result<(Section, usize, usize)> {
    let nl = enc.encode_ascii("\n");
    let bin = enc.encode_ascii("Binary:");
    let val = enc.encode_ascii("Values:");
    let b = find_at_line_start(bytes, &bin, &nl).map(|i| (Section::Binary, i, bin.len()));
    let v = find_at_line_start(bytes, &val, &nl).map(|i| (Section::Values, i, val.len()));

    let (section, start, marker_len) = match (b, v) {
        (Some(b), Some(v)) => {
            if b.1 <= v.1 {
                b
            } else {
                v
            }
        }
        (Some(b), None) => b,
        (None, Some(v)) => v,
        (None, None) => {
            return Err(Error::Header(
                "missing Values:/Binary: section marker".to_string(),
            ))
        }
    };

    let after = start + marker_len;
    let data_start = match find_subsequence(&bytes[after..], &nl) {
        Some(i) => after + i + nl.len(),
        None => bytes.len(),
    };
    Ok((section, start, data_start))
}

fn find_at_line_start(haystack: &[u8], needle: &[u8], nl: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = find_subsequence(&haystack[from..], needle).map(|i| i + from) {
        if i == 0 || haystack[..i].ends_with(nl) {
            return Some(i);
        }
        from = i + 1;
    }
    None
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

enum Field<'a> {
    Title(&'a str),
    Date(&'a str),
    Plotname(&'a str),
    Flags(&'a str),
    NumVariables(&'a str),
    NumPoints(&'a str),
    Command(&'a str),
    Offset(&'a str),
    Variables(Vec<Variable>),
    Other,
}

fn is_newline(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn rest_of_line(input: &str) -> IResult<&str, &str> {
    terminated(take_till(is_newline), alt((line_ending, eof)))(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn keyed<'a>(key: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(tag_no_case(key), rest_of_line)
}

fn variable_line(input: &str) -> IResult<&str, Variable> {
    let (input, _) = space1(input)?;
    let (input, idx) = map_res(digit1, str::parse)(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = token(input)?;
    let (input, _) = space1(input)?;
    let (input, unit) = token(input)?;
    // Trailing per-variable parameters (min/max/color hints) are ignored.
    let (input, _) = rest_of_line(input)?;
    Ok((
        input,
        Variable {
            idx,
            name: name.to_string(),
            unit: unit.to_string(),
        },
    ))
}

fn variables_block(input: &str) -> IResult<&str, Vec<Variable>> {
    let (input, _) = tag_no_case("Variables:")(input)?;
    let (input, _) = rest_of_line(input)?;
    many1(variable_line)(input)
}

fn other_line(input: &str) -> IResult<&str, ()> {
    let (input, _) = take_till1(|c| c == ':' || is_newline(c))(input)?;
    let (input, _) = char(':')(input)?;
    let (input, _) = rest_of_line(input)?;
    Ok((input, ()))
}

fn field(input: &str) -> IResult<&str, Field> {
    alt((
        map(variables_block, Field::Variables),
        map(keyed("Title:"), Field::Title),
        map(keyed("Date:"), Field::Date),
        map(keyed("Plotname:"), Field::Plotname),
        map(keyed("Flags:"), Field::Flags),
        map(keyed("No. Variables:"), Field::NumVariables),
        map(keyed("No. Points:"), Field::NumPoints),
        map(keyed("Command:"), Field::Command),
        map(keyed("Offset:"), Field::Offset),
        map(other_line, |_| Field::Other),
    ))(input)
}

fn parse_header(input: &str) -> Result<Header> {
    let (rest, fields) = many0(preceded(multispace0, field))(input)
        .map_err(|_| Error::Header("malformed plot header".to_string()))?;
    if !rest.trim().is_empty() {
        return Err(Error::Header(format!(
            "unrecognized header content near {:?}",
            rest.trim().lines().next().unwrap_or_default()
        )));
    }

    let mut header = Header::default();
    let mut num_variables = None;
    let mut num_points = None;
    for f in fields {
        match f {
            Field::Title(v) => header.title = v.trim().to_string(),
            Field::Date(v) => header.date = v.trim().to_string(),
            Field::Plotname(v) => header.plotname = v.trim().to_string(),
            Field::Flags(v) => {
                header.flags = v.split_whitespace().map(str::to_string).collect()
            }
            Field::NumVariables(v) => num_variables = Some(parse_count(v, "No. Variables")?),
            Field::NumPoints(v) => num_points = Some(parse_count(v, "No. Points")?),
            Field::Command(v) => header.command = v.trim().to_string(),
            Field::Offset(v) => {
                header.offset = v.trim().parse().map_err(|_| {
                    Error::Header(format!("invalid Offset: {:?}", v.trim()))
                })?
            }
            Field::Variables(vars) => header.variables = vars,
            Field::Other => {}
        }
    }

    if header.plotname.is_empty() {
        return Err(Error::Header("missing Plotname".to_string()));
    }
    let num_variables =
        num_variables.ok_or_else(|| Error::Header("missing No. Variables".to_string()))?;
    header.num_points =
        num_points.ok_or_else(|| Error::Header("missing No. Points".to_string()))?;
    if header.variables.is_empty() {
        return Err(Error::Header("missing Variables table".to_string()));
    }
    if header.variables.len() != num_variables {
        return Err(Error::Header(format!(
            "No. Variables is {} but the Variables table lists {}",
            num_variables,
            header.variables.len()
        )));
    }

    Ok(header)
}

fn parse_count(value: &str, key: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Header(format!("invalid {key}: {:?}", value.trim())))
}

fn ascii_real_point<'a>(input: &'a str, nvars: usize) -> IResult<&'a str, Vec<f64>> {
    let (input, _) = multispace0(input)?;
    let (input, _idx) = digit1(input)?;
    let mut vals = Vec::with_capacity(nvars);
    let mut rest = input;
    for _ in 0..nvars {
        let (r, v) = preceded(multispace1, double)(rest)?;
        vals.push(v);
        rest = r;
    }
    Ok((rest, vals))
}

fn ascii_complex_point<'a>(input: &'a str, nvars: usize) -> IResult<&'a str, Vec<(f64, f64)>> {
    let (input, _) = multispace0(input)?;
    let (input, _idx) = digit1(input)?;
    let mut vals = Vec::with_capacity(nvars);
    let mut rest = input;
    for _ in 0..nvars {
        let (r, v) = preceded(multispace1, separated_pair(double, char(','), double))(rest)?;
        vals.push(v);
        rest = r;
    }
    Ok((rest, vals))
}

/// Parses an ASCII `Values:` section. Returns the number of consumed chars
/// (in `str` length terms) along with the decoded columns.
fn parse_values(text: &str, header: &Header, complex: bool) -> Result<(usize, Data)> {
    let n = header.variables.len();
    let points = header.num_points;
    let mut rest = text;

    let data = if complex {
        let mut real = vec![Vec::with_capacity(points); n];
        let mut imag = vec![Vec::with_capacity(points); n];
        for point in 0..points {
            let (r, vals) = ascii_complex_point(rest, n).map_err(|_| {
                Error::Data(format!("ASCII data section ends early at point {point}"))
            })?;
            rest = r;
            for (col, (re, im)) in vals.into_iter().enumerate() {
                real[col].push(re);
                imag[col].push(im);
            }
        }
        Data::Complex(
            real.into_iter()
                .zip(imag)
                .map(|(real, imag)| ComplexValues { real, imag })
                .collect(),
        )
    } else {
        let mut cols = vec![Vec::with_capacity(points); n];
        for point in 0..points {
            let (r, vals) = ascii_real_point(rest, n).map_err(|_| {
                Error::Data(format!("ASCII data section ends early at point {point}"))
            })?;
            rest = r;
            for (col, v) in vals.into_iter().enumerate() {
                cols[col].push(v);
            }
        }
        Data::Real(cols)
    };

    Ok((text.len() - rest.len(), data))
}

/// Parses a binary data section. The layout is chosen from the header flags
/// and the available byte budget: all-f64 point-major (ngspice, and LTspice
/// with the `double` flag), or f64 time followed by f32 samples per point
/// (LTspice transient data).
fn parse_binary(bytes: &[u8], header: &Header, complex: bool) -> Result<(usize, Data)> {
    let n = header.variables.len();
    let points = header.num_points;

    if complex {
        let need = points * n * 16;
        if bytes.len() < need {
            return Err(truncated(bytes.len(), need));
        }
        let mut real = vec![Vec::with_capacity(points); n];
        let mut imag = vec![Vec::with_capacity(points); n];
        let mut rest = bytes;
        for _ in 0..points {
            for col in 0..n {
                let (r, re) = read_f64(rest, need)?;
                let (r, im) = read_f64(r, need)?;
                real[col].push(re);
                imag[col].push(im);
                rest = r;
            }
        }
        let cols = real
            .into_iter()
            .zip(imag)
            .map(|(real, imag)| ComplexValues { real, imag })
            .collect();
        return Ok((need, Data::Complex(cols)));
    }

    let need64 = points * n * 8;
    let need32 = points * (8 + (n - 1) * 4);
    let mut cols = vec![Vec::with_capacity(points); n];

    if header.flag("double") || bytes.len() >= need64 {
        // Prefer the all-f64 layout when the byte budget allows: ngspice
        // always writes it, and LTspice compact files are single-plot, so
        // their data section is never followed by more plot bytes.
        if bytes.len() < need64 {
            return Err(truncated(bytes.len(), need64));
        }
        let mut rest = bytes;
        for _ in 0..points {
            for col in cols.iter_mut() {
                let (r, v) = read_f64(rest, need64)?;
                col.push(v);
                rest = r;
            }
        }
        Ok((need64, Data::Real(cols)))
    } else if bytes.len() >= need32 {
        let mut rest = bytes;
        for _ in 0..points {
            let (r, t) = read_f64(rest, need32)?;
            // LTspice negates the stored time of points retained by its
            // second-order compression.
            cols[0].push(t.abs());
            rest = r;
            for col in cols[1..].iter_mut() {
                let (r, v) = read_f32(rest, need32)?;
                col.push(f64::from(v));
                rest = r;
            }
        }
        Ok((need32, Data::Real(cols)))
    } else {
        Err(truncated(bytes.len(), need32))
    }
}

fn truncated(got: usize, need: usize) -> Error {
    Error::Data(format!(
        "binary data section holds {got} bytes but the header requires {need}"
    ))
}

fn read_f64(input: &[u8], need: usize) -> Result<(&[u8], f64)> {
    le_f64::<_, nom::error::Error<&[u8]>>(input).map_err(|_| truncated(input.len(), need))
}

fn read_f32(input: &[u8], need: usize) -> Result<(&[u8], f32)> {
    le_f32::<_, nom::error::Error<&[u8]>>(input).map_err(|_| truncated(input.len(), need))
}

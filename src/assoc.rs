/*
    writer for Mathematica associations: <| "key" -> value, ... |>

    files written here are read back with Get[filename]. decimals are emitted in
    fixed precision scientific notation, e.g. -4.32100*10^-03. a closed file can
    be reopened and extended; its closing |> is dropped before new keys go in.
*/

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

const OPEN: &str = "<|\n";
const CLOSE: &str = "|>";
const BASE_TEN: &str = "*10^";
const LIST_DELIM: &str = ", ";
const ENTRY_DELIM: &str = ",\n";

/// Arbitrarily nested list of decimals, leaves are flat arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedList {
    Leaf(Vec<f64>),
    Node(Vec<NestedList>),
}

/// `number` with `precision` digits after the point, as `d.ddd*10^+XX`.
pub fn scientific(number: f64, precision: usize) -> String {
    if number.is_nan() {
        return "Indeterminate".to_string();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let raw = format!("{:.*e}", precision, number);
    // rust prints e.g. 1.23e3 / 1.23e-3, the exponent is always a valid integer
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}{}{:02}", mantissa, BASE_TEN, sign, exponent.abs())
}

pub fn double_list(values: &[f64], precision: usize) -> String {
    let items: Vec<String> = values.iter().map(|&v| scientific(v, precision)).collect();
    format!("{{{}}}", items.join(LIST_DELIM))
}

fn int_list<T: ToString>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("{{{}}}", items.join(LIST_DELIM))
}

// outer braces on their own lines, one inner list per line
fn block(inner: Vec<String>) -> String {
    format!("{{\n{}\n}}", inner.join(ENTRY_DELIM))
}

fn nested_list(list: &NestedList, precision: usize) -> String {
    match list {
        NestedList::Leaf(values) => double_list(values, precision),
        NestedList::Node(children) => {
            block(children.iter().map(|c| nested_list(c, precision)).collect())
        }
    }
}

/// Incremental association writer. Nothing is valid until [`AssocWriter::close`].
pub struct AssocWriter<W: Write> {
    out: W,
    empty: bool,
}

impl AssocWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        AssocWriter::new(BufWriter::new(file))
    }

    /// Reopens a closed association so further keys land inside it.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let body = contents
            .trim_end()
            .strip_suffix(CLOSE)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} does not end in a closed association", path.as_ref().display()),
                )
            })?
            .trim_end();
        let empty = body.ends_with("<|");

        file.set_len(body.len() as u64)?;
        file.seek(SeekFrom::End(0))?;
        log::debug!("appending to association in {}", path.as_ref().display());

        let mut out = BufWriter::new(file);
        if empty {
            // put back the newline a fresh file has after "<|"
            out.write_all(b"\n")?;
        }
        Ok(AssocWriter { out, empty })
    }
}

impl<W: Write> AssocWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(OPEN.as_bytes())?;
        Ok(AssocWriter { out, empty: true })
    }

    fn entry(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.empty {
            self.out.write_all(ENTRY_DELIM.as_bytes())?;
        }
        self.empty = false;
        write!(self.out, "\"{}\" -> {}", key, value)?;
        Ok(())
    }

    pub fn write_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.entry(key, &format!("\"{}\"", value))
    }

    pub fn write_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.entry(key, &value.to_string())
    }

    pub fn write_double(&mut self, key: &str, value: f64, precision: usize) -> Result<()> {
        self.entry(key, &scientific(value, precision))
    }

    pub fn write_int_array(&mut self, key: &str, values: &[i64]) -> Result<()> {
        self.entry(key, &int_list(values))
    }

    pub fn write_unsigned_array(&mut self, key: &str, values: &[u64]) -> Result<()> {
        self.entry(key, &int_list(values))
    }

    pub fn write_double_array(&mut self, key: &str, values: &[f64], precision: usize) -> Result<()> {
        self.entry(key, &double_list(values, precision))
    }

    /// Once-nested rectangular list, every row the same length.
    pub fn write_double_matrix(&mut self, key: &str, rows: &[Vec<f64>], precision: usize) -> Result<()> {
        if let Some(first) = rows.first() {
            if rows.iter().any(|r| r.len() != first.len()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("rows of \"{}\" differ in length", key),
                )
                .into());
            }
        }
        let inner: Vec<String> = rows.iter().map(|r| double_list(r, precision)).collect();
        self.entry(key, &format!("{{{}}}", inner.join(LIST_DELIM)))
    }

    /// Inner arrays may differ in length.
    pub fn write_ragged_int_array(&mut self, key: &str, rows: &[Vec<i64>]) -> Result<()> {
        self.entry(key, &block(rows.iter().map(|r| int_list(r)).collect()))
    }

    /// Inner arrays may differ in length.
    pub fn write_ragged_double_array(
        &mut self,
        key: &str,
        rows: &[Vec<f64>],
        precision: usize,
    ) -> Result<()> {
        self.entry(
            key,
            &block(rows.iter().map(|r| double_list(r, precision)).collect()),
        )
    }

    pub fn write_nested_list(&mut self, key: &str, list: &NestedList, precision: usize) -> Result<()> {
        self.entry(key, &nested_list(list, precision))
    }

    pub fn close(mut self) -> Result<W> {
        if !self.empty {
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(CLOSE.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}

//! Plain-Text Result File
//!
//! ```text
//! <label>:
//! \tmean:\t<float>
//! \tstdev:\t<float>
//! \t#:\t<integer>
//! ...
//!
//!
//! <verdict>
//! ```

use crate::report::{OperationStats, ReportError, RunReport};
use sdxbench_stats::Distribution;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the result file body for `report`
pub fn write_result<W: Write>(report: &RunReport, out: &mut W) -> std::io::Result<()> {
    for op in &report.operations {
        write_block(op, out)?;
    }
    write_verdict(report, out)
}

fn write_block<W: Write + ?Sized>(op: &OperationStats, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}:", op.label)?;
    writeln!(out, "\tmean:\t{}", op.mean)?;
    writeln!(out, "\tstdev:\t{}", op.std_dev)?;
    writeln!(out, "\t#:\t{}", op.n)
}

fn write_verdict<W: Write + ?Sized>(report: &RunReport, out: &mut W) -> std::io::Result<()> {
    write!(out, "\n\n{}\n", report.verdict)
}

/// Render the result file body as a string
pub fn render_result(report: &RunReport) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_result(report, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Compare, then write the result file at `path`.
///
/// Labels are checked before the file is touched, so a missing label leaves
/// no file behind. Each label is echoed to `console` as its block is written.
pub fn write_result_file(
    distributions: &[(String, Distribution)],
    path: &Path,
    console: &mut dyn Write,
) -> Result<RunReport, ReportError> {
    let report = RunReport::build(distributions)?;

    let mut file = BufWriter::new(File::create(path)?);
    for op in &report.operations {
        writeln!(console, "{}", op.label)?;
        write_block(op, &mut file)?;
    }
    write_verdict(&report, &mut file)?;
    file.flush()?;

    Ok(report)
}

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Write one SMILES per line, no header or index column
pub fn write_smi<S: AsRef<str>>(path: &Path, smiles: &[S]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for s in smiles {
        writeln!(writer, "{}", s.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the first tab-separated field of every non-empty line
pub fn read_smi(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(first) = line.split('\t').next().map(str::trim) {
            if !first.is_empty() {
                out.push(first.to_string());
            }
        }
    }
    Ok(out)
}

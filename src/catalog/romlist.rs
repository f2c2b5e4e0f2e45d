//! Raw romlist codec - semicolon-delimited catalog source files

use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::catalog::attribute::Attribute;
use crate::catalog::record::Record;

/// Errors from reading or writing a raw romlist
#[derive(Debug, Error)]
pub enum RomlistError {
    #[error("romlist io: {0}")]
    Io(#[from] std::io::Error),

    #[error("romlist parse: {0}")]
    Parse(#[from] csv::Error),
}

/// Read a romlist file into per-record column rows.
///
/// One record per line, `;`-delimited, `#` lines are comments. Short rows
/// fill with empty columns; anything past the known column count is ignored.
pub fn read(path: &Path) -> Result<Vec<Vec<String>>, RomlistError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(
            row.iter()
                .take(Attribute::LOADED.len())
                .map(String::from)
                .collect(),
        );
    }
    Ok(rows)
}

/// Write records back out in canonical romlist form
pub fn write<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a Record>,
) -> Result<(), RomlistError> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", header_line())?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(file);

    for record in records {
        let row: Vec<&str> = Attribute::LOADED.iter().map(|a| record.get(*a)).collect();
        writer.write_record(&row)?;
    }
    writer.flush().map_err(RomlistError::Io)?;
    Ok(())
}

/// The comment line naming the romlist columns
fn header_line() -> String {
    let names: Vec<&str> = Attribute::LOADED.iter().map(|a| a.as_str()).collect();
    format!("#{}", names.join(";"))
}

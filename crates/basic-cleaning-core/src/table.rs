//! CSV in, CSV out. Header row required; column order is kept as read.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;

pub fn read_table(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        // Scan the whole file so a late non-integer price widens the column.
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Dates are written as `%Y-%m-%d`, nulls as empty fields.
pub fn write_table(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut output = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut output)?;
    Ok(())
}

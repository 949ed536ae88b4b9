use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Header-addressed table of string cells.
///
/// Every row has exactly `headers.len()` cells. Loaders concatenate tables
/// with differing columns, so missing cells are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Sets `name` to `value` on every row, adding the column if needed.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
        self
    }

    /// Projects onto `columns` in the given order. Duplicate names are
    /// kept once; a missing column is an error.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let mut names: Vec<&str> = Vec::with_capacity(columns.len());
        for col in columns {
            if !names.contains(col) {
                names.push(col);
            }
        }
        let mut indexes = Vec::with_capacity(names.len());
        for name in &names {
            let idx = self
                .column_index(name)
                .ok_or_else(|| anyhow!("missing column {name}"))?;
            indexes.push(idx);
        }

        let mut out = Table::new(names.iter().map(|s| s.to_string()).collect());
        for row in &self.rows {
            out.rows
                .push(indexes.iter().map(|idx| row[*idx].clone()).collect());
        }
        Ok(out)
    }

    pub fn tail(&self, n: usize) -> Table {
        let start = self.rows.len().saturating_sub(n);
        Table {
            headers: self.headers.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    /// Keeps the rows whose `column` cell satisfies `keep`. A missing column
    /// leaves the table untouched.
    pub fn retain_by(&mut self, column: &str, mut keep: impl FnMut(&str) -> bool) {
        let Some(idx) = self.column_index(column) else {
            return;
        };
        self.rows.retain(|row| keep(&row[idx]));
    }

    /// Stacks tables vertically. Columns are the union of all headers in
    /// first-seen order.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for table in tables {
            let mut mapping = Vec::with_capacity(table.headers.len());
            for header in &table.headers {
                let idx = match positions.get(header) {
                    Some(idx) => *idx,
                    None => {
                        let idx = out.headers.len();
                        positions.insert(header.clone(), idx);
                        out.headers.push(header.clone());
                        for row in &mut out.rows {
                            row.push(String::new());
                        }
                        idx
                    }
                };
                mapping.push(idx);
            }

            let width = out.headers.len();
            for row in table.rows {
                let mut cells = vec![String::new(); width];
                for (cell, idx) in row.into_iter().zip(&mapping) {
                    cells[*idx] = cell;
                }
                out.rows.push(cells);
            }
        }
        out
    }

    /// Decodes every row into `T` by header name.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let headers = StringRecord::from(self.headers.clone());
        let mut out = Vec::with_capacity(self.rows.len());
        for (line, row) in self.rows.iter().enumerate() {
            let record = StringRecord::from(row.clone());
            let item = record
                .deserialize::<T>(Some(&headers))
                .with_context(|| format!("decode row {}", line + 1))?;
            out.push(item);
        }
        Ok(out)
    }

    /// Like [`Table::deserialize`], but rows that fail to decode are logged
    /// and dropped. Returns the decoded rows and the number dropped.
    pub fn deserialize_lenient<T: DeserializeOwned>(&self) -> (Vec<T>, usize) {
        let headers = StringRecord::from(self.headers.clone());
        let mut out = Vec::with_capacity(self.rows.len());
        let mut dropped = 0usize;
        for (line, row) in self.rows.iter().enumerate() {
            let record = StringRecord::from(row.clone());
            match record.deserialize::<T>(Some(&headers)) {
                Ok(item) => out.push(item),
                Err(err) => {
                    warn!(row = line + 1, error = %err, "dropping undecodable row");
                    dropped += 1;
                }
            }
        }
        (out, dropped)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Table> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .context("read csv header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut table = Table::new(headers);
        for record in rdr.records() {
            let record = record.context("read csv record")?;
            table.push_row(record.iter().map(|c| c.to_string()).collect());
        }
        Ok(table)
    }

    pub fn from_csv_str(raw: &str) -> Result<Table> {
        Table::from_reader(raw.as_bytes())
    }

    pub fn read_csv(path: &Path) -> Result<Table> {
        let file =
            fs::File::open(path).with_context(|| format!("open csv {}", path.display()))?;
        Table::from_reader(file).with_context(|| format!("parse csv {}", path.display()))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)
            .context("write csv header")?;
        for row in &self.rows {
            wtr.write_record(row).context("write csv record")?;
        }
        wtr.flush().context("flush csv")?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        let file =
            fs::File::create(path).with_context(|| format!("create csv {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("write csv {}", path.display()))
    }
}

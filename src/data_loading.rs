use crate::error::{AnalysisError, Result};
use csv::StringRecord;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Cell contents treated as a missing value (same set pandas uses by default)
const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// An uploaded CSV file: header row plus the data rows as strings
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl Table {
    pub fn from_reader<R: Read>(reader: R) -> Result<Table> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true) // Short rows read as missing cells
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Loaded {} rows with columns {:?}", rows.len(), headers);

        Ok(Table { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First `n` data rows
    pub fn head(&self, n: usize) -> &[StringRecord] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn read_csv_file(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    Table::from_reader(file)
}

pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

fn parse_cell<T: FromStr>(row: usize, column: &str, cell: &str) -> Result<T> {
    cell.trim()
        .parse::<T>()
        .map_err(|_| AnalysisError::InvalidValue {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        })
}

/// Numeric values of a column with missing cells dropped, paired with their row index.
/// Any spelling that parses to NaN counts as missing.
pub fn numeric_column_dropna(table: &Table, index: usize) -> Result<Vec<(usize, f64)>> {
    let column = &table.headers[index];
    let mut values = Vec::with_capacity(table.len());
    let mut dropped = 0;

    for (row, record) in table.rows.iter().enumerate() {
        let value = match record.get(index) {
            Some(cell) if !is_missing(cell) => parse_cell::<f64>(row, column, cell)?,
            _ => f64::NAN,
        };
        if value.is_nan() {
            dropped += 1;
        } else {
            values.push((row, value));
        }
    }

    debug!("Column '{}': {} values, {} missing dropped", column, values.len(), dropped);
    Ok(values)
}

/// Whether a column would load as floats rather than integers: some present
/// cell is not an integer literal, or some cell is missing
pub fn is_float_column(table: &Table, index: usize) -> bool {
    table.rows.iter().any(|record| match record.get(index) {
        Some(cell) if !is_missing(cell) => cell.trim().parse::<i64>().is_err(),
        _ => true,
    })
}

/// Numeric values of a column; every row must hold a number
pub fn numeric_column(table: &Table, index: usize) -> Result<Vec<f32>> {
    let column = &table.headers[index];
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row, record)| parse_cell(row, column, record.get(index).unwrap_or("")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        Table::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn reads_headers_and_rows() {
        let t = table("Time,PPG,Glucose_level\n0,1.5,90\n1,1.7,NaN\n");
        assert_eq!(t.headers, vec!["Time", "PPG", "Glucose_level"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column_index("Glucose_level"), Some(2));
        assert_eq!(t.column_index("glucose"), None);
        assert_eq!(t.head(5).len(), 2);
    }

    #[test]
    fn strips_byte_order_mark() {
        let t = table("\u{feff}Glucose_level\n90\n");
        assert_eq!(t.column_index("Glucose_level"), Some(0));
    }

    #[test]
    fn dropna_skips_missing_and_short_rows() {
        let t = table("id,Glucose_level\n0,90\n1,\n2,NA\n3\n4, 130.5 \n");
        let values = numeric_column_dropna(&t, 1).unwrap();
        assert_eq!(values, vec![(0, 90.0), (4, 130.5)]);
    }

    #[test]
    fn dropna_keeps_double_precision() {
        let t = table("Glucose_level\n99.999999\n124.9999999\n");
        let values = numeric_column_dropna(&t, 0).unwrap();
        assert_eq!(values, vec![(0, 99.999999), (1, 124.9999999)]);
        assert!(values[0].1 < 100.0);
        assert!(values[1].1 < 125.0);
    }

    #[test]
    fn dropna_treats_any_nan_spelling_as_missing() {
        let t = table("Glucose_level\nNAN\n+nan\nnAn\n90\ninf\n");
        let values = numeric_column_dropna(&t, 0).unwrap();
        assert_eq!(values, vec![(3, 90.0), (4, f64::INFINITY)]);
    }

    #[test]
    fn float_column_detection() {
        let ints = table("Glucose_level\n80\n110\n");
        assert!(!is_float_column(&ints, 0));
        let decimals = table("Glucose_level\n80\n99.9\n");
        assert!(is_float_column(&decimals, 0));
        let with_gap = table("Glucose_level\n80\nNA\n110\n");
        assert!(is_float_column(&with_gap, 0));
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let t = table("id,Glucose_level\n0,high\n");
        match numeric_column_dropna(&t, 1) {
            Err(AnalysisError::InvalidValue { row, column, value }) => {
                assert_eq!(row, 0);
                assert_eq!(column, "Glucose_level");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn strict_column_rejects_missing() {
        let t = table("t,ppg\n0,1.0\n1,\n");
        assert!(matches!(
            numeric_column(&t, 1),
            Err(AnalysisError::InvalidValue { row: 1, .. })
        ));
    }
}

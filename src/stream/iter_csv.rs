use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use crate::common::FType;
use crate::error::{HstError, Result};

/// Iterate over the rows of a CSV source as samples.
///
/// Every field of a row is parsed as a coordinate, in column order, after
/// dropping the first `skip_columns` fields (e.g. a timestamp).
///
/// # Example
///
/// ```
/// use halfspace_stream::stream::iter_csv::IterCsv;
///
/// let content = "time,x,y\n0,1.5,2.0\n1,1.6,2.1";
/// let rows: Vec<Vec<f32>> = IterCsv::<f32, &[u8]>::new(content.as_bytes(), 1)
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(rows, vec![vec![1.5, 2.0], vec![1.6, 2.1]]);
/// ```
pub struct IterCsv<F, R: std::io::Read> {
    reader: Reader<R>,
    headers: StringRecord,
    skip_columns: usize,
    record: StringRecord,
    n_records: u64,
    _float: PhantomData<F>,
}

impl<F: FType + FromStr, R: std::io::Read> IterCsv<F, R> {
    pub fn new(reader: R, skip_columns: usize) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = reader.headers()?.to_owned();
        Ok(Self {
            reader,
            headers,
            skip_columns,
            record: StringRecord::new(),
            n_records: 0,
            _float: PhantomData,
        })
    }

    /// Names of the columns that become coordinates.
    pub fn feature_names(&self) -> Vec<String> {
        self.headers
            .iter()
            .skip(self.skip_columns)
            .map(str::to_string)
            .collect()
    }

    fn parse_record(&self) -> Result<Vec<F>> {
        self.record
            .iter()
            .enumerate()
            .skip(self.skip_columns)
            .map(|(column, field)| {
                field.trim().parse::<F>().map_err(|_| HstError::InvalidField {
                    record: self.n_records,
                    column,
                    value: field.to_string(),
                })
            })
            .collect()
    }
}

impl<F: FType + FromStr> IterCsv<F, BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P, skip_columns: usize) -> Result<Self> {
        let file = File::open(path)?;
        IterCsv::new(BufReader::new(file), skip_columns)
    }
}

impl<F: FType + FromStr, R: std::io::Read> Iterator for IterCsv<F, R> {
    type Item = Result<Vec<F>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.n_records += 1;
                Some(self.parse_record())
            }
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reads_all_columns() {
        let content = "a,b,c\n1,2,3\n4,5,6\n";
        let iter = IterCsv::<f64, &[u8]>::new(content.as_bytes(), 0).unwrap();
        assert_eq!(iter.feature_names(), vec!["a", "b", "c"]);
        let rows: Vec<Vec<f64>> = iter.map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_skips_leading_columns() {
        let content = "ts,x\n2024-01-01,0.25\n";
        let iter = IterCsv::<f32, &[u8]>::new(content.as_bytes(), 1).unwrap();
        assert_eq!(iter.feature_names(), vec!["x"]);
        let rows: Vec<Vec<f32>> = iter.map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![vec![0.25]]);
    }

    #[test]
    fn test_invalid_field() {
        let content = "x,y\n1,2\n3,abc\n";
        let mut iter = IterCsv::<f64, &[u8]>::new(content.as_bytes(), 0).unwrap();
        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(HstError::InvalidField {
                record,
                column,
                value,
            }) => {
                assert_eq!(record, 2);
                assert_eq!(column, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        write!(file, "x,y\n0.5,0.5\n").expect("failed to write temp file");
        let rows: Vec<Vec<f64>> = IterCsv::from_path(file.path(), 0)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows, vec![vec![0.5, 0.5]]);
    }
}

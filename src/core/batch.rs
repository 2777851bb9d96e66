//! Offline recalculation of pre-recorded samples.
//!
//! Each input row carries the physical readings the live loop would have
//! produced; the same calculators turn it into one [`BatchRecord`].

use either::Either;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::core::cycle::{ComputeError, DuctFlow, Psychrometrics};
use crate::core::heat_gain::HeatGain;
use crate::core::record::{BatchRecord, Columns};
use crate::core::sink::{CsvSink, RecordSink, SinkError};
use crate::core::units::BarometricPressure;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch i/o: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("input has no `{column}` column")]
    MissingColumn { column: String },
    #[error("row {row}: `{column}` is not a number")]
    Parse { row: usize, column: String },
    #[error("row {row}: {source}")]
    Compute { row: usize, source: ComputeError },
}

/// Header names of the input columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchColumns {
    pub barometric_inhg: String,
    pub duct_diameter_in: String,
    pub velocity_pressure_inwc: String,
    pub dry_bulb_f: String,
    pub dew_point_f: String,
    pub room_dry_bulb_f: String,
    pub room_humidity_ratio: String,
}

impl Default for BatchColumns {
    fn default() -> Self {
        BatchColumns {
            barometric_inhg: "Pbar_inHg".to_string(),
            duct_diameter_in: "duct diameter".to_string(),
            velocity_pressure_inwc: "dp.inw".to_string(),
            dry_bulb_f: "Tdb".to_string(),
            dew_point_f: "Tdew".to_string(),
            room_dry_bulb_f: "Tdb_room".to_string(),
            room_humidity_ratio: "W_room".to_string(),
        }
    }
}

/// One pre-recorded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchInput {
    pub barometric_inhg: f64,
    pub duct_diameter_in: f64,
    pub velocity_pressure_inwc: f64,
    /// Exhaust dry bulb, °F
    pub dry_bulb_f: f64,
    /// Exhaust dew point, °F
    pub dew_point_f: f64,
    pub room_dry_bulb_f: f64,
    pub room_humidity_ratio: f64,
}

impl BatchInput {
    pub fn compute(&self) -> Result<BatchRecord, ComputeError> {
        let barometric = BarometricPressure::from_inhg(self.barometric_inhg);
        let air = Psychrometrics::compute(self.dry_bulb_f, self.dew_point_f, barometric)?;

        let flow = DuctFlow::compute(
            self.velocity_pressure_inwc,
            air.density,
            self.duct_diameter_in,
            barometric.inhg,
            self.dry_bulb_f,
        )?;

        let gain = HeatGain::compute(
            flow.standard,
            (self.room_dry_bulb_f, self.dry_bulb_f),
            (self.room_humidity_ratio, air.humidity_ratio),
        );

        Ok(BatchRecord {
            q_scfm: flow.standard,
            q_acfm: flow.actual,
            velocity: flow.velocity,
            humidity_ratio: air.humidity_ratio,
            q_sensible: gain.sensible,
            q_latent: gain.latent,
            q_total: gain.total,
        })
    }
}

/// Counts of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
}

pub struct Batch {
    columns: BatchColumns,
    duct_diameter_in: Option<f64>,
}

/// Splits one line into fields, undoing the quoting `CsvSink` applies.
fn split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut field).trim().to_string()),
            (c, _) => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields
}

impl Batch {
    pub fn new(columns: BatchColumns) -> Batch {
        Batch {
            columns,
            duct_diameter_in: None,
        }
    }

    /// Uses a fixed duct diameter for every row; the diameter column is then
    /// not required.
    pub fn with_duct_diameter(mut self, diameter_in: f64) -> Batch {
        self.duct_diameter_in = Some(diameter_in);
        self
    }

    /// Parses every data row of a comma-delimited table with a header row.
    ///
    /// Blank lines are ignored. Rows are numbered from 1, the first data row.
    pub fn read_inputs<R: BufRead>(&self, reader: R) -> Result<Vec<BatchInput>, BatchError> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => String::new(),
        };
        let positions: HashMap<String, usize> = split(&header)
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();

        let index = |column: &str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| BatchError::MissingColumn {
                    column: column.to_string(),
                })
        };

        let columns = &self.columns;
        let barometric = index(&columns.barometric_inhg)?;
        let diameter = match self.duct_diameter_in {
            Some(fixed) => Either::Right(fixed),
            None => Either::Left(index(&columns.duct_diameter_in)?),
        };
        let velocity_pressure = index(&columns.velocity_pressure_inwc)?;
        let dry_bulb = index(&columns.dry_bulb_f)?;
        let dew_point = index(&columns.dew_point_f)?;
        let room_dry_bulb = index(&columns.room_dry_bulb_f)?;
        let room_humidity = index(&columns.room_humidity_ratio)?;

        let mut inputs = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let row = inputs.len() + 1;
            let fields = split(&line);
            let value = |at: usize, column: &str| {
                fields
                    .get(at)
                    .and_then(|f| f.parse::<f64>().ok())
                    .ok_or_else(|| BatchError::Parse {
                        row,
                        column: column.to_string(),
                    })
            };

            inputs.push(BatchInput {
                barometric_inhg: value(barometric, &columns.barometric_inhg)?,
                duct_diameter_in: match diameter {
                    Either::Left(at) => value(at, &columns.duct_diameter_in)?,
                    Either::Right(fixed) => fixed,
                },
                velocity_pressure_inwc: value(velocity_pressure, &columns.velocity_pressure_inwc)?,
                dry_bulb_f: value(dry_bulb, &columns.dry_bulb_f)?,
                dew_point_f: value(dew_point, &columns.dew_point_f)?,
                room_dry_bulb_f: value(room_dry_bulb, &columns.room_dry_bulb_f)?,
                room_humidity_ratio: value(room_humidity, &columns.room_humidity_ratio)?,
            });
        }

        debug!("Read {} batch rows", inputs.len());
        Ok(inputs)
    }

    /// Computes every row into `sink`. Rows that do not compute are logged and
    /// skipped; a row that does not parse aborts the run before anything is
    /// written.
    pub fn run<R: BufRead, S: RecordSink>(
        &self,
        reader: R,
        sink: S,
    ) -> Result<BatchSummary, BatchError> {
        let inputs = self.read_inputs(reader)?;
        Batch::write(&inputs, sink)
    }

    fn write<S: RecordSink>(inputs: &[BatchInput], mut sink: S) -> Result<BatchSummary, BatchError> {
        let mut summary = BatchSummary::default();

        for (i, input) in inputs.iter().enumerate() {
            match input.compute() {
                Ok(record) => {
                    sink.append(&record.fields())?;
                    summary.written += 1;
                }
                Err(source) => {
                    error!("{}", BatchError::Compute { row: i + 1, source });
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Reads `input` and appends the results to the CSV file at `output`.
    pub fn run_files(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<BatchSummary, BatchError> {
        let reader = BufReader::new(File::open(input.as_ref())?);
        let inputs = self.read_inputs(reader)?;

        let sink = CsvSink::create(output.as_ref(), &BatchRecord::header())?;
        let summary = Batch::write(&inputs, sink)?;
        info!(
            "Batch wrote {} rows to {} ({} skipped)",
            summary.written,
            output.as_ref().display(),
            summary.skipped
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::sink::MemorySink;
    use std::fs;
    use tempfile::tempdir;

    const INPUT: &str = "\
Pbar_inHg,duct diameter,dp.inw,Tdb,Tdew,Tdb_room,W_room
29.5,7.87,0.15,85.0,50.0,72.0,0.0083
29.92,5.88,0.08,78.0,55.0,74.0,0.009
";

    fn run(batch: &Batch, input: &str) -> (Result<BatchSummary, BatchError>, MemorySink) {
        let mut sink = MemorySink::default();
        let result = batch.run(input.as_bytes(), &mut sink);
        (result, sink)
    }

    #[test]
    fn reference_rows() {
        let (result, sink) = run(&Batch::new(BatchColumns::default()), INPUT);

        assert_eq!(result.unwrap(), BatchSummary { written: 2, skipped: 0 });

        let first = &sink.records[0];
        assert_eq!(first[0], "503.49");
        assert_eq!(first[1], "536.65");
        assert!((first[2].parse::<f64>().unwrap() - 1588.60168).abs() < 1e-4);
        assert!((first[3].parse::<f64>().unwrap() - 0.00774036).abs() < 1e-8);
        assert_eq!(&first[4..], ["7068.9", "-1363.8", "5705.2"]);

        let second = &sink.records[1];
        assert_eq!(second[0], "208.14");
        assert_eq!(second[1], "215.93");
        assert_eq!(&second[4..], ["899.2", "196.7", "1095.9"]);
    }

    #[test]
    fn interval_export_with_fixed_diameter() {
        let columns = BatchColumns {
            barometric_inhg: "Pbar.inHg".to_string(),
            velocity_pressure_inwc: "LmuaLDp.inw".to_string(),
            dry_bulb_f: "tLmua".to_string(),
            dew_point_f: "DewEx".to_string(),
            room_dry_bulb_f: "AvTr.F".to_string(),
            room_humidity_ratio: "wLmua".to_string(),
            ..BatchColumns::default()
        };
        let input = "\
Time,Pbar.inHg,LmuaLDp.inw,tLmua,DewEx,AvTr.F,wLmua
10:00,29.92,0.08,78.0,55.0,74.0,0.009

";
        let batch = Batch::new(columns).with_duct_diameter(5.88);
        let (result, sink) = run(&batch, input);

        assert_eq!(result.unwrap().written, 1);
        assert_eq!(sink.records[0][0], "208.14");
    }

    #[test]
    fn missing_column_aborts() {
        let (result, sink) = run(&Batch::new(BatchColumns::default()), "Pbar_inHg,Tdb\n29.9,70\n");

        match result {
            Err(BatchError::MissingColumn { column }) => assert_eq!(column, "duct diameter"),
            other => panic!("expected a missing column, got {other:?}"),
        }
        assert!(sink.records.is_empty());
    }

    #[test]
    fn unparsable_row_aborts() {
        let input = format!("{INPUT}29.9,7.87,n/a,80,50,72,0.008\n");
        let (result, sink) = run(&Batch::new(BatchColumns::default()), &input);

        match result {
            Err(BatchError::Parse { row, column }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "dp.inw");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert!(sink.records.is_empty());
    }

    #[test]
    fn degenerate_row_is_skipped() {
        // A 250 °F dew point saturates above any barometric pressure here.
        let input = format!("{INPUT}29.9,7.87,0.1,260,250,72,0.008\n");
        let (result, sink) = run(&Batch::new(BatchColumns::default()), &input);

        assert_eq!(result.unwrap(), BatchSummary { written: 2, skipped: 1 });
        assert_eq!(sink.records.len(), 2);
    }

    #[test]
    fn quoted_fields_keep_their_columns() {
        let input = "\
note,Pbar_inHg,duct diameter,dp.inw,Tdb,Tdew,Tdb_room,W_room
\"fan on, \"\"high\"\"\",29.5,7.87,0.15,85.0,50.0,72.0,0.0083
";
        let inputs = Batch::new(BatchColumns::default())
            .read_inputs(input.as_bytes())
            .unwrap();

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].barometric_inhg, 29.5);
        assert_eq!(inputs[0].room_humidity_ratio, 0.0083);
        assert_eq!(
            split("\"fan on, \"\"high\"\"\",1"),
            vec!["fan on, \"high\"", "1"]
        );
    }

    #[test]
    fn unparsable_file_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input_parameters.csv");
        let output = dir.path().join("output.csv");
        fs::write(&input, format!("{INPUT}29.9,7.87,n/a,80,50,72,0.008\n")).unwrap();

        let result = Batch::new(BatchColumns::default()).run_files(&input, &output);

        assert!(matches!(result, Err(BatchError::Parse { row: 3, .. })));
        assert!(!output.exists());
    }

    #[test]
    fn files_end_to_end() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input_parameters.csv");
        let output = dir.path().join("output.csv");
        fs::write(&input, INPUT).unwrap();

        let summary = Batch::new(BatchColumns::default())
            .run_files(&input, &output)
            .unwrap();
        assert_eq!(summary.written, 2);

        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Q_Scfm,Q_Acfm,Velocity,W,q_sensible,q_latent,q_total");
        assert!(lines[1].starts_with("503.49,536.65,"));
    }
}

//! Column schemas for the records written to a sink.
//!
//! Each schema is declared once, as a field list pairing every struct field
//! with its column header and presentation precision, so the header row and
//! the populated rows are generated from the same source.

use chrono::{Local, NaiveTime};
use std::time::Duration;

use crate::core::units::round_to;

/// Written in place of every reading and derived value while the device is
/// unreachable.
pub const SENTINEL: &str = "OPEN";

/// A record with a fixed, ordered column schema.
pub trait Columns {
    fn header() -> Vec<&'static str>;

    fn fields(&self) -> Vec<String>;
}

fn present(value: f64, places: Option<i32>) -> String {
    match places {
        Some(places) => round_to(value, places).to_string(),
        None => value.to_string(),
    }
}

macro_rules! record_schema {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident => $column:literal @ $places:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: f64,
            )*
        }

        impl $name {
            pub const COLUMNS: &'static [&'static str] = &[$($column),*];

            /// Values in column order, rounded for presentation.
            pub fn values(&self) -> Vec<String> {
                vec![$(present(self.$field, $places)),*]
            }
        }
    };
}

record_schema! {
    /// Readings and derived quantities of one successful cycle, unrounded.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Measured {
        /// Lab dry bulb, °F
        t_lab => "Tdb_Lab" @ Some(2),
        /// Room (supply) dry bulb, °F
        t_room => "Tdb_room" @ Some(2),
        /// Exhaust dry bulb, °F
        t_exh => "Tdb_exh" @ Some(2),
        tdew_room => "Tdew_room" @ Some(2),
        tdew_exh => "Tdew_exh" @ Some(2),
        pbar_inhg => "Pbar_inHg" @ Some(2),
        /// Exhaust velocity pressure, inWc
        pdiff_exh => "Pdif_exh" @ Some(2),
        pp_water_room => "pp_water_supsys1" @ None,
        pp_sat_room => "pp_sat_supsys1" @ None,
        pp_water_exh => "pp_water_exh" @ None,
        pp_sat_exh => "pp_sat_exh" @ None,
        w_room => "W_room" @ None,
        w_exh => "W_exh" @ None,
        rho_room => "rho_room" @ None,
        rho_exh => "rho_exh" @ None,
        rh_room => "rh_room" @ None,
        rh_exh => "rh_exh" @ None,
        /// Exhaust velocity, fpm
        v_exh => "V_exh" @ None,
        q_acfm => "Q_Acfm" @ Some(2),
        q_scfm => "Q_Scfm" @ Some(2),
        q_sensible => "Sensible HG" @ Some(1),
        q_latent => "Latent HG" @ Some(1),
        q_total => "Total HG" @ Some(1),
    }
}

record_schema! {
    /// Output row of the batch calculator.
    #[derive(Debug, Clone, PartialEq)]
    pub struct BatchRecord {
        q_scfm => "Q_Scfm" @ Some(2),
        q_acfm => "Q_Acfm" @ Some(2),
        velocity => "Velocity" @ None,
        humidity_ratio => "W" @ None,
        q_sensible => "q_sensible" @ Some(1),
        q_latent => "q_latent" @ Some(1),
        q_total => "q_total" @ Some(1),
    }
}

impl Columns for BatchRecord {
    fn header() -> Vec<&'static str> {
        BatchRecord::COLUMNS.to_vec()
    }

    fn fields(&self) -> Vec<String> {
        self.values()
    }
}

/// When a cycle happened, on both the wall clock and the logical test clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleStamp {
    pub time_of_day: NaiveTime,
    pub test_time: Duration,
}

impl CycleStamp {
    pub const COLUMNS: [&'static str; 2] = ["Time of Day", "Test Time"];

    pub fn now(test_time: Duration) -> CycleStamp {
        CycleStamp {
            time_of_day: Local::now().time(),
            test_time,
        }
    }

    /// Test time in minutes, to two decimals.
    pub fn test_time_min(&self) -> f64 {
        round_to(self.test_time.as_secs_f64() / 60.0, 2)
    }

    pub fn time_of_day(&self) -> String {
        self.time_of_day.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Measured(Measured),
    Unavailable,
}

/// One row of the field record. Immutable once assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub stamp: CycleStamp,
    pub body: Body,
}

impl MeasurementRecord {
    pub fn new(stamp: CycleStamp, measured: Measured) -> MeasurementRecord {
        MeasurementRecord {
            stamp,
            body: Body::Measured(measured),
        }
    }

    /// The record written for a cycle whose device dropped off.
    pub fn sentinel(stamp: CycleStamp) -> MeasurementRecord {
        MeasurementRecord {
            stamp,
            body: Body::Unavailable,
        }
    }

    pub fn measured(&self) -> Option<&Measured> {
        match &self.body {
            Body::Measured(measured) => Some(measured),
            Body::Unavailable => None,
        }
    }
}

impl Columns for MeasurementRecord {
    fn header() -> Vec<&'static str> {
        CycleStamp::COLUMNS
            .iter()
            .chain(Measured::COLUMNS)
            .copied()
            .collect()
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.stamp.time_of_day(),
            self.stamp.test_time_min().to_string(),
        ];

        match &self.body {
            Body::Measured(measured) => fields.extend(measured.values()),
            Body::Unavailable => {
                fields.extend(Measured::COLUMNS.iter().map(|_| SENTINEL.to_string()))
            }
        }

        fields
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn sample() -> Measured {
        Measured {
            t_lab: 70.0,
            t_room: 72.0,
            t_exh: 85.0,
            tdew_room: 51.8,
            tdew_exh: 50.0,
            pbar_inhg: 29.498877864,
            pdiff_exh: 0.14283125,
            pp_water_room: 0.38765,
            pp_sat_room: 0.79164,
            pp_water_exh: 0.36263,
            pp_sat_exh: 1.21441,
            w_room: 0.00828,
            w_exh: 0.00774,
            rho_room: 0.07318,
            rho_exh: 0.07146,
            rh_room: 48.97,
            rh_exh: 29.86,
            v_exh: 1550.2,
            q_acfm: 523.67918,
            q_scfm: 491.29658,
            q_sensible: 6897.80398,
            q_latent: -1287.13693,
            q_total: 5610.66705,
        }
    }

    fn stamp() -> CycleStamp {
        CycleStamp {
            time_of_day: NaiveTime::from_hms_opt(13, 5, 9).unwrap(),
            test_time: Duration::from_secs(95),
        }
    }

    #[test]
    fn full_schema_has_twenty_five_columns() {
        let header = MeasurementRecord::header();

        assert_eq!(header.len(), 25);
        assert_eq!(header[0], "Time of Day");
        assert_eq!(header[1], "Test Time");
        assert_eq!(header[2], "Tdb_Lab");
        assert_eq!(header[24], "Total HG");
    }

    #[test]
    fn fields_follow_header_order() {
        let record = MeasurementRecord::new(stamp(), sample());
        let fields = record.fields();
        let header = MeasurementRecord::header();

        assert_eq!(fields.len(), header.len());
        assert_eq!(fields[0], "13:05:09");
        assert_eq!(fields[1], "1.58");

        let at = |column: &str| &fields[header.iter().position(|h| *h == column).unwrap()];
        assert_eq!(at("Pbar_inHg"), "29.5");
        assert_eq!(at("Pdif_exh"), "0.14");
        assert_eq!(at("Q_Acfm"), "523.68");
        assert_eq!(at("Latent HG"), "-1287.1");
        assert_eq!(at("W_room"), "0.00828");
    }

    #[test]
    fn sentinel_keeps_stamp() {
        let fields = MeasurementRecord::sentinel(stamp()).fields();

        assert_eq!(fields.len(), 25);
        assert_eq!(fields[0], "13:05:09");
        assert_eq!(fields[1], "1.58");
        assert!(fields[2..].iter().all(|f| f == SENTINEL));
    }

    #[test]
    fn batch_schema() {
        assert_eq!(
            BatchRecord::header(),
            vec!["Q_Scfm", "Q_Acfm", "Velocity", "W", "q_sensible", "q_latent", "q_total"]
        );
    }
}

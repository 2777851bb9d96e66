pub mod airflow;
pub mod batch;
pub mod config;
pub mod conversion;
pub mod cycle;
pub mod daq;
pub mod heat_gain;
pub mod psychro;
pub mod record;
pub mod scheduler;
pub mod selftest;
pub mod sink;
pub mod units;

pub use batch::*;
pub use config::*;
pub use conversion::*;
pub use cycle::*;
pub use daq::*;
pub use heat_gain::*;
pub use record::*;
pub use scheduler::*;
pub use selftest::*;
pub use sink::*;
pub use units::*;

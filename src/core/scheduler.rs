//! The acquisition loop and its fault handling.
//!
//! One logical thread drives every cycle: read, compute, persist, report,
//! then sleep off whatever is left of the tick. Nothing that goes wrong inside
//! a cycle escapes it.

use either::Either;
use log::{error, info, warn};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::core::config::{Config, DewPointSource};
use crate::core::cycle::{ComputeError, Pipeline, RawReadings};
use crate::core::daq::{Device, DeviceError};
use crate::core::record::{Columns, CycleStamp, Measured, MeasurementRecord, SENTINEL};
use crate::core::sink::RecordSink;
use crate::core::units::round_to;

/// How one cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Every channel read and every quantity computed; the record was handed
    /// to the sink.
    Success(MeasurementRecord),
    /// The device dropped off; a sentinel record was handed to the sink.
    DeviceDisconnected(CycleStamp),
    /// Anything else. Nothing was written for the cycle.
    ComputationFailure(String),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success(_))
    }
}

/// Loop state carried between cycles. Reset only when the process starts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleState {
    /// Logical test clock, advanced by the nominal interval each cycle.
    pub test_time: Duration,
    /// Wall time the previous cycle spent before suspending.
    pub last_processing: Duration,
}

/// Suspension after a cycle that took `processing`. A cycle that overran
/// the interval is followed immediately by the next one, with no catch-up.
pub fn compensated_delay(interval: Duration, processing: Duration) -> Duration {
    interval.saturating_sub(processing)
}

/// Drives the acquisition loop against a device and a sink.
pub struct Scheduler<D, S> {
    device: D,
    sink: S,
    config: Config,
    state: CycleState,
}

impl<D, S> Scheduler<D, S>
where
    D: Device,
    S: RecordSink,
{
    pub fn new(device: D, sink: S, config: Config) -> Scheduler<D, S> {
        Scheduler {
            device,
            sink,
            config,
            state: CycleState::default(),
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn interval(&self) -> Duration {
        self.config.acquisition.tick_interval()
    }

    /// Reads every channel the rig uses, in wiring order.
    async fn acquire(&mut self) -> Result<RawReadings, DeviceError> {
        let channels = &self.config.channels;
        let device = &mut self.device;

        let t_room = device.read_channel(&channels.room.spec()).await?;
        let t_exh = device.read_channel(&channels.exhaust.spec()).await?;
        let room_dew_point_v = match &self.config.acquisition.room_dew_point {
            DewPointSource::Fixed { .. } => None,
            DewPointSource::Channel(channel) => Some(device.read_channel(&channel.spec()).await?),
        };
        let exhaust_dew_point_v = device
            .read_channel(&channels.exhaust_dew_point.spec())
            .await?;
        let barometer_v = device.read_channel(&channels.barometer.spec()).await?;
        let velocity_pressure_v = device
            .read_channel(&channels.velocity_pressure.spec())
            .await?;
        let t_lab = device.read_channel(&channels.lab.spec()).await?;

        Ok(RawReadings {
            t_lab,
            t_room,
            t_exh,
            room_dew_point_v,
            exhaust_dew_point_v,
            barometer_v,
            velocity_pressure_v,
        })
    }

    async fn measure(
        &mut self,
        stamp: CycleStamp,
    ) -> Result<MeasurementRecord, Either<DeviceError, ComputeError>> {
        let raw = self.acquire().await.map_err(Either::Left)?;

        let pipeline = Pipeline::new(&self.config.acquisition, &self.config.channels);
        let measured = pipeline.compute(&raw).map_err(Either::Right)?;

        Ok(MeasurementRecord::new(stamp, measured))
    }

    /// Folds a cycle's result into its outcome.
    fn classify(
        stamp: CycleStamp,
        result: Result<MeasurementRecord, Either<DeviceError, ComputeError>>,
    ) -> CycleOutcome {
        match result {
            Ok(record) => CycleOutcome::Success(record),
            Err(Either::Left(err)) if err.is_disconnect() => {
                warn!("Device disconnected. Please reconnect!");
                CycleOutcome::DeviceDisconnected(stamp)
            }
            Err(Either::Left(err)) => {
                error!("Cycle failed reading the device: {err}");
                CycleOutcome::ComputationFailure(err.to_string())
            }
            Err(Either::Right(err)) => {
                error!("Cycle failed computing: {err}");
                CycleOutcome::ComputationFailure(err.to_string())
            }
        }
    }

    fn persist(&mut self, record: &MeasurementRecord) {
        if let Err(err) = self.sink.append(&record.fields()) {
            error!("Record at {} not persisted: {err}", record.stamp.time_of_day());
        }
    }

    /// Runs a single cycle without the trailing suspension.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let started = Instant::now();
        let stamp = CycleStamp::now(self.state.test_time);

        let result = self.measure(stamp).await;
        let outcome = Self::classify(stamp, result);

        let report_measured = match &outcome {
            CycleOutcome::Success(record) => {
                self.persist(record);
                record.measured().cloned()
            }
            CycleOutcome::DeviceDisconnected(stamp) => {
                self.persist(&MeasurementRecord::sentinel(*stamp));
                None
            }
            CycleOutcome::ComputationFailure(_) => None,
        };

        self.state.test_time = self.state.test_time.saturating_add(self.interval());
        self.state.last_processing = started.elapsed();

        info!(
            "{}",
            CycleReport {
                stamp: &stamp,
                processing: self.state.last_processing,
                measured: report_measured.as_ref(),
            }
        );

        outcome
    }

    /// Runs a cycle, then suspends for the remainder of the interval.
    pub async fn tick(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        sleep(compensated_delay(self.interval(), self.state.last_processing)).await;
        outcome
    }

    /// Runs `cycles` ticks.
    pub async fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick().await;
        }
    }

    /// Runs until the process is stopped.
    pub async fn run(&mut self) {
        info!(
            "Acquisition started, one record every {:?}",
            self.interval()
        );
        loop {
            self.tick().await;
        }
    }
}

/// Operator summary of one cycle.
pub struct CycleReport<'a> {
    pub stamp: &'a CycleStamp,
    pub processing: Duration,
    pub measured: Option<&'a Measured>,
}

impl Display for CycleReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = |pick: fn(&Measured) -> f64, places: i32| match self.measured {
            Some(measured) => round_to(pick(measured), places).to_string(),
            None => SENTINEL.to_string(),
        };

        writeln!(f)?;
        writeln!(f, "    Time:               {}", self.stamp.time_of_day())?;
        writeln!(f, "    Test Time:          {} min", self.stamp.test_time_min())?;
        writeln!(
            f,
            "    Process Time:       {:.3} sec",
            self.processing.as_secs_f64()
        )?;
        writeln!(f, "    Room Temp:          {} F", value(|m| m.t_room, 2))?;
        writeln!(f, "    Exhaust Temp:       {} F", value(|m| m.t_exh, 2))?;
        writeln!(f, "    Room Dewpoint:      {} F", value(|m| m.tdew_room, 2))?;
        writeln!(f, "    Exh. Dewpoint:      {} F", value(|m| m.tdew_exh, 2))?;
        writeln!(f, "    Barometric Press.:  {} inHg", value(|m| m.pbar_inhg, 2))?;
        writeln!(f, "    Velocity Press.:    {} inWc", value(|m| m.pdiff_exh, 2))?;
        writeln!(f, "    Exhaust Flow:       {} Acfm", value(|m| m.q_acfm, 2))?;
        writeln!(f, "                        {} Scfm", value(|m| m.q_scfm, 2))?;
        writeln!(f, "    Sensible Heat Gain: {} Btu/h", value(|m| m.q_sensible, 1))?;
        writeln!(f, "    Latent Heat Gain:   {} Btu/h", value(|m| m.q_latent, 1))?;
        write!(f, "    Total Heat Gain:    {} Btu/h", value(|m| m.q_total, 1))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::conversion::{CurrentLoop, SHUNT_GAIN_MA_PER_V};
    use crate::core::daq::{ChannelSpec, Emulated, EmulatedValue};
    use crate::core::sink::{MemorySink, SinkError};

    fn bench() -> (Emulated, Config) {
        let config = Config::default();
        let device = Emulated::field_rig(&config.channels, &config.acquisition.room_dew_point);
        (device, config)
    }

    /// Holds every read for a fixed time before delegating.
    struct Sluggish<D> {
        inner: D,
        delay: Duration,
    }

    impl<D: Device> Device for Sluggish<D> {
        async fn configure(&mut self, channel: &ChannelSpec) -> Result<(), DeviceError> {
            self.inner.configure(channel).await
        }

        async fn read(&mut self, channel: &ChannelSpec) -> Result<f64, DeviceError> {
            sleep(self.delay).await;
            self.inner.read(channel).await
        }
    }

    struct BrokenSink;

    impl RecordSink for BrokenSink {
        fn append(&mut self, _fields: &[String]) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn delay_clamps_at_zero() {
        let interval = Duration::from_secs(5);

        assert_eq!(
            compensated_delay(interval, Duration::from_millis(1200)),
            Duration::from_millis(3800)
        );
        assert_eq!(compensated_delay(interval, interval), Duration::ZERO);
        assert_eq!(
            compensated_delay(interval, Duration::from_secs(9)),
            Duration::ZERO
        );
    }

    #[tokio::test(start_paused = true)]
    async fn successful_cycle_is_persisted() {
        let (device, config) = bench();
        let mut sink = MemorySink::default();
        let mut scheduler = Scheduler::new(device, &mut sink, config);

        let outcome = scheduler.cycle().await;
        assert!(outcome.is_success(), "outcome={outcome:?}");
        assert_eq!(scheduler.state().test_time, Duration::from_secs(5));
        drop(scheduler);

        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].len(), MeasurementRecord::header().len());
        assert_eq!(sink.records[0][1], "0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_is_logical() {
        let (device, config) = bench();
        let mut scheduler = Scheduler::new(device, MemorySink::default(), config);

        scheduler.run_cycles(3).await;

        let minutes: Vec<&str> = scheduler
            .sink()
            .records
            .iter()
            .map(|r| r[1].as_str())
            .collect();
        assert_eq!(minutes, vec!["0", "0.08", "0.17"]);
        assert_eq!(scheduler.state().test_time, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_writes_sentinel_and_continues() {
        let (device, config) = bench();
        let plug = device.plug();
        let mut scheduler = Scheduler::new(device, MemorySink::default(), config);

        assert!(scheduler.tick().await.is_success());

        plug.disconnect();
        let outcome = scheduler.tick().await;
        match &outcome {
            CycleOutcome::DeviceDisconnected(stamp) => {
                assert_eq!(stamp.test_time, Duration::from_secs(5))
            }
            other => panic!("expected a disconnect, got {other:?}"),
        }

        plug.reconnect();
        assert!(scheduler.tick().await.is_success());

        let records = &scheduler.sink().records;
        assert_eq!(records.len(), 3);
        assert_eq!(records[1][1], "0.08");
        assert!(records[1][2..].iter().all(|f| f == SENTINEL));
        assert!(records[2][2..].iter().all(|f| f != SENTINEL));
    }

    #[tokio::test(start_paused = true)]
    async fn computation_failure_writes_nothing() {
        let (device, mut config) = bench();
        // 20 mA on a -40..400 °C transmitter saturates far above barometric.
        config.channels.exhaust_dew_point.calibration = CurrentLoop::new(-40.0, 400.0);
        let device = device.with(
            config.channels.exhaust_dew_point.positive,
            EmulatedValue::constant(20.0 / SHUNT_GAIN_MA_PER_V),
        );
        let mut scheduler = Scheduler::new(device, MemorySink::default(), config);

        let outcome = scheduler.tick().await;
        assert!(
            matches!(outcome, CycleOutcome::ComputationFailure(_)),
            "outcome={outcome:?}"
        );
        assert!(scheduler.sink().records.is_empty());
        assert_eq!(scheduler.state().test_time, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_reading_is_a_computation_failure() {
        let (device, config) = bench();
        let device = device.with(
            config.channels.velocity_pressure.positive,
            EmulatedValue::constant(f64::NAN),
        );
        let mut scheduler = Scheduler::new(device, MemorySink::default(), config);

        assert!(matches!(
            scheduler.tick().await,
            CycleOutcome::ComputationFailure(_)
        ));
        assert!(scheduler.sink().records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_does_not_stop_acquisition() {
        let (device, config) = bench();
        let mut scheduler = Scheduler::new(device, BrokenSink, config);

        assert!(scheduler.tick().await.is_success());
        assert!(scheduler.tick().await.is_success());
        assert_eq!(scheduler.state().test_time, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_hold_the_cadence() {
        let (device, config) = bench();
        let slow = Sluggish {
            inner: device,
            delay: Duration::from_millis(100),
        };
        let mut scheduler = Scheduler::new(slow, MemorySink::default(), config);

        let start = Instant::now();
        scheduler.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(scheduler.state().last_processing, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_starts_next_cycle_immediately() {
        let (device, config) = bench();
        // Six reads a cycle at one second each overruns the five second tick.
        let slow = Sluggish {
            inner: device,
            delay: Duration::from_secs(1),
        };
        let mut scheduler = Scheduler::new(slow, MemorySink::default(), config);

        let start = Instant::now();
        scheduler.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(6));

        scheduler.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        assert_eq!(scheduler.sink().records.len(), 2);
    }

    #[test]
    fn report_rounds_like_the_record() {
        let stamp = CycleStamp {
            time_of_day: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            test_time: Duration::ZERO,
        };
        let measured = crate::core::record::test::sample();
        let report = CycleReport {
            stamp: &stamp,
            processing: Duration::ZERO,
            measured: Some(&measured),
        }
        .to_string();

        assert!(report.contains("Velocity Press.:    0.14 inWc"));
        assert!(report.contains("Exhaust Flow:       523.68 Acfm"));
        assert!(report.contains("Total Heat Gain:    5610.7 Btu/h"));
    }

    #[test]
    fn report_shows_sentinel_without_measurement() {
        let stamp = CycleStamp {
            time_of_day: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            test_time: Duration::from_secs(60),
        };
        let report = CycleReport {
            stamp: &stamp,
            processing: Duration::from_millis(250),
            measured: None,
        }
        .to_string();

        assert!(report.contains("Time:               09:00:00"));
        assert!(report.contains("Test Time:          1 min"));
        assert!(report.contains("Process Time:       0.250 sec"));
        assert!(report.contains("Total Heat Gain:    OPEN Btu/h"));
    }
}

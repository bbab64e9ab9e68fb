//! Fixed period orchestration of one thermostat iteration.
//!
//! [`ControlContext`] owns every piece of state that survives between
//! iterations and turns one sensor reading into one heater decision without
//! touching any I/O. [`ControlLoop`] wraps it with the sensor, heater, telemetry
//! sink and delay collaborators and repeats it forever.

use embedded_hal_async::delay::DelayNs;

use crate::controller::{ControlConfig, ControlStateMachine, Transition};
use crate::duty::{DutyCycleModulator, PhaseCounter};
use crate::heater::HeaterActuator;
use crate::sensor::{SensorFault, TemperatureSensor};
use crate::smoothing::SampleSmoother;
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::trend::{Trend, TrendTracker};
use crate::{Temperature, RAW_SAMPLE_WINDOW};

/// Why an iteration skipped control and held the heater off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Skip {
    Fault(SensorFault),
    /// The smoother has not seen a usable sample yet
    NotWarmed,
}

/// Result of one [`ControlContext::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Iteration {
    Controlled {
        record: TelemetryRecord,
        trend: Trend,
        transition: Option<Transition>,
        heater_on: bool,
    },
    Skipped(Skip),
}

impl Iteration {
    /// Heater command for this iteration; skipped iterations keep it off.
    pub fn heater_on(&self) -> bool {
        match self {
            Iteration::Controlled { heater_on, .. } => *heater_on,
            Iteration::Skipped(_) => false,
        }
    }

    pub fn record(&self) -> Option<&TelemetryRecord> {
        match self {
            Iteration::Controlled { record, .. } => Some(record),
            Iteration::Skipped(_) => None,
        }
    }
}

/// All state mutated once per iteration: smoothing and trend histories, the
/// state machine with its gains and cooldown, and the duty cycle phase.
#[derive(Debug, Clone)]
pub struct ControlContext<const N: usize = RAW_SAMPLE_WINDOW> {
    target: Temperature,
    smoother: SampleSmoother<N>,
    trends: TrendTracker,
    machine: ControlStateMachine,
    modulator: DutyCycleModulator,
    phase: PhaseCounter,
}

impl<const N: usize> ControlContext<N> {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            target: config.target,
            smoother: SampleSmoother::new(),
            trends: TrendTracker::new(),
            machine: ControlStateMachine::new(config),
            modulator: DutyCycleModulator::new(config.duty_window),
            phase: PhaseCounter::new(config.duty_window),
        }
    }

    /// Runs one iteration on a sensor reading.
    ///
    /// The phase counter and correction cooldown advance whether or not the
    /// reading was usable.
    pub fn update(&mut self, reading: Result<Temperature, SensorFault>) -> Iteration {
        let iteration = self.control(reading);
        self.phase.advance();
        self.machine.tick_cooldown();
        iteration
    }

    fn control(&mut self, reading: Result<Temperature, SensorFault>) -> Iteration {
        let sample = match reading.and_then(finite) {
            Ok(sample) => sample,
            Err(fault) => {
                warn!("skipping iteration: {}", fault);
                return Iteration::Skipped(Skip::Fault(fault));
            }
        };

        let Some(average) = self.smoother.push(sample) else {
            warn!("skipping iteration: no usable sample yet");
            return Iteration::Skipped(Skip::NotWarmed);
        };

        let trend = self.trends.record(average, self.target);
        let transition = self.machine.step(trend.target_delta);
        let power = self.machine.power();
        let heater_on = self.modulator.decide(power, self.phase.value());
        let gains = self.machine.gains();

        Iteration::Controlled {
            record: TelemetryRecord {
                temperature: sample,
                mode: self.machine.mode(),
                power,
                correction_power: gains.correction_power,
                hold_power: gains.hold_power,
                target_delta: trend.target_delta,
            },
            trend,
            transition,
            heater_on,
        }
    }

    pub fn target(&self) -> Temperature {
        self.target
    }

    pub fn smoother(&self) -> &SampleSmoother<N> {
        &self.smoother
    }

    pub fn trends(&self) -> &TrendTracker {
        &self.trends
    }

    pub fn machine(&self) -> &ControlStateMachine {
        &self.machine
    }

    pub fn phase(&self) -> PhaseCounter {
        self.phase
    }
}

fn finite(sample: Temperature) -> Result<Temperature, SensorFault> {
    if sample.is_finite() {
        Ok(sample)
    } else {
        Err(SensorFault::NonFinite)
    }
}

/// The thermostat main loop.
pub struct ControlLoop<S, H, T, D, const N: usize = RAW_SAMPLE_WINDOW> {
    sensor: S,
    heater: H,
    telemetry: T,
    delay: D,
    period_ms: u32,
    context: ControlContext<N>,
}

impl<S, H, T, D, const N: usize> ControlLoop<S, H, T, D, N>
where
    S: TemperatureSensor,
    H: HeaterActuator,
    T: TelemetrySink,
    D: DelayNs,
{
    pub fn new(sensor: S, heater: H, telemetry: T, delay: D, config: &ControlConfig) -> Self {
        Self {
            sensor,
            heater,
            telemetry,
            delay,
            period_ms: config.sample_period_ms,
            context: ControlContext::new(config),
        }
    }

    /// One iteration without the trailing sleep: read, control, actuate, report.
    pub async fn tick(&mut self) -> Iteration {
        let reading = self.sensor.read().await;
        let iteration = self.context.update(reading);

        self.heater.set(iteration.heater_on());
        if let Some(record) = iteration.record() {
            self.telemetry.emit(&record.render());
        }
        iteration
    }

    /// Runs iterations forever, sleeping a fixed period after each one.
    ///
    /// Time spent inside an iteration is not subtracted from the sleep.
    pub async fn run(&mut self) -> ! {
        info!(
            "control loop started: target {} every {} ms",
            self.context.target(),
            self.period_ms
        );
        loop {
            self.tick().await;
            self.delay.delay_ms(self.period_ms).await;
        }
    }

    pub fn context(&self) -> &ControlContext<N> {
        &self.context
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn heater(&self) -> &H {
        &self.heater
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerMode;
    use approx::assert_relative_eq;
    use core::cell::RefCell;
    use core::future::poll_fn;
    use core::task::Poll;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_futures::yield_now;

    struct ScriptedSensor {
        readings: Vec<Result<Temperature, SensorFault>>,
        next: usize,
    }

    impl ScriptedSensor {
        fn new(readings: &[Result<Temperature, SensorFault>]) -> Self {
            Self {
                readings: readings.to_vec(),
                next: 0,
            }
        }
    }

    impl TemperatureSensor for ScriptedSensor {
        async fn read(&mut self) -> Result<Temperature, SensorFault> {
            let reading = self.readings[self.next % self.readings.len()];
            self.next += 1;
            reading
        }
    }

    #[derive(Default)]
    struct RecordingHeater {
        commands: Vec<bool>,
    }

    impl HeaterActuator for RecordingHeater {
        fn set(&mut self, on: bool) {
            self.commands.push(on);
        }
    }

    #[derive(Default)]
    struct Lines(Vec<std::string::String>);

    impl TelemetrySink for Lines {
        fn emit(&mut self, line: &str) {
            self.0.push(line.into());
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    fn control_loop(
        readings: &[Result<Temperature, SensorFault>],
    ) -> ControlLoop<ScriptedSensor, RecordingHeater, Lines, NoDelay> {
        ControlLoop::new(
            ScriptedSensor::new(readings),
            RecordingHeater::default(),
            Lines::default(),
            NoDelay,
            &ControlConfig::default(),
        )
    }

    #[test]
    fn first_reading_heats_and_reports() {
        let mut control = control_loop(&[Ok(20.0)]);
        let iteration = block_on(control.tick());

        assert!(iteration.heater_on());
        assert_eq!(control.heater().commands, vec![true]);
        assert_eq!(
            control.telemetry().0,
            vec![
                "Temp: 20.000 | State: heating | Power: 0.500 | CP: 0.500 | HP: 0.500 | Target Delta: 15.000\n"
                    .to_string()
            ]
        );
    }

    #[test]
    fn fault_holds_heater_off_and_keeps_mode() {
        let mut control = control_loop(&[Ok(20.0), Err(SensorFault::Saturated)]);
        block_on(control.tick());
        let iteration = block_on(control.tick());

        assert_eq!(iteration, Iteration::Skipped(Skip::Fault(SensorFault::Saturated)));
        assert_eq!(control.heater().commands, vec![true, false]);
        assert_eq!(control.telemetry().0.len(), 1);
        assert_eq!(control.context().machine().mode(), ControllerMode::Heating);
        assert_eq!(control.context().phase().value(), 2);
    }

    #[test]
    fn non_finite_sample_never_reaches_the_smoother() {
        let mut context: ControlContext<10> = ControlContext::new(&ControlConfig::default());
        context.update(Ok(30.0));
        let iteration = context.update(Ok(f32::NAN));

        assert_eq!(iteration, Iteration::Skipped(Skip::Fault(SensorFault::NonFinite)));
        assert_eq!(context.smoother().average(), Some(30.0));
    }

    #[test]
    fn zero_first_reading_is_not_warmed() {
        let mut context: ControlContext<10> = ControlContext::new(&ControlConfig::default());
        let iteration = context.update(Ok(0.0));

        assert_eq!(iteration, Iteration::Skipped(Skip::NotWarmed));
        assert_eq!(context.machine().mode(), ControllerMode::Unknown);
    }

    #[test]
    fn duty_cycle_over_one_window() {
        // Holding at the setpoint with the initial 0.5 hold power
        let mut context: ControlContext<10> = ControlContext::new(&ControlConfig::default());
        let commands: Vec<bool> = (0..100)
            .map(|_| context.update(Ok(35.0)).heater_on())
            .collect();

        assert_eq!(context.machine().mode(), ControllerMode::Holding);
        assert!(commands[..50].iter().all(|&on| on));
        assert!(commands[50..].iter().all(|&on| !on));
        assert_eq!(context.phase().value(), 0);
    }

    #[test]
    fn cooldown_ticks_every_iteration() {
        let mut context: ControlContext<1> = ControlContext::new(&ControlConfig::default());
        context.update(Ok(35.0));
        context.update(Ok(36.0));

        assert_eq!(context.machine().mode(), ControllerMode::Cooling);
        assert_relative_eq!(context.machine().gains().hold_power, 0.4);
        assert_eq!(context.machine().cooldown(), 9);

        context.update(Err(SensorFault::Bus));
        assert_eq!(context.machine().cooldown(), 8);
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Heater(bool),
        SleepMs(u32),
        SleepNs(u32),
    }

    struct LoggedHeater<'a>(&'a RefCell<Vec<Event>>);

    impl HeaterActuator for LoggedHeater<'_> {
        fn set(&mut self, on: bool) {
            self.0.borrow_mut().push(Event::Heater(on));
        }
    }

    /// Records each sleep and yields once so the loop can be stopped.
    struct LoggedDelay<'a>(&'a RefCell<Vec<Event>>);

    impl DelayNs for LoggedDelay<'_> {
        async fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Event::SleepNs(ns));
            yield_now().await;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Event::SleepMs(ms));
            yield_now().await;
        }
    }

    #[test]
    fn run_sleeps_one_period_after_every_iteration() {
        let log = RefCell::new(Vec::new());
        let mut control: ControlLoop<_, _, _, _> = ControlLoop::new(
            ScriptedSensor::new(&[Ok(20.0)]),
            LoggedHeater(&log),
            Lines::default(),
            LoggedDelay(&log),
            &ControlConfig::default(),
        );

        let sleeps = || {
            log.borrow()
                .iter()
                .filter(|e| matches!(e, Event::SleepMs(_) | Event::SleepNs(_)))
                .count()
        };
        let three_periods = poll_fn(|_| {
            if sleeps() >= 3 {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        });

        let outcome = block_on(select(control.run(), three_periods));
        assert!(matches!(outcome, Either::Second(())));

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Heater(true),
                Event::SleepMs(100),
                Event::Heater(true),
                Event::SleepMs(100),
                Event::Heater(true),
                Event::SleepMs(100),
            ]
        );
        assert_eq!(control.telemetry().0.len(), 3);
        assert_eq!(control.context().phase().value(), 3);
    }
}

//! Hysteresis state machine with a self-tuning hold power.
//!
//! Each step consumes the target delta (`target - average`) and may move the
//! controller between four modes. The transition rules are evaluated in a fixed
//! priority order and the first match wins; a delta no rule covers leaves mode
//! and power exactly as they were.
//!
//! | Current | Condition           | Next    | Power            | Hold power side effect          |
//! |---------|---------------------|---------|------------------|---------------------------------|
//! | Unknown | `delta < lo`        | Cooling | `0`              |                                 |
//! | Unknown | `delta > hi`        | Heating | correction power |                                 |
//! | Unknown | `lo <= delta <= hi` | Holding | hold power       |                                 |
//! | Heating | `delta < hi`        | Holding | hold power       |                                 |
//! | Holding | `delta < lo`        | Cooling | `0`              | `-= step` when cooldown is over |
//! | Holding | `delta > hi`        | Heating | correction power | `+= step`                       |
//! | Cooling | `delta > lo`        | Holding | hold power       |                                 |
//!
//! The hold power is not clamped: repeated corrections can push it outside
//! `[0, 1]`, where the duty cycle saturates fully on or fully off.

use core::fmt;

use crate::{
    Temperature, ADJUSTMENT_STEP, CORRECTION_COOLDOWN, CORRECTION_POWER, DUTY_WINDOW, HYSTERESIS,
    INITIAL_HOLD_POWER, SAMPLE_PERIOD_MS, TARGET_TEMP,
};

/// Discrete operating state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerMode {
    #[default]
    Unknown,
    Heating,
    Holding,
    Cooling,
}

impl ControllerMode {
    pub const fn name(self) -> &'static str {
        match self {
            ControllerMode::Unknown => "unknown",
            ControllerMode::Heating => "heating",
            ControllerMode::Holding => "holding",
            ControllerMode::Cooling => "cooling",
        }
    }
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Duty fractions the controller switches between.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    /// Duty while heating towards the band; fixed
    pub correction_power: f32,
    /// Duty while holding inside the band; tuned by every Holding exit
    pub hold_power: f32,
}

/// Construction time parameters of the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    pub target: Temperature,
    pub hysteresis: f32,
    pub adjustment_step: f32,
    pub correction_power: f32,
    pub initial_hold_power: f32,
    pub correction_cooldown: u32,
    pub duty_window: u32,
    pub sample_period_ms: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            target: TARGET_TEMP,
            hysteresis: HYSTERESIS,
            adjustment_step: ADJUSTMENT_STEP,
            correction_power: CORRECTION_POWER,
            initial_hold_power: INITIAL_HOLD_POWER,
            correction_cooldown: CORRECTION_COOLDOWN,
            duty_window: DUTY_WINDOW,
            sample_period_ms: SAMPLE_PERIOD_MS,
        }
    }
}

/// A mode change reported by [`ControlStateMachine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: ControllerMode,
    pub to: ControllerMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerSource {
    Off,
    Correction,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldAdjustment {
    None,
    Raise,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    next: ControllerMode,
    power: PowerSource,
    adjustment: HoldAdjustment,
}

impl Rule {
    const fn new(next: ControllerMode, power: PowerSource, adjustment: HoldAdjustment) -> Self {
        Self {
            next,
            power,
            adjustment,
        }
    }
}

/// Picks the rule for `(mode, delta)`, or `None` when no rule matches.
fn rule_for(mode: ControllerMode, delta: f32, hysteresis: f32) -> Option<Rule> {
    use ControllerMode::*;
    use HoldAdjustment as Adjust;
    use PowerSource as Power;

    let hi = hysteresis;
    let lo = -hysteresis;

    match mode {
        Unknown if delta < lo => Some(Rule::new(Cooling, Power::Off, Adjust::None)),
        Unknown if delta > hi => Some(Rule::new(Heating, Power::Correction, Adjust::None)),
        Unknown if (lo..=hi).contains(&delta) => {
            Some(Rule::new(Holding, Power::Hold, Adjust::None))
        }
        Heating if delta < hi => Some(Rule::new(Holding, Power::Hold, Adjust::None)),
        Holding if delta < lo => Some(Rule::new(Cooling, Power::Off, Adjust::Lower)),
        Holding if delta > hi => Some(Rule::new(Heating, Power::Correction, Adjust::Raise)),
        Cooling if delta > lo => Some(Rule::new(Holding, Power::Hold, Adjust::None)),
        Unknown | Heating | Holding | Cooling => None,
    }
}

/// The hysteresis controller: current mode, commanded power and gains.
#[derive(Debug, Clone)]
pub struct ControlStateMachine {
    hysteresis: f32,
    adjustment_step: f32,
    cooldown_reset: u32,
    mode: ControllerMode,
    power: f32,
    gains: Gains,
    cooldown: u32,
}

impl ControlStateMachine {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            hysteresis: config.hysteresis,
            adjustment_step: config.adjustment_step,
            cooldown_reset: config.correction_cooldown,
            mode: ControllerMode::Unknown,
            power: config.initial_hold_power,
            gains: Gains {
                correction_power: config.correction_power,
                hold_power: config.initial_hold_power,
            },
            cooldown: 0,
        }
    }

    /// Runs one transition for the given target delta.
    pub fn step(&mut self, target_delta: f32) -> Option<Transition> {
        let rule = rule_for(self.mode, target_delta, self.hysteresis)?;

        match rule.adjustment {
            HoldAdjustment::None => {}
            HoldAdjustment::Raise => {
                self.gains.hold_power += self.adjustment_step;
                debug!("hold power raised to {}", self.gains.hold_power);
            }
            HoldAdjustment::Lower if self.cooldown == 0 => {
                self.gains.hold_power -= self.adjustment_step;
                self.cooldown = self.cooldown_reset;
                debug!("hold power lowered to {}", self.gains.hold_power);
            }
            HoldAdjustment::Lower => {
                debug!("hold power correction cooling down ({} left)", self.cooldown);
            }
        }

        self.power = match rule.power {
            PowerSource::Off => 0.0,
            PowerSource::Correction => self.gains.correction_power,
            PowerSource::Hold => self.gains.hold_power,
        };

        let transition = Transition {
            from: self.mode,
            to: rule.next,
        };
        self.mode = rule.next;
        info!("{} -> {}", transition.from, transition.to);
        Some(transition)
    }

    /// Counts the correction cooldown down by one iteration, stopping at zero.
    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Commanded duty fraction; `0` keeps the heater off.
    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }
}

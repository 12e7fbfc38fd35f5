//! The live parameter values.
//!
//! A [`ParameterTable`] is owned by the worker thread and written only
//! there. [`ParameterTable::set`] does not re-validate: the worker checks
//! every value before calling it, which is what keeps the table free of
//! out-of-range values.

use std::fmt;

use crate::param::{ParamId, Parameter};
use crate::params::{FanDutyCycle, HighTemperatureAlarm, TemperatureSetpoint};
use crate::registry::ParamValue;

/// Text shown in place of a value that cannot be rendered.
pub const UNAVAILABLE: &str = "?";

/// Current value of every parameter kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterTable {
    setpoint: TemperatureSetpoint,
    alarm: HighTemperatureAlarm,
    fan: FanDutyCycle,
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterTable {
    /// A table holding every kind's default.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            setpoint: TemperatureSetpoint::DEFAULT,
            alarm: HighTemperatureAlarm::DEFAULT,
            fan: FanDutyCycle::DEFAULT,
        }
    }

    /// Overwrites the slot for `value`'s kind. Callers validate first.
    pub fn set(&mut self, value: ParamValue) {
        match value {
            ParamValue::TemperatureSetpoint(v) => self.setpoint = v,
            ParamValue::HighTemperatureAlarm(v) => self.alarm = v,
            ParamValue::FanDutyCycle(v) => self.fan = v,
        }
    }

    /// Typed form of [`set`](Self::set).
    pub fn set_param<P: Parameter>(&mut self, value: P) {
        self.set(value.into());
    }

    /// Current value of kind `id`.
    #[must_use]
    pub fn value(&self, id: ParamId) -> ParamValue {
        match id {
            ParamId::TemperatureSetpoint => self.setpoint.into(),
            ParamId::HighTemperatureAlarm => self.alarm.into(),
            ParamId::FanDutyCycle => self.fan.into(),
        }
    }

    /// Current value of kind `P`.
    #[must_use]
    pub fn get<P: Parameter>(&self) -> P {
        P::from_value(&self.value(P::ID)).unwrap_or(P::DEFAULT)
    }

    /// Every current value, in id order.
    #[must_use]
    pub fn snapshot(&self) -> [ParamValue; ParamId::COUNT] {
        ParamId::ALL.map(|id| self.value(id))
    }
}

/// Renders `Tset=37.50, HighAlarm=80.00, FanDuty=50.00`.
impl fmt::Display for ParameterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.snapshot().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=", value.label())?;
            match value.render() {
                Some(text) => f.write_str(text.as_str())?,
                None => f.write_str(UNAVAILABLE)?,
            }
        }
        Ok(())
    }
}

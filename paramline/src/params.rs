//! The declared parameter kinds.
//!
//! Adding a kind means adding a struct here, a [`ParamId`](crate::ParamId)
//! variant, a [`ParamValue`](crate::ParamValue) variant and a registry entry.
//! The compiler flags every dispatch site that still needs the new arm.

use crate::Parameter;

/// Target temperature in degrees Celsius.
#[derive(Parameter, Debug, Clone, Copy, PartialEq)]
#[param(
    id = TemperatureSetpoint,
    name = "TemperatureSetpoint",
    label = "Tset",
    default = 37.5,
    min = 0.0,
    max = 100.0
)]
pub struct TemperatureSetpoint {
    pub value: f32,
}

/// Temperature above which the high-temperature alarm trips.
#[derive(Parameter, Debug, Clone, Copy, PartialEq)]
#[param(
    id = HighTemperatureAlarm,
    name = "HighTemperatureAlarm",
    label = "HighAlarm",
    default = 80.0,
    min = 0.0,
    max = 150.0
)]
pub struct HighTemperatureAlarm {
    pub threshold: f32,
}

/// Fan PWM duty cycle in percent.
#[derive(Parameter, Debug, Clone, Copy, PartialEq)]
#[param(
    id = FanDutyCycle,
    name = "FanDutyCycle",
    label = "FanDuty",
    default = 50.0,
    min = 0.0,
    max = 100.0
)]
pub struct FanDutyCycle {
    pub percent: f32,
}

//! Runtime registry of parameter kinds.
//!
//! [`ParamValue`] is the closed sum of every parameter type. A [`Handler`]
//! bundles one kind's operations behind function pointers that take and
//! return `ParamValue`, so tooling can validate, parse and format a value
//! knowing only its id or name.
//!
//! ```
//! use paramline::registry;
//!
//! let handler = registry::find_by_name("FanDutyCycle").unwrap();
//! let value = handler.parse("45").unwrap();
//! assert!(handler.validate(&value));
//! assert_eq!(handler.render(&value).unwrap(), "45.00");
//!
//! assert!(registry::find_by_name("Bogus").is_none());
//! assert!(registry::find_by_id(7).is_none());
//! ```
//!
//! A handler handed a value of a different kind treats it as invalid: it
//! never reinterprets one kind's storage as another's.

use crate::param::{ParamId, Parameter, ParseError, ValueText};
use crate::params::{FanDutyCycle, HighTemperatureAlarm, TemperatureSetpoint};

/// A value of any declared parameter kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    TemperatureSetpoint(TemperatureSetpoint),
    HighTemperatureAlarm(HighTemperatureAlarm),
    FanDutyCycle(FanDutyCycle),
}

/// Runs `$body` with `$v` bound to the concrete value inside a [`ParamValue`].
macro_rules! dispatch {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            ParamValue::TemperatureSetpoint($v) => $body,
            ParamValue::HighTemperatureAlarm($v) => $body,
            ParamValue::FanDutyCycle($v) => $body,
        }
    };
}

impl ParamValue {
    #[must_use]
    pub fn id(&self) -> ParamId {
        dispatch!(self, v => param_id_of(v))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.id().name()
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.id().label()
    }

    /// The wrapped number, without validation.
    #[must_use]
    pub fn raw(&self) -> f32 {
        dispatch!(self, v => v.raw())
    }

    #[must_use]
    pub fn validate(&self) -> bool {
        dispatch!(self, v => v.validate())
    }

    /// See [`Parameter::serialize`].
    pub fn serialize(&self, out: &mut [u8]) -> usize {
        dispatch!(self, v => v.serialize(out))
    }

    #[must_use]
    pub fn render(&self) -> Option<ValueText> {
        dispatch!(self, v => v.render())
    }

    /// The default value of kind `id`.
    #[must_use]
    pub fn default_for(id: ParamId) -> Self {
        match id {
            ParamId::TemperatureSetpoint => TemperatureSetpoint::DEFAULT.into(),
            ParamId::HighTemperatureAlarm => HighTemperatureAlarm::DEFAULT.into(),
            ParamId::FanDutyCycle => FanDutyCycle::DEFAULT.into(),
        }
    }

    /// Wraps `raw` as kind `id` without validating it.
    #[must_use]
    pub fn from_raw(id: ParamId, raw: f32) -> Self {
        match id {
            ParamId::TemperatureSetpoint => TemperatureSetpoint::from_raw(raw).into(),
            ParamId::HighTemperatureAlarm => HighTemperatureAlarm::from_raw(raw).into(),
            ParamId::FanDutyCycle => FanDutyCycle::from_raw(raw).into(),
        }
    }
}

fn param_id_of<P: Parameter>(_: &P) -> ParamId {
    P::ID
}

impl ParamId {
    /// Stable name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TemperatureSetpoint => TemperatureSetpoint::NAME,
            Self::HighTemperatureAlarm => HighTemperatureAlarm::NAME,
            Self::FanDutyCycle => FanDutyCycle::NAME,
        }
    }

    /// Short label used in table renderings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TemperatureSetpoint => TemperatureSetpoint::LABEL,
            Self::HighTemperatureAlarm => HighTemperatureAlarm::LABEL,
            Self::FanDutyCycle => FanDutyCycle::LABEL,
        }
    }
}

/// Type-erased operations for one parameter kind.
#[derive(Debug, Clone, Copy)]
pub struct Handler {
    pub id: ParamId,
    pub name: &'static str,
    pub label: &'static str,
    /// Size in bytes of the concrete value type.
    pub size: usize,
    pub min: f32,
    pub max: f32,
    default: fn() -> ParamValue,
    validate: fn(&ParamValue) -> bool,
    parse: fn(&str) -> Result<ParamValue, ParseError>,
    serialize: fn(&ParamValue, &mut [u8]) -> usize,
}

impl Handler {
    /// Builds the handler for parameter type `P`.
    #[must_use]
    pub const fn of<P: Parameter>() -> Self {
        Self {
            id: P::ID,
            name: P::NAME,
            label: P::LABEL,
            size: size_of::<P>(),
            min: P::MIN,
            max: P::MAX,
            default: erased_default::<P>,
            validate: erased_validate::<P>,
            parse: erased_parse::<P>,
            serialize: erased_serialize::<P>,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> ParamValue {
        (self.default)()
    }

    /// Returns `true` iff `value` is of this kind and within bounds.
    #[must_use]
    pub fn validate(&self, value: &ParamValue) -> bool {
        (self.validate)(value)
    }

    /// Parses and validates text as a value of this kind.
    ///
    /// # Errors
    ///
    /// See [`Parameter::parse`].
    pub fn parse(&self, input: &str) -> Result<ParamValue, ParseError> {
        (self.parse)(input)
    }

    /// Serializes `value` into `out`; 0 if it is of another kind or does
    /// not fit.
    pub fn serialize(&self, value: &ParamValue, out: &mut [u8]) -> usize {
        (self.serialize)(value, out)
    }

    /// Renders `value`; `None` if it is of another kind or does not fit.
    #[must_use]
    pub fn render(&self, value: &ParamValue) -> Option<ValueText> {
        if value.id() == self.id {
            value.render()
        } else {
            None
        }
    }
}

fn erased_default<P: Parameter>() -> ParamValue {
    P::DEFAULT.into()
}

fn erased_validate<P: Parameter>(value: &ParamValue) -> bool {
    P::from_value(value).is_some_and(|v| v.validate())
}

fn erased_parse<P: Parameter>(input: &str) -> Result<ParamValue, ParseError> {
    P::parse(input).map(Into::into)
}

fn erased_serialize<P: Parameter>(value: &ParamValue, out: &mut [u8]) -> usize {
    P::from_value(value).map_or(0, |v| v.serialize(out))
}

const HANDLERS: [Handler; ParamId::COUNT] = [
    Handler::of::<TemperatureSetpoint>(),
    Handler::of::<HighTemperatureAlarm>(),
    Handler::of::<FanDutyCycle>(),
];

/// Compile-time check that entry `i` describes the kind with index `i`.
const _: () = {
    let mut i = 0;
    while i < HANDLERS.len() {
        assert!(
            HANDLERS[i].id as usize == i,
            "registry order must follow ParamId"
        );
        i += 1;
    }
};

/// One handler per parameter kind, indexed by [`ParamId::index`].
pub static REGISTRY: [Handler; ParamId::COUNT] = HANDLERS;

/// All handlers in id order.
#[must_use]
pub fn handlers() -> &'static [Handler] {
    &REGISTRY
}

/// The handler for a known kind.
#[must_use]
pub fn handler(id: ParamId) -> &'static Handler {
    &REGISTRY[id.index()]
}

/// Looks up a handler by raw id; `None` for ids outside the enumeration.
#[must_use]
pub fn find_by_id(raw: u16) -> Option<&'static Handler> {
    ParamId::try_from(raw).ok().map(handler)
}

/// Looks up a handler by exact, case-sensitive name.
#[must_use]
pub fn find_by_name(name: &str) -> Option<&'static Handler> {
    REGISTRY.iter().find(|h| h.name == name)
}

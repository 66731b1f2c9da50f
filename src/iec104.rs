//! IEC 60870-5-104 application layer objects as exchanged with the
//! IEC 104 south/north plugins.
//!
//! Only already decoded ASDU fields are handled here, there is no APCI or
//! transport code in this crate.

use std::{fmt, str::FromStr};

use snafu::OptionExt as _;

use crate::datapoint::{Datapoint, DatapointError, DatapointValue};

pub mod asdu;
pub mod command;
pub mod data_object;

pub use asdu::{AsduError, AsduFamily, AsduType, has_asdu_timestamp};
pub use command::CommandObject;
pub use data_object::DataObject;

use asdu::{InvalidStepPosition, NotAnInteger, StepPositionRange};

/// Value of the `do_comingfrom`/`co_comingfrom` field for records produced
/// by the IEC 104 plugins.
pub const PROTOCOL_NAME: &str = "iec104";

/// Raw value of an information object.
#[derive(Debug, Clone, PartialEq)]
pub enum Iec104Value {
	Integer(i64),
	Float(f64),
	String(String),
}

impl Iec104Value {
	/// Only scalar datapoint values are information object values.
	#[must_use]
	pub fn from_datapoint_value(value: &DatapointValue) -> Option<Self> {
		match value {
			DatapointValue::Integer(value) => Some(Self::Integer(*value)),
			DatapointValue::Float(value) => Some(Self::Float(*value)),
			DatapointValue::String(value) => Some(Self::String(value.clone())),
			DatapointValue::Dict(_) | DatapointValue::List(_) => None,
		}
	}

	/// Turn numeric strings into numbers. Command values can be string encoded.
	#[must_use]
	pub fn into_numeric(self) -> Self {
		match self {
			Self::String(value) => {
				let trimmed = value.trim();
				if let Ok(integer) = trimmed.parse::<i64>() {
					Self::Integer(integer)
				} else if let Ok(float) = trimmed.parse::<f64>() {
					Self::Float(float)
				} else {
					Self::String(value)
				}
			}
			other => other,
		}
	}

	#[must_use]
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Integer(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
		}
	}
}

impl From<Iec104Value> for DatapointValue {
	fn from(value: Iec104Value) -> Self {
		match value {
			Iec104Value::Integer(value) => Self::Integer(value),
			Iec104Value::Float(value) => Self::Float(value),
			Iec104Value::String(value) => Self::String(value),
		}
	}
}

impl fmt::Display for Iec104Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Integer(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value}"),
			Self::String(value) => write!(f, "{value}"),
		}
	}
}

/// Quality descriptor bits of an information object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualityDescriptor {
	/// IV
	pub invalid: bool,
	/// BL
	pub blocked: bool,
	/// OV
	pub overflow: bool,
	/// SB
	pub substituted: bool,
	/// NT
	pub not_topical: bool,
}

/// Double point information (DPI) and double command (DCS) states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoublePointState {
	IntermediateState = 0,
	Off = 1,
	On = 2,
	BadState = 3,
}

impl DoublePointState {
	/// Anything outside of 0..=2 is a bad state.
	#[must_use]
	pub const fn from_code(code: i64) -> Self {
		match code {
			0 => Self::IntermediateState,
			1 => Self::Off,
			2 => Self::On,
			_ => Self::BadState,
		}
	}

	#[must_use]
	pub const fn code(self) -> i64 {
		self as i64
	}

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::IntermediateState => "intermediate-state",
			Self::Off => "off",
			Self::On => "on",
			Self::BadState => "bad-state",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::IntermediateState, Self::Off, Self::On, Self::BadState]
			.into_iter()
			.find(|state| state.as_str() == value)
	}
}

/// Regulating step command state (RCS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatingStep {
	Stop = 0,
	Lower = 1,
	Higher = 2,
	Reserved = 3,
}

impl RegulatingStep {
	#[must_use]
	pub const fn from_code(code: i64) -> Self {
		match code {
			0 => Self::Stop,
			1 => Self::Lower,
			2 => Self::Higher,
			_ => Self::Reserved,
		}
	}

	#[must_use]
	pub const fn code(self) -> i64 {
		self as i64
	}

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Stop => "stop",
			Self::Lower => "lower",
			Self::Higher => "higher",
			Self::Reserved => "reserved",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::Stop, Self::Lower, Self::Higher, Self::Reserved]
			.into_iter()
			.find(|state| state.as_str() == value)
	}
}

/// Value with transient state indication (VTI), written as `[pos,transient]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPosition {
	pub position: i64,
	pub transient: bool,
}

impl StepPosition {
	/// Positions representable in the 7 bit VTI value.
	pub const RANGE: std::ops::RangeInclusive<i64> = -64..=63;
}

impl FromStr for StepPosition {
	type Err = AsduError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let inner = s
			.trim()
			.strip_prefix('[')
			.and_then(|rest| rest.strip_suffix(']'))
			.context(InvalidStepPosition { value: s })?;
		let (position, transient) =
			inner.split_once(',').context(InvalidStepPosition { value: s })?;
		let position = position.trim().parse::<i64>().ok().context(InvalidStepPosition { value: s })?;
		let transient = match transient.trim() {
			"true" | "1" => true,
			"false" | "0" => false,
			_ => return InvalidStepPosition { value: s }.fail(),
		};
		Ok(Self { position, transient })
	}
}

impl fmt::Display for StepPosition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{},{}]", self.position, self.transient)
	}
}

impl StepPosition {
	/// Warn-level check, positions outside of the VTI range are still forwarded.
	pub fn check_range(&self) -> Result<(), AsduError> {
		if Self::RANGE.contains(&self.position) {
			Ok(())
		} else {
			StepPositionRange { position: self.position }.fail()
		}
	}
}

/// Copy a typed field out of a datapoint. Fields of the wrong type are
/// reported and treated as absent.
pub(crate) fn read_field<T>(dp: &Datapoint, target: &mut Option<T>)
where
	T: for<'a> TryFrom<&'a DatapointValue, Error = DatapointError>,
{
	match T::try_from(dp.value()) {
		Ok(value) => *target = Some(value),
		Err(error) => tracing::warn!("Ignoring field {}: {error}", dp.name()),
	}
}

/// Like [`read_field`] but also accepts decimal strings.
pub(crate) fn read_integer_field(dp: &Datapoint, target: &mut Option<i64>) {
	let value = match dp.value() {
		DatapointValue::String(value) => value
			.trim()
			.parse::<i64>()
			.ok()
			.context(NotAnInteger { value: value.as_str() })
			.map_err(|error| error.to_string()),
		other => i64::try_from(other).map_err(|error| error.to_string()),
	};
	match value {
		Ok(value) => *target = Some(value),
		Err(error) => tracing::warn!("Ignoring field {}: {error}", dp.name()),
	}
}

/// Flag variant of [`read_integer_field`].
pub(crate) fn read_flag_field(dp: &Datapoint, target: &mut Option<bool>) {
	let mut value = None;
	read_integer_field(dp, &mut value);
	if let Some(value) = value {
		*target = Some(value != 0);
	}
}

/// Scalar value field, `None` for dicts and lists.
pub(crate) fn read_value_field(dp: &Datapoint, target: &mut Option<Iec104Value>) {
	match Iec104Value::from_datapoint_value(dp.value()) {
		Some(value) => *target = Some(value),
		None => tracing::warn!("Ignoring field {}: not a scalar value", dp.name()),
	}
}

/// Push `name` with `value` when the value is present.
pub(crate) fn push_field<T: Into<DatapointValue>>(
	datapoints: &mut Vec<Datapoint>,
	name: &str,
	value: Option<T>,
) {
	if let Some(value) = value {
		datapoints.push(Datapoint::new(name, value));
	}
}

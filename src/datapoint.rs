//! Self-describing record tree exchanged with the host pipeline.
//!
//! Every reading travelling through the pipeline is a list of named values,
//! where a value is either a scalar or a nested list of named values. The
//! conversion engine only touches this representation at its boundary: the
//! IEC 104 field bags and the Pivot objects are extracted from it and
//! rendered back into it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use snafu::{OptionExt as _, Snafu};

/// The value of a [`Datapoint`].
#[derive(Debug, Clone, PartialEq)]
pub enum DatapointValue {
	Integer(i64),
	Float(f64),
	String(String),
	/// Named children, looked up by name.
	Dict(Vec<Datapoint>),
	/// Ordered children, names are positional.
	List(Vec<Datapoint>),
}

impl DatapointValue {
	/// Name of the value kind, used in diagnostics.
	#[must_use]
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Integer(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::Dict(_) => "dict",
			Self::List(_) => "list",
		}
	}

	/// Render the value as JSON.
	#[must_use]
	pub fn to_json(&self) -> Value {
		match self {
			Self::Integer(value) => Value::from(*value),
			Self::Float(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
			Self::String(value) => Value::String(value.clone()),
			Self::Dict(children) => Value::Object(
				children.iter().map(|child| (child.name.clone(), child.value.to_json())).collect(),
			),
			Self::List(children) => {
				Value::Array(children.iter().map(|child| child.value.to_json()).collect())
			}
		}
	}

	/// Build a value out of JSON. Booleans become the integers 0 and 1.
	pub fn from_json(value: &Value) -> Result<Self, DatapointError> {
		Ok(match value {
			Value::Bool(value) => Self::Integer(i64::from(*value)),
			Value::Number(number) => {
				if let Some(value) = number.as_i64() {
					Self::Integer(value)
				} else {
					Self::Float(number.as_f64().context(UnsupportedJson { found: "number" })?)
				}
			}
			Value::String(value) => Self::String(value.clone()),
			Value::Object(map) => Self::Dict(
				map.iter()
					.map(|(name, value)| Datapoint::from_json(name, value))
					.collect::<Result<_, _>>()?,
			),
			Value::Array(values) => Self::List(
				values
					.iter()
					.enumerate()
					.map(|(index, value)| Datapoint::from_json(index.to_string(), value))
					.collect::<Result<_, _>>()?,
			),
			Value::Null => return UnsupportedJson { found: "null" }.fail(),
		})
	}
}

impl From<i64> for DatapointValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<i32> for DatapointValue {
	fn from(value: i32) -> Self {
		Self::Integer(value.into())
	}
}

impl From<bool> for DatapointValue {
	fn from(value: bool) -> Self {
		Self::Integer(value.into())
	}
}

impl From<f64> for DatapointValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<f32> for DatapointValue {
	fn from(value: f32) -> Self {
		Self::Float(value.into())
	}
}

impl From<String> for DatapointValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<&str> for DatapointValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}

impl TryFrom<&DatapointValue> for i64 {
	type Error = DatapointError;
	fn try_from(value: &DatapointValue) -> Result<Self, Self::Error> {
		match value {
			DatapointValue::Integer(value) => Ok(*value),
			other => InvalidType { expected: "integer", found: other.kind() }.fail(),
		}
	}
}

impl TryFrom<&DatapointValue> for f64 {
	type Error = DatapointError;
	/// Integers are widened, a measurement encoded as `1` is still a number.
	fn try_from(value: &DatapointValue) -> Result<Self, Self::Error> {
		match value {
			DatapointValue::Float(value) => Ok(*value),
			DatapointValue::Integer(value) => Ok(*value as f64),
			other => InvalidType { expected: "float", found: other.kind() }.fail(),
		}
	}
}

impl TryFrom<&DatapointValue> for String {
	type Error = DatapointError;
	fn try_from(value: &DatapointValue) -> Result<Self, Self::Error> {
		match value {
			DatapointValue::String(value) => Ok(value.clone()),
			other => InvalidType { expected: "string", found: other.kind() }.fail(),
		}
	}
}

impl TryFrom<&DatapointValue> for bool {
	type Error = DatapointError;
	/// Flags are carried as integers, anything non zero is set.
	fn try_from(value: &DatapointValue) -> Result<Self, Self::Error> {
		match value {
			DatapointValue::Integer(value) => Ok(*value != 0),
			other => InvalidType { expected: "integer", found: other.kind() }.fail(),
		}
	}
}

/// A named value inside a reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
	name: String,
	value: DatapointValue,
}

impl Datapoint {
	/// Create a leaf datapoint.
	pub fn new(name: impl Into<String>, value: impl Into<DatapointValue>) -> Self {
		Self { name: name.into(), value: value.into() }
	}

	/// Create a dictionary datapoint holding `children`.
	pub fn dict(name: impl Into<String>, children: Vec<Self>) -> Self {
		Self { name: name.into(), value: DatapointValue::Dict(children) }
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub const fn value(&self) -> &DatapointValue {
		&self.value
	}

	#[must_use]
	pub fn into_value(self) -> DatapointValue {
		self.value
	}

	/// Children of a dict or list, empty for scalar values.
	#[must_use]
	pub fn children(&self) -> &[Self] {
		match &self.value {
			DatapointValue::Dict(children) | DatapointValue::List(children) => children,
			_ => &[],
		}
	}

	/// First child called `name`.
	#[must_use]
	pub fn child(&self, name: &str) -> Option<&Self> {
		self.children().iter().find(|child| child.name == name)
	}

	/// Follow a chain of child names.
	#[must_use]
	pub fn find(&self, path: &[&str]) -> Option<&Self> {
		path.iter().try_fold(self, |node, name| node.child(name))
	}

	#[must_use]
	pub const fn is_dict(&self) -> bool {
		matches!(self.value, DatapointValue::Dict(_))
	}

	/// Build a datapoint called `name` out of JSON.
	pub fn from_json(name: impl Into<String>, value: &Value) -> Result<Self, DatapointError> {
		Ok(Self { name: name.into(), value: DatapointValue::from_json(value)? })
	}
}

impl fmt::Display for Datapoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = Map::new();
		map.insert(self.name.clone(), self.value.to_json());
		if f.alternate() {
			write!(f, "{}", serde_json::to_string_pretty(&map).unwrap_or_default())
		} else {
			write!(f, "{}", serde_json::to_string(&map).unwrap_or_default())
		}
	}
}

/// One reading of the pipeline: an asset name and its datapoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReadingJson", into = "ReadingJson")]
pub struct Reading {
	asset_name: String,
	datapoints: Vec<Datapoint>,
}

impl Reading {
	pub fn new(asset_name: impl Into<String>, datapoints: Vec<Datapoint>) -> Self {
		Self { asset_name: asset_name.into(), datapoints }
	}

	#[must_use]
	pub fn asset_name(&self) -> &str {
		&self.asset_name
	}

	pub fn set_asset_name(&mut self, asset_name: impl Into<String>) {
		self.asset_name = asset_name.into();
	}

	#[must_use]
	pub fn datapoints(&self) -> &[Datapoint] {
		&self.datapoints
	}

	/// Take the datapoints out, leaving the reading empty.
	pub fn take_datapoints(&mut self) -> Vec<Datapoint> {
		std::mem::take(&mut self.datapoints)
	}

	pub fn set_datapoints(&mut self, datapoints: Vec<Datapoint>) {
		self.datapoints = datapoints;
	}

	/// First top level datapoint called `name`.
	#[must_use]
	pub fn datapoint(&self, name: &str) -> Option<&Datapoint> {
		self.datapoints.iter().find(|dp| dp.name == name)
	}
}

/// JSON shape of a reading, as produced by the host's JSON export.
#[derive(Debug, Serialize, Deserialize)]
struct ReadingJson {
	asset_code: String,
	reading: Map<String, Value>,
}

impl TryFrom<ReadingJson> for Reading {
	type Error = DatapointError;
	fn try_from(value: ReadingJson) -> Result<Self, Self::Error> {
		Ok(Self {
			asset_name: value.asset_code,
			datapoints: value
				.reading
				.iter()
				.map(|(name, value)| Datapoint::from_json(name, value))
				.collect::<Result<_, _>>()?,
		})
	}
}

impl From<Reading> for ReadingJson {
	fn from(value: Reading) -> Self {
		Self {
			asset_code: value.asset_name,
			reading: value.datapoints.into_iter().map(|dp| (dp.name, dp.value.to_json())).collect(),
		}
	}
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum DatapointError {
	/// The value does not have the expected type.
	#[snafu(display("Invalid value type: expected {expected}, found {found}"))]
	InvalidType { expected: &'static str, found: &'static str },
	/// The JSON value has no datapoint representation.
	#[snafu(display("Unsupported JSON value: {found}"))]
	UnsupportedJson { found: &'static str },
}

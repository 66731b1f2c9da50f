//! Pivot object model.
//!
//! A Pivot object is an IEC 61850 inspired tree rooted at a `PIVOT`
//! datapoint. The root holds a single logical node (`GTIS`, `GTIM` or
//! `GTIC`) which in turn holds the common data class (CDC) carrying the
//! value, its quality and its timestamp:
//!
//! ```text
//! PIVOT
//!   GTIS
//!     ComingFrom: "iec104"
//!     Identifier: "ID-45-672"
//!     Cause { stVal: 3 }
//!     TmOrg { stVal: "genuine" }
//!     TmValidity { stVal: "good" }
//!     SpsTyp
//!       stVal: 1
//!       q { Source: "process", Validity: "good" }
//!       t { SecondSinceEpoch, FractionOfSecond, TimeQuality { .. } }
//! ```

use std::fmt;

use snafu::{OptionExt as _, ResultExt as _, Snafu};

use crate::{
	SpanTraceWrapper,
	datapoint::{Datapoint, DatapointError, DatapointValue},
	iec104::{DoublePointState, PROTOCOL_NAME, QualityDescriptor, RegulatingStep},
};

pub mod data_object;
pub mod operation_object;
pub mod quality;
pub mod timestamp;

pub use data_object::PivotDataObject;
pub use operation_object::PivotOperationObject;
pub use quality::{DetailQuality, Quality, Source, Validity};
pub use timestamp::{PivotTimestamp, TimeQuality};

/// Name of the root datapoint of every Pivot object.
pub const PIVOT_ROOT: &str = "PIVOT";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum PivotObjectError {
	#[snafu(display("Expected a 'PIVOT' dict datapoint, found '{name}'"))]
	InvalidRoot {
		name: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("No known logical node under 'PIVOT'"))]
	UnknownLogicalNode {
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Logical node {logical_node} has no known CDC"))]
	UnknownCdc {
		logical_node: LogicalNode,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("CDC {cdc} is not allowed under {logical_node}"))]
	CdcNotAllowed {
		logical_node: LogicalNode,
		cdc: CdcType,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Invalid field '{field}'"))]
	InvalidField {
		field: String,
		source: DatapointError,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Invalid value '{value}' for field '{field}'"))]
	InvalidEnumValue {
		field: String,
		value: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Missing field '{field}'"))]
	MissingField {
		field: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Value {value} of field '{field}' is out of range"))]
	ValueOutOfRange {
		field: String,
		value: i64,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Time {ms} ms does not fit a 32 bit second counter since the epoch"))]
	TimeOutOfRange {
		ms: i64,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},
}

/// Logical node of a Pivot object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalNode {
	/// Status information.
	Gtis,
	/// Measurements.
	Gtim,
	/// Commands and their acknowledgements.
	Gtic,
}

impl LogicalNode {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Gtis => "GTIS",
			Self::Gtim => "GTIM",
			Self::Gtic => "GTIC",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::Gtis, Self::Gtim, Self::Gtic].into_iter().find(|node| node.as_str() == value)
	}

	/// CDCs that may appear under this logical node.
	#[must_use]
	pub const fn allowed_cdcs(self) -> &'static [CdcType] {
		match self {
			Self::Gtis => &[CdcType::Sps, CdcType::Dps, CdcType::Bsc],
			Self::Gtim => &[CdcType::Mv],
			Self::Gtic => &[
				CdcType::Spc,
				CdcType::Dpc,
				CdcType::Inc,
				CdcType::Apc,
				CdcType::Bsc,
			],
		}
	}
}

impl fmt::Display for LogicalNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Common data class of a Pivot object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdcType {
	Sps,
	Dps,
	Mv,
	Spc,
	Dpc,
	Inc,
	Apc,
	Bsc,
}

impl CdcType {
	const ALL: [Self; 8] =
		[Self::Sps, Self::Dps, Self::Mv, Self::Spc, Self::Dpc, Self::Inc, Self::Apc, Self::Bsc];

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Sps => "SpsTyp",
			Self::Dps => "DpsTyp",
			Self::Mv => "MvTyp",
			Self::Spc => "SpcTyp",
			Self::Dpc => "DpcTyp",
			Self::Inc => "IncTyp",
			Self::Apc => "ApcTyp",
			Self::Bsc => "BscTyp",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|cdc| cdc.as_str() == value)
	}
}

impl fmt::Display for CdcType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Value attribute of a CDC.
#[derive(Debug, Clone, PartialEq)]
pub enum CdcValue {
	/// `stVal` of an SPS, carried as 0/1.
	StVal(bool),
	/// `stVal` of a DPS, one of the double point state names.
	StValStr(String),
	/// `mag.i` of an MV.
	MagI(i64),
	/// `mag.f` of an MV.
	MagF(f64),
	/// `valWTr` of a BSC status.
	PosVal { pos_val: i64, trans_ind: bool },
	/// `ctlVal` of an SPC.
	CtlValBool(bool),
	/// `ctlVal` of a DPC (double point state) or BSC (step command).
	CtlValStr(String),
	/// `ctlVal` of an INC.
	CtlValI(i64),
	/// `ctlVal` of an APC.
	CtlValF(f64),
}

impl CdcValue {
	/// Attribute name used in diagnostics.
	#[must_use]
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::StVal(_) | Self::StValStr(_) => "stVal",
			Self::MagI(_) => "mag.i",
			Self::MagF(_) => "mag.f",
			Self::PosVal { .. } => "valWTr",
			Self::CtlValBool(_) | Self::CtlValStr(_) | Self::CtlValI(_) | Self::CtlValF(_) => "ctlVal",
		}
	}

	fn to_datapoints(&self) -> Vec<Datapoint> {
		match self {
			Self::StVal(value) => vec![Datapoint::new("stVal", *value)],
			Self::StValStr(value) => vec![Datapoint::new("stVal", value.as_str())],
			Self::MagI(value) => vec![Datapoint::dict("mag", vec![Datapoint::new("i", *value)])],
			Self::MagF(value) => vec![Datapoint::dict("mag", vec![Datapoint::new("f", *value)])],
			Self::PosVal { pos_val, trans_ind } => vec![Datapoint::dict(
				"valWTr",
				vec![Datapoint::new("posVal", *pos_val), Datapoint::new("transInd", *trans_ind)],
			)],
			Self::CtlValBool(value) => vec![Datapoint::new("ctlVal", *value)],
			Self::CtlValStr(value) => vec![Datapoint::new("ctlVal", value.as_str())],
			Self::CtlValI(value) => vec![Datapoint::new("ctlVal", *value)],
			Self::CtlValF(value) => vec![Datapoint::new("ctlVal", *value)],
		}
	}

	/// Read the value attribute of a CDC dict, `None` when it has none.
	fn from_cdc(cdc: CdcType, dp: &Datapoint) -> Result<Option<Self>, PivotObjectError> {
		let prefix = cdc.as_str();
		let field = |name: &str| format!("{prefix}.{name}");

		Ok(Some(match cdc {
			CdcType::Sps => {
				let Some(st_val) = dp.child("stVal") else { return Ok(None) };
				Self::StVal(bool::try_from(st_val.value()).context(InvalidField { field: field("stVal") })?)
			}
			CdcType::Dps => {
				let Some(st_val) = dp.child("stVal") else { return Ok(None) };
				Self::StValStr(
					String::try_from(st_val.value()).context(InvalidField { field: field("stVal") })?,
				)
			}
			CdcType::Mv => {
				let Some(mag) = dp.child("mag") else { return Ok(None) };
				if let Some(f) = mag.child("f") {
					Self::MagF(f64::try_from(f.value()).context(InvalidField { field: field("mag.f") })?)
				} else if let Some(i) = mag.child("i") {
					Self::MagI(i64::try_from(i.value()).context(InvalidField { field: field("mag.i") })?)
				} else {
					return MissingField { field: field("mag") }.fail();
				}
			}
			CdcType::Bsc => {
				if let Some(val_w_tr) = dp.child("valWTr") {
					let pos_val = val_w_tr
						.child("posVal")
						.context(MissingField { field: field("valWTr.posVal") })?;
					let trans_ind = match val_w_tr.child("transInd") {
						Some(trans_ind) => bool::try_from(trans_ind.value())
							.context(InvalidField { field: field("valWTr.transInd") })?,
						None => false,
					};
					Self::PosVal {
						pos_val: i64::try_from(pos_val.value())
							.context(InvalidField { field: field("valWTr.posVal") })?,
						trans_ind,
					}
				} else if let Some(ctl_val) = dp.child("ctlVal") {
					Self::CtlValStr(
						String::try_from(ctl_val.value())
							.context(InvalidField { field: field("ctlVal") })?,
					)
				} else {
					return Ok(None);
				}
			}
			CdcType::Spc | CdcType::Dpc | CdcType::Inc | CdcType::Apc => {
				let Some(ctl_val) = dp.child("ctlVal") else { return Ok(None) };
				let value = ctl_val.value();
				let context = || InvalidField { field: field("ctlVal") };
				match cdc {
					CdcType::Spc => Self::CtlValBool(bool::try_from(value).context(context())?),
					CdcType::Dpc => Self::CtlValStr(String::try_from(value).context(context())?),
					CdcType::Inc => Self::CtlValI(i64::try_from(value).context(context())?),
					_ => Self::CtlValF(f64::try_from(value).context(context())?),
				}
			}
		}))
	}
}

/// Value of a Pivot object as a plain number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PivotValue {
	Integer(i64),
	Float(f64),
}

/// Origin of the timestamp (`TmOrg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOrigin {
	Genuine,
	Substituted,
}

impl TimeOrigin {
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Genuine => "genuine",
			Self::Substituted => "substituted",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::Genuine, Self::Substituted].into_iter().find(|origin| origin.as_str() == value)
	}
}

/// Logical node level attributes shared by data and operation objects.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotObject {
	logical_node: LogicalNode,
	cdc: CdcType,
	identifier: Option<String>,
	coming_from: Option<String>,
	cause: Option<i64>,
	confirmation: Option<bool>,
	test: Option<bool>,
	select: Option<bool>,
	tm_org: Option<TimeOrigin>,
	tm_validity: Option<Validity>,
	value: Option<CdcValue>,
	quality: Option<Quality>,
	timestamp: Option<PivotTimestamp>,
}

impl PivotObject {
	/// New, empty object with `ComingFrom` set to `iec104`.
	#[must_use]
	pub fn new(logical_node: LogicalNode, cdc: CdcType) -> Self {
		Self {
			logical_node,
			cdc,
			identifier: None,
			coming_from: Some(PROTOCOL_NAME.to_owned()),
			cause: None,
			confirmation: None,
			test: None,
			select: None,
			tm_org: None,
			tm_validity: None,
			value: None,
			quality: None,
			timestamp: None,
		}
	}

	#[must_use]
	pub const fn logical_node(&self) -> LogicalNode {
		self.logical_node
	}

	#[must_use]
	pub const fn cdc(&self) -> CdcType {
		self.cdc
	}

	#[must_use]
	pub fn identifier(&self) -> Option<&str> {
		self.identifier.as_deref()
	}

	pub fn set_identifier(&mut self, identifier: impl Into<String>) {
		self.identifier = Some(identifier.into());
	}

	#[must_use]
	pub fn coming_from(&self) -> Option<&str> {
		self.coming_from.as_deref()
	}

	#[must_use]
	pub const fn cause(&self) -> Option<i64> {
		self.cause
	}

	pub const fn set_cause(&mut self, cause: i64) {
		self.cause = Some(cause);
	}

	#[must_use]
	pub const fn confirmation(&self) -> Option<bool> {
		self.confirmation
	}

	pub const fn set_confirmation(&mut self, confirmation: bool) {
		self.confirmation = Some(confirmation);
	}

	/// Logical node level `Test`, see also [`Quality::test`].
	#[must_use]
	pub const fn test(&self) -> Option<bool> {
		self.test
	}

	pub const fn set_test(&mut self, test: bool) {
		self.test = Some(test);
	}

	#[must_use]
	pub const fn select(&self) -> Option<bool> {
		self.select
	}

	pub const fn set_select(&mut self, select: bool) {
		self.select = Some(select);
	}

	#[must_use]
	pub const fn tm_org(&self) -> Option<TimeOrigin> {
		self.tm_org
	}

	pub const fn add_tm_org(&mut self, substituted: bool) {
		self.tm_org = Some(if substituted { TimeOrigin::Substituted } else { TimeOrigin::Genuine });
	}

	#[must_use]
	pub const fn tm_validity(&self) -> Option<Validity> {
		self.tm_validity
	}

	pub const fn add_tm_validity(&mut self, invalid: bool) {
		self.tm_validity = Some(if invalid { Validity::Invalid } else { Validity::Good });
	}

	#[must_use]
	pub const fn cdc_value(&self) -> Option<&CdcValue> {
		self.value.as_ref()
	}

	pub fn set_cdc_value(&mut self, value: CdcValue) {
		self.value = Some(value);
	}

	pub fn set_st_val(&mut self, value: bool) {
		self.set_cdc_value(CdcValue::StVal(value));
	}

	pub fn set_st_val_str(&mut self, value: impl Into<String>) {
		self.set_cdc_value(CdcValue::StValStr(value.into()));
	}

	pub fn set_mag_i(&mut self, value: i64) {
		self.set_cdc_value(CdcValue::MagI(value));
	}

	pub fn set_mag_f(&mut self, value: f64) {
		self.set_cdc_value(CdcValue::MagF(value));
	}

	pub fn set_pos_val(&mut self, pos_val: i64, trans_ind: bool) {
		self.set_cdc_value(CdcValue::PosVal { pos_val, trans_ind });
	}

	pub fn set_ctl_val_bool(&mut self, value: bool) {
		self.set_cdc_value(CdcValue::CtlValBool(value));
	}

	pub fn set_ctl_val_str(&mut self, value: impl Into<String>) {
		self.set_cdc_value(CdcValue::CtlValStr(value.into()));
	}

	pub fn set_ctl_val_i(&mut self, value: i64) {
		self.set_cdc_value(CdcValue::CtlValI(value));
	}

	pub fn set_ctl_val_f(&mut self, value: f64) {
		self.set_cdc_value(CdcValue::CtlValF(value));
	}

	/// Numeric view of the value. String states are mapped to their code.
	#[must_use]
	pub fn value(&self) -> Option<PivotValue> {
		Some(match self.value.as_ref()? {
			CdcValue::StVal(value) | CdcValue::CtlValBool(value) => {
				PivotValue::Integer(i64::from(*value))
			}
			CdcValue::StValStr(state) => PivotValue::Integer(DoublePointState::parse(state)?.code()),
			CdcValue::CtlValStr(state) if self.cdc == CdcType::Bsc => {
				PivotValue::Integer(RegulatingStep::parse(state)?.code())
			}
			CdcValue::CtlValStr(state) => PivotValue::Integer(DoublePointState::parse(state)?.code()),
			CdcValue::MagI(value) | CdcValue::CtlValI(value) => PivotValue::Integer(*value),
			CdcValue::PosVal { pos_val, .. } => PivotValue::Integer(*pos_val),
			CdcValue::MagF(value) | CdcValue::CtlValF(value) => PivotValue::Float(*value),
		})
	}

	#[must_use]
	pub const fn quality(&self) -> Option<&Quality> {
		self.quality.as_ref()
	}

	pub const fn set_quality(&mut self, quality: Quality) {
		self.quality = Some(quality);
	}

	/// Set the quality from IEC 104 quality bits.
	pub fn add_quality(&mut self, descriptor: QualityDescriptor, test: bool) {
		self.quality = Some(Quality::from_iec104(descriptor, test));
	}

	#[must_use]
	pub const fn timestamp(&self) -> Option<&PivotTimestamp> {
		self.timestamp.as_ref()
	}

	pub const fn set_timestamp(&mut self, timestamp: PivotTimestamp) {
		self.timestamp = Some(timestamp);
	}

	/// Set `t` from a millisecond epoch value as found in IEC 104 records.
	/// The object is left untouched when the time cannot be encoded.
	pub fn add_timestamp(&mut self, ms: i64, invalid: bool) -> Result<(), PivotObjectError> {
		let mut timestamp = PivotTimestamp::from_ms(ms)?;
		let quality = timestamp.quality_mut();
		quality.clock_failure = invalid;
		quality.leap_second_known = true;
		quality.time_accuracy = timestamp::DEFAULT_TIME_ACCURACY;
		self.timestamp = Some(timestamp);
		Ok(())
	}

	/// Render the whole tree under a `PIVOT` root.
	#[must_use]
	pub fn to_datapoint(&self) -> Datapoint {
		let stval = |name: &str, value: DatapointValue| {
			Datapoint::dict(name, vec![Datapoint::new("stVal", value)])
		};

		let mut cdc = self.value.as_ref().map(CdcValue::to_datapoints).unwrap_or_default();
		if let Some(quality) = &self.quality {
			cdc.push(quality.to_datapoint());
		}
		if let Some(timestamp) = &self.timestamp {
			cdc.push(timestamp.to_datapoint());
		}

		let mut node = Vec::new();
		if let Some(coming_from) = &self.coming_from {
			node.push(Datapoint::new("ComingFrom", coming_from.as_str()));
		}
		if let Some(identifier) = &self.identifier {
			node.push(Datapoint::new("Identifier", identifier.as_str()));
		}
		if let Some(cause) = self.cause {
			node.push(stval("Cause", cause.into()));
		}
		if let Some(confirmation) = self.confirmation {
			node.push(stval("Confirmation", confirmation.into()));
		}
		if let Some(test) = self.test {
			node.push(stval("Test", test.into()));
		}
		if let Some(select) = self.select {
			node.push(stval("Select", select.into()));
		}
		if let Some(tm_org) = self.tm_org {
			node.push(stval("TmOrg", tm_org.as_str().into()));
		}
		if let Some(tm_validity) = self.tm_validity {
			node.push(stval("TmValidity", tm_validity.as_str().into()));
		}
		node.push(Datapoint::dict(self.cdc.as_str(), cdc));

		Datapoint::dict(PIVOT_ROOT, vec![Datapoint::dict(self.logical_node.as_str(), node)])
	}
}

impl TryFrom<&Datapoint> for PivotObject {
	type Error = PivotObjectError;

	fn try_from(dp: &Datapoint) -> Result<Self, Self::Error> {
		if dp.name() != PIVOT_ROOT || !dp.is_dict() {
			return InvalidRoot { name: dp.name() }.fail();
		}

		let (logical_node, node) = dp
			.children()
			.iter()
			.find_map(|child| LogicalNode::parse(child.name()).map(|node| (node, child)))
			.context(UnknownLogicalNode)?;

		let (cdc, cdc_dp) = node
			.children()
			.iter()
			.find_map(|child| CdcType::parse(child.name()).map(|cdc| (cdc, child)))
			.context(UnknownCdc { logical_node })?;
		if !logical_node.allowed_cdcs().contains(&cdc) {
			return CdcNotAllowed { logical_node, cdc }.fail();
		}

		let mut object = Self::new(logical_node, cdc);
		object.coming_from = None;

		for child in node.children() {
			let name = child.name();
			match name {
				"ComingFrom" => {
					object.coming_from =
						Some(String::try_from(child.value()).context(InvalidField { field: name })?);
				}
				"Identifier" => {
					object.identifier =
						Some(String::try_from(child.value()).context(InvalidField { field: name })?);
				}
				"Cause" => object.cause = read_st_val(child, |value| i64::try_from(value))?,
				"Confirmation" => object.confirmation = read_st_val(child, |value| bool::try_from(value))?,
				"Test" => object.test = read_st_val(child, |value| bool::try_from(value))?,
				"Select" => object.select = read_st_val(child, |value| bool::try_from(value))?,
				"TmOrg" => {
					object.tm_org = read_st_val(child, |value| String::try_from(value))?
						.map(|value| {
							TimeOrigin::parse(&value)
								.context(InvalidEnumValue { field: "TmOrg.stVal", value })
						})
						.transpose()?;
				}
				"TmValidity" => {
					object.tm_validity = read_st_val(child, |value| String::try_from(value))?
						.map(|value| {
							Validity::parse(&value)
								.context(InvalidEnumValue { field: "TmValidity.stVal", value })
						})
						.transpose()?;
				}
				_ => {}
			}
		}

		object.value = CdcValue::from_cdc(cdc, cdc_dp)?;
		if let Some(q) = cdc_dp.child("q") {
			object.quality = Some(Quality::try_from(q)?);
		}
		if let Some(t) = cdc_dp.child("t") {
			object.timestamp = Some(PivotTimestamp::try_from(t)?);
		}

		Ok(object)
	}
}

/// Read the `stVal` of a logical node attribute such as `Cause`.
fn read_st_val<T>(
	dp: &Datapoint,
	convert: impl FnOnce(&DatapointValue) -> Result<T, DatapointError>,
) -> Result<Option<T>, PivotObjectError> {
	dp.child("stVal")
		.map(|st_val| {
			convert(st_val.value()).context(InvalidField { field: format!("{}.stVal", dp.name()) })
		})
		.transpose()
}

impl fmt::Display for PivotObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if f.alternate() {
			write!(f, "{:#}", self.to_datapoint())
		} else {
			write!(f, "{}", self.to_datapoint())
		}
	}
}

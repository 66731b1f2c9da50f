//! Supported ASDU types and how their values map onto Pivot CDCs.

use std::collections::HashMap;

use lazy_static::lazy_static;
use snafu::Snafu;

use crate::{
	SpanTraceWrapper,
	iec104::{DoublePointState, Iec104Value, RegulatingStep, StepPosition},
	pivot::{CdcType, CdcValue, LogicalNode},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum AsduError {
	#[snafu(display("Unsupported ASDU type '{type_id}'"))]
	UnknownType {
		type_id: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("{family:?} does not accept {found} values"))]
	InvalidValueType {
		family: AsduFamily,
		found: &'static str,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Pivot CDC {cdc} does not match {family:?}"))]
	CdcMismatch {
		family: AsduFamily,
		cdc: CdcType,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Invalid step position '{value}', expected '[position,transient]'"))]
	InvalidStepPosition {
		value: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Step position {position} out of range [-64, 63]"))]
	StepPositionRange {
		position: i64,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("'{value}' is not an integer"))]
	NotAnInteger {
		value: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Unknown state '{value}' for {family:?}"))]
	UnknownState {
		family: AsduFamily,
		value: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Value {value} out of range for {family:?} [{min}, {max}]"))]
	OutOfRange {
		family: AsduFamily,
		value: String,
		min: f64,
		max: f64,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Value {value} is not representable as a 32 bit float"))]
	NotAFloat32 {
		value: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},
}

/// Group of ASDU types sharing the same information object layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsduFamily {
	SinglePoint,
	DoublePoint,
	MeasuredNormalized,
	MeasuredScaled,
	MeasuredFloat,
	StepPosition,
	SingleCommand,
	DoubleCommand,
	SetpointNormalized,
	SetpointScaled,
	SetpointFloat,
	RegulatingStep,
}

/// Highest normalized value, 1 - 2^-15.
const NORMALIZED_MAX: f64 = 32767.0 / 32768.0;

enum ValueRange {
	Between(f64, f64),
	Float32,
}

impl AsduFamily {
	#[must_use]
	pub const fn logical_node(self) -> LogicalNode {
		match self {
			Self::SinglePoint | Self::DoublePoint | Self::StepPosition => LogicalNode::Gtis,
			Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat => {
				LogicalNode::Gtim
			}
			Self::SingleCommand
			| Self::DoubleCommand
			| Self::SetpointNormalized
			| Self::SetpointScaled
			| Self::SetpointFloat
			| Self::RegulatingStep => LogicalNode::Gtic,
		}
	}

	#[must_use]
	pub const fn cdc(self) -> CdcType {
		match self {
			Self::SinglePoint => CdcType::Sps,
			Self::DoublePoint => CdcType::Dps,
			Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat => CdcType::Mv,
			Self::StepPosition | Self::RegulatingStep => CdcType::Bsc,
			Self::SingleCommand => CdcType::Spc,
			Self::DoubleCommand => CdcType::Dpc,
			Self::SetpointScaled => CdcType::Inc,
			Self::SetpointNormalized | Self::SetpointFloat => CdcType::Apc,
		}
	}

	#[must_use]
	pub const fn is_command(self) -> bool {
		matches!(self.logical_node(), LogicalNode::Gtic)
	}

	fn range(self, value: &Iec104Value) -> ValueRange {
		match self {
			Self::SinglePoint | Self::SingleCommand => ValueRange::Between(0.0, 1.0),
			Self::DoublePoint | Self::DoubleCommand | Self::RegulatingStep => {
				ValueRange::Between(0.0, 3.0)
			}
			Self::MeasuredNormalized => match value {
				Iec104Value::Integer(_) => ValueRange::Between(-1.0, 1.0),
				_ => ValueRange::Between(-1.0, NORMALIZED_MAX),
			},
			Self::SetpointNormalized => ValueRange::Between(-1.0, NORMALIZED_MAX),
			Self::MeasuredScaled => ValueRange::Between(-32768.0, 32767.0),
			Self::StepPosition | Self::SetpointScaled => ValueRange::Between(-64.0, 63.0),
			Self::MeasuredFloat | Self::SetpointFloat => ValueRange::Float32,
		}
	}

	/// Check that the value fits the information element of this family.
	///
	/// Float families only check that the value survives narrowing to `f32`,
	/// exactly for integers and without overflow for floats.
	pub fn check_range(self, value: &Iec104Value) -> Result<(), AsduError> {
		let number = match value {
			Iec104Value::Integer(value) => *value as f64,
			Iec104Value::Float(value) => *value,
			Iec104Value::String(raw) => {
				if self == Self::StepPosition {
					return raw.parse::<StepPosition>()?.check_range();
				}
				return InvalidValueType { family: self, found: value.kind() }.fail();
			}
		};

		match self.range(value) {
			ValueRange::Between(min, max) => {
				if (min..=max).contains(&number) {
					Ok(())
				} else {
					OutOfRange { family: self, value: value.to_string(), min, max }.fail()
				}
			}
			ValueRange::Float32 => {
				let narrowed = number as f32;
				let exact = match value {
					Iec104Value::Integer(integer) => narrowed as i64 == *integer,
					_ => narrowed.is_finite() || !number.is_finite(),
				};
				if exact {
					Ok(())
				} else {
					NotAFloat32 { value: value.to_string() }.fail()
				}
			}
		}
	}

	/// Convert an information object value to the CDC value of this family.
	pub fn decode(self, value: &Iec104Value) -> Result<CdcValue, AsduError> {
		let invalid = || InvalidValueType { family: self, found: value.kind() }.build();

		Ok(match (self, value) {
			(Self::SinglePoint, Iec104Value::Integer(v)) => CdcValue::StVal(*v != 0),
			(Self::DoublePoint, Iec104Value::Integer(v)) => {
				CdcValue::StValStr(DoublePointState::from_code(*v).as_str().to_owned())
			}
			(
				Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat,
				Iec104Value::Integer(v),
			) => CdcValue::MagI(*v),
			(
				Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat,
				Iec104Value::Float(v),
			) => CdcValue::MagF(*v),
			(Self::StepPosition, Iec104Value::String(raw)) => {
				let step = raw.parse::<StepPosition>()?;
				CdcValue::PosVal { pos_val: step.position, trans_ind: step.transient }
			}
			(Self::SingleCommand, Iec104Value::Integer(v)) => CdcValue::CtlValBool(*v != 0),
			(Self::DoubleCommand, Iec104Value::Integer(v)) => {
				CdcValue::CtlValStr(DoublePointState::from_code(*v).as_str().to_owned())
			}
			(Self::RegulatingStep, Iec104Value::Integer(v)) => {
				CdcValue::CtlValStr(RegulatingStep::from_code(*v).as_str().to_owned())
			}
			(Self::SetpointScaled, Iec104Value::Integer(v)) => CdcValue::CtlValI(*v),
			(Self::SetpointNormalized | Self::SetpointFloat, Iec104Value::Integer(v)) => {
				CdcValue::CtlValF(*v as f64)
			}
			(Self::SetpointNormalized | Self::SetpointFloat, Iec104Value::Float(v)) => {
				CdcValue::CtlValF(*v)
			}
			_ => return Err(invalid()),
		})
	}

	/// Convert a CDC value back to the information object value of this family.
	pub fn encode(self, value: &CdcValue) -> Result<Iec104Value, AsduError> {
		let unknown_state = |state: &str| UnknownState { family: self, value: state }.build();

		Ok(match (self, value) {
			(Self::SinglePoint, CdcValue::StVal(v)) | (Self::SingleCommand, CdcValue::CtlValBool(v)) => {
				Iec104Value::Integer(i64::from(*v))
			}
			(Self::DoublePoint, CdcValue::StValStr(state))
			| (Self::DoubleCommand, CdcValue::CtlValStr(state)) => Iec104Value::Integer(
				DoublePointState::parse(state).ok_or_else(|| unknown_state(state))?.code(),
			),
			(Self::RegulatingStep, CdcValue::CtlValStr(state)) => Iec104Value::Integer(
				RegulatingStep::parse(state).ok_or_else(|| unknown_state(state))?.code(),
			),
			(
				Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat,
				CdcValue::MagI(v),
			)
			| (Self::SetpointScaled, CdcValue::CtlValI(v)) => Iec104Value::Integer(*v),
			(
				Self::MeasuredNormalized | Self::MeasuredScaled | Self::MeasuredFloat,
				CdcValue::MagF(v),
			)
			| (Self::SetpointNormalized | Self::SetpointFloat, CdcValue::CtlValF(v)) => {
				Iec104Value::Float(*v)
			}
			(Self::StepPosition, CdcValue::PosVal { pos_val, trans_ind }) => Iec104Value::String(
				StepPosition { position: *pos_val, transient: *trans_ind }.to_string(),
			),
			(family, value) => return InvalidValueType { family, found: value.kind() }.fail(),
		})
	}
}

/// One supported ASDU type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsduType {
	pub name: &'static str,
	pub family: AsduFamily,
}

const fn asdu(name: &'static str, family: AsduFamily) -> AsduType {
	AsduType { name, family }
}

/// Every ASDU type the filter converts.
pub const ASDU_TYPES: [AsduType; 24] = [
	asdu("M_SP_NA_1", AsduFamily::SinglePoint),
	asdu("M_SP_TB_1", AsduFamily::SinglePoint),
	asdu("M_DP_NA_1", AsduFamily::DoublePoint),
	asdu("M_DP_TB_1", AsduFamily::DoublePoint),
	asdu("M_ME_NA_1", AsduFamily::MeasuredNormalized),
	asdu("M_ME_TD_1", AsduFamily::MeasuredNormalized),
	asdu("M_ME_NB_1", AsduFamily::MeasuredScaled),
	asdu("M_ME_TE_1", AsduFamily::MeasuredScaled),
	asdu("M_ME_NC_1", AsduFamily::MeasuredFloat),
	asdu("M_ME_TF_1", AsduFamily::MeasuredFloat),
	asdu("M_ST_NA_1", AsduFamily::StepPosition),
	asdu("M_ST_TB_1", AsduFamily::StepPosition),
	asdu("C_SC_NA_1", AsduFamily::SingleCommand),
	asdu("C_SC_TA_1", AsduFamily::SingleCommand),
	asdu("C_DC_NA_1", AsduFamily::DoubleCommand),
	asdu("C_DC_TA_1", AsduFamily::DoubleCommand),
	asdu("C_SE_NA_1", AsduFamily::SetpointNormalized),
	asdu("C_SE_TA_1", AsduFamily::SetpointNormalized),
	asdu("C_SE_NB_1", AsduFamily::SetpointScaled),
	asdu("C_SE_TB_1", AsduFamily::SetpointScaled),
	asdu("C_SE_NC_1", AsduFamily::SetpointFloat),
	asdu("C_SE_TC_1", AsduFamily::SetpointFloat),
	asdu("C_RC_NA_1", AsduFamily::RegulatingStep),
	asdu("C_RC_TA_1", AsduFamily::RegulatingStep),
];

lazy_static! {
	static ref ASDU_INDEX: HashMap<&'static str, &'static AsduType> =
		ASDU_TYPES.iter().map(|asdu| (asdu.name, asdu)).collect();
}

impl AsduType {
	#[must_use]
	pub fn lookup(type_id: &str) -> Option<&'static Self> {
		ASDU_INDEX.get(type_id).copied()
	}

	/// Like [`AsduType::lookup`] but failing on unsupported types.
	pub fn get(type_id: &str) -> Result<&'static Self, AsduError> {
		Self::lookup(type_id).ok_or_else(|| UnknownType { type_id }.build())
	}

	#[must_use]
	pub fn is_timestamped(&self) -> bool {
		has_asdu_timestamp(self.name)
	}

	/// Whether `other` carries the same information object layout.
	#[must_use]
	pub fn same_family(&self, other: &Self) -> bool {
		self.family == other.family
	}
}

/// True when the 6th character of the type identifier is 'T' (`M_SP_TB_1`).
#[must_use]
pub fn has_asdu_timestamp(type_id: &str) -> bool {
	type_id.as_bytes().get(5) == Some(&b'T')
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timestamp_detection() {
		assert!(has_asdu_timestamp("M_SP_TB_1"));
		assert!(has_asdu_timestamp("C_SE_TC_1"));
		assert!(!has_asdu_timestamp("M_SP_NA_1"));
		assert!(!has_asdu_timestamp("M_SP"));
		assert!(!has_asdu_timestamp(""));
	}

	#[test]
	fn test_lookup_table() {
		for asdu in &ASDU_TYPES {
			assert_eq!(AsduType::lookup(asdu.name), Some(asdu));
		}
		assert!(AsduType::lookup("M_XX_NA_1").is_none());
		assert!(AsduType::get("M_XX_NA_1").is_err());

		let tb = AsduType::lookup("M_SP_TB_1");
		let na = AsduType::lookup("M_SP_NA_1");
		let dp = AsduType::lookup("M_DP_TB_1");
		assert!(tb.zip(na).is_some_and(|(tb, na)| tb.same_family(na)));
		assert!(tb.zip(dp).is_some_and(|(tb, dp)| !tb.same_family(dp)));
	}

	#[test]
	fn test_family_mapping() {
		assert_eq!(AsduFamily::SinglePoint.logical_node(), LogicalNode::Gtis);
		assert_eq!(AsduFamily::StepPosition.logical_node(), LogicalNode::Gtis);
		assert_eq!(AsduFamily::MeasuredScaled.logical_node(), LogicalNode::Gtim);
		assert_eq!(AsduFamily::RegulatingStep.logical_node(), LogicalNode::Gtic);
		assert_eq!(AsduFamily::RegulatingStep.cdc(), CdcType::Bsc);
		assert_eq!(AsduFamily::SetpointScaled.cdc(), CdcType::Inc);
		assert_eq!(AsduFamily::SetpointFloat.cdc(), CdcType::Apc);
		assert!(AsduFamily::DoubleCommand.is_command());
		assert!(!AsduFamily::MeasuredFloat.is_command());
	}

	#[test]
	fn test_decode() -> Result<(), AsduError> {
		assert_eq!(AsduFamily::SinglePoint.decode(&Iec104Value::Integer(1))?, CdcValue::StVal(true));
		assert_eq!(
			AsduFamily::DoublePoint.decode(&Iec104Value::Integer(2))?,
			CdcValue::StValStr("on".to_owned())
		);
		assert_eq!(
			AsduFamily::MeasuredFloat.decode(&Iec104Value::Float(1.5))?,
			CdcValue::MagF(1.5)
		);
		assert_eq!(
			AsduFamily::StepPosition.decode(&Iec104Value::String("[7,true]".to_owned()))?,
			CdcValue::PosVal { pos_val: 7, trans_ind: true }
		);
		assert_eq!(
			AsduFamily::RegulatingStep.decode(&Iec104Value::Integer(1))?,
			CdcValue::CtlValStr("lower".to_owned())
		);
		assert_eq!(
			AsduFamily::SetpointNormalized.decode(&Iec104Value::Integer(1))?,
			CdcValue::CtlValF(1.0)
		);
		assert!(AsduFamily::SinglePoint.decode(&Iec104Value::String("x".to_owned())).is_err());
		assert!(AsduFamily::StepPosition.decode(&Iec104Value::Integer(1)).is_err());
		Ok(())
	}

	#[test]
	fn test_encode() -> Result<(), AsduError> {
		assert_eq!(AsduFamily::SinglePoint.encode(&CdcValue::StVal(true))?, Iec104Value::Integer(1));
		assert_eq!(
			AsduFamily::DoubleCommand.encode(&CdcValue::CtlValStr("off".to_owned()))?,
			Iec104Value::Integer(1)
		);
		assert_eq!(
			AsduFamily::RegulatingStep.encode(&CdcValue::CtlValStr("higher".to_owned()))?,
			Iec104Value::Integer(2)
		);
		assert_eq!(
			AsduFamily::StepPosition.encode(&CdcValue::PosVal { pos_val: -2, trans_ind: false })?,
			Iec104Value::String("[-2,false]".to_owned())
		);
		assert!(AsduFamily::DoublePoint.encode(&CdcValue::StValStr("sideways".to_owned())).is_err());
		assert!(matches!(
			AsduFamily::SinglePoint.encode(&CdcValue::MagF(1.0)),
			Err(AsduError::InvalidValueType { found: "mag.f", .. })
		));
		Ok(())
	}

	#[test]
	fn test_range_checks() {
		let int = Iec104Value::Integer;
		let float = Iec104Value::Float;

		assert!(AsduFamily::SinglePoint.check_range(&int(1)).is_ok());
		assert!(AsduFamily::SinglePoint.check_range(&int(2)).is_err());
		assert!(AsduFamily::MeasuredNormalized.check_range(&int(1)).is_ok());
		assert!(AsduFamily::MeasuredNormalized.check_range(&float(1.0)).is_err());
		assert!(AsduFamily::MeasuredNormalized.check_range(&float(-1.0)).is_ok());
		assert!(AsduFamily::MeasuredScaled.check_range(&int(32767)).is_ok());
		assert!(AsduFamily::MeasuredScaled.check_range(&int(-32769)).is_err());
		assert!(AsduFamily::SetpointScaled.check_range(&int(64)).is_err());
		assert!(AsduFamily::MeasuredFloat.check_range(&float(1.1)).is_ok());
		assert!(AsduFamily::MeasuredFloat.check_range(&float(1.0e300)).is_err());
		assert!(AsduFamily::SetpointFloat.check_range(&int(16_777_217)).is_err());
		assert!(
			AsduFamily::StepPosition
				.check_range(&Iec104Value::String("[64,false]".to_owned()))
				.is_err()
		);
	}
}

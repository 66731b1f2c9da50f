//! Pivot quality (`q`) attribute.

use snafu::{OptionExt as _, ResultExt as _};

use crate::{
	datapoint::Datapoint,
	iec104::QualityDescriptor,
	pivot::{InvalidEnumValue, InvalidField, PivotObjectError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
	#[default]
	Good,
	Invalid,
	Reserved,
	Questionable,
}

impl Validity {
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Good => "good",
			Self::Invalid => "invalid",
			Self::Reserved => "reserved",
			Self::Questionable => "questionable",
		}
	}

	/// Parse a validity string. Older producers capitalise "Good".
	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::Good, Self::Invalid, Self::Reserved, Self::Questionable]
			.into_iter()
			.find(|validity| validity.as_str().eq_ignore_ascii_case(value))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
	#[default]
	Process,
	Substituted,
}

impl Source {
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Process => "process",
			Self::Substituted => "substituted",
		}
	}

	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		[Self::Process, Self::Substituted]
			.into_iter()
			.find(|source| source.as_str().eq_ignore_ascii_case(value))
	}
}

/// IEC 61850 detail quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailQuality {
	pub bad_reference: bool,
	pub failure: bool,
	pub inconsistent: bool,
	pub inaccurate: bool,
	pub old_data: bool,
	pub oscillatory: bool,
	pub out_of_range: bool,
	pub overflow: bool,
}

impl DetailQuality {
	/// Element names in the order they are emitted.
	const NAMES: [&'static str; 8] = [
		"badReference",
		"failure",
		"inconsistent",
		"inaccurate",
		"oldData",
		"oscillatory",
		"outOfRange",
		"overflow",
	];

	const fn flags(&self) -> [bool; 8] {
		[
			self.bad_reference,
			self.failure,
			self.inconsistent,
			self.inaccurate,
			self.old_data,
			self.oscillatory,
			self.out_of_range,
			self.overflow,
		]
	}

	fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
		Some(match name {
			"badReference" => &mut self.bad_reference,
			"failure" => &mut self.failure,
			"inconsistent" => &mut self.inconsistent,
			"inaccurate" => &mut self.inaccurate,
			"oldData" => &mut self.old_data,
			"oscillatory" => &mut self.oscillatory,
			"outOfRange" => &mut self.out_of_range,
			"overflow" => &mut self.overflow,
			_ => return None,
		})
	}

	#[must_use]
	pub fn any(&self) -> bool {
		self.flags().into_iter().any(|flag| flag)
	}
}

/// The full quality of a Pivot data attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quality {
	pub validity: Validity,
	pub source: Source,
	pub detail: DetailQuality,
	pub operator_blocked: bool,
	pub test: bool,
}

impl Quality {
	/// Map IEC 104 quality descriptor bits.
	///
	/// `oldData` (NT) and `overflow` (OV) without IV make the value questionable.
	#[must_use]
	pub fn from_iec104(descriptor: QualityDescriptor, test: bool) -> Self {
		let validity = if descriptor.invalid {
			Validity::Invalid
		} else if descriptor.not_topical || descriptor.overflow {
			Validity::Questionable
		} else {
			Validity::Good
		};
		Self {
			validity,
			source: if descriptor.substituted { Source::Substituted } else { Source::Process },
			detail: DetailQuality {
				old_data: descriptor.not_topical,
				overflow: descriptor.overflow,
				..DetailQuality::default()
			},
			operator_blocked: descriptor.blocked,
			test,
		}
	}

	/// The IEC 104 quality descriptor bits carried by this quality.
	#[must_use]
	pub const fn to_iec104(&self) -> QualityDescriptor {
		QualityDescriptor {
			invalid: matches!(self.validity, Validity::Invalid),
			blocked: self.operator_blocked,
			overflow: self.detail.overflow,
			substituted: matches!(self.source, Source::Substituted),
			not_topical: self.detail.old_data,
		}
	}

	#[must_use]
	pub fn to_datapoint(&self) -> Datapoint {
		let mut children = Vec::new();

		if self.detail.any() {
			children.push(Datapoint::dict(
				"DetailQuality",
				DetailQuality::NAMES
					.into_iter()
					.zip(self.detail.flags())
					.filter(|(_, set)| *set)
					.map(|(name, _)| Datapoint::new(name, 1))
					.collect(),
			));
		}
		children.push(Datapoint::new("Source", self.source.as_str()));
		if self.operator_blocked {
			children.push(Datapoint::new("operatorBlocked", 1));
		}
		if self.test {
			children.push(Datapoint::new("test", 1));
		}
		children.push(Datapoint::new("Validity", self.validity.as_str()));

		Datapoint::dict("q", children)
	}
}

impl TryFrom<&Datapoint> for Quality {
	type Error = PivotObjectError;

	fn try_from(dp: &Datapoint) -> Result<Self, Self::Error> {
		let mut quality = Self::default();

		for child in dp.children() {
			match child.name() {
				"Validity" => {
					let value = String::try_from(child.value())
						.context(InvalidField { field: "q.Validity" })?;
					quality.validity = Validity::parse(&value)
						.context(InvalidEnumValue { field: "q.Validity", value })?;
				}
				"Source" => {
					let value = String::try_from(child.value())
						.context(InvalidField { field: "q.Source" })?;
					quality.source =
						Source::parse(&value).context(InvalidEnumValue { field: "q.Source", value })?;
				}
				"operatorBlocked" => {
					quality.operator_blocked = bool::try_from(child.value())
						.context(InvalidField { field: "q.operatorBlocked" })?;
				}
				"test" => {
					quality.test =
						bool::try_from(child.value()).context(InvalidField { field: "q.test" })?;
				}
				"DetailQuality" => {
					for detail in child.children() {
						let Some(flag) = quality.detail.flag_mut(detail.name()) else {
							tracing::debug!("Ignoring unknown detail quality '{}'", detail.name());
							continue;
						};
						*flag = bool::try_from(detail.value())
							.context(InvalidField { field: format!("q.DetailQuality.{}", detail.name()) })?;
					}
				}
				_ => {}
			}
		}

		Ok(quality)
	}
}

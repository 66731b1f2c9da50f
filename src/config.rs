//! Exchanged data configuration.
//!
//! The configuration lists the points exchanged over IEC 104 with their
//! Pivot identity:
//!
//! ```json
//! {"exchanged_data": {"datapoints": [{
//!     "label": "TS1", "pivot_id": "ID-45-672", "pivot_type": "SpsTyp",
//!     "protocols": [{"name": "iec104", "address": "45-672", "typeid": "M_SP_NA_1"}]
//! }]}}
//! ```
//!
//! Every `iec104` protocol entry becomes an [`ExchangePoint`] indexed by
//! label, by `"CA-IOA"` address and by pivot id.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt as _, ResultExt as _, Snafu};

use crate::{SpanTraceWrapper, iec104::PROTOCOL_NAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangedDataDocument {
	pub exchanged_data: ExchangedData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangedData {
	pub datapoints: Vec<ExchangedDatapoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangedDatapoint {
	pub label: String,
	pub pivot_id: String,
	pub pivot_type: String,
	pub protocols: Vec<Protocol>,
}

/// One protocol entry of a datapoint. The fields are protocol specific and
/// only checked for `iec104` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub typeid: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alternate_mapping_rule: Option<Value>,
}

impl Protocol {
	fn string_field(
		value: Option<&Value>,
		label: &str,
		field: &'static str,
	) -> Result<Option<String>, ConfigError> {
		value
			.map(|value| {
				value.as_str().map(str::to_owned).context(InvalidProtocolField { label, field })
			})
			.transpose()
	}
}

/// One point exchanged over IEC 104.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangePoint {
	pub label: String,
	pub pivot_id: String,
	pub pivot_type: String,
	/// ASDU type identifier, e.g. `M_SP_NA_1`.
	pub type_id: String,
	pub common_address: i64,
	pub ioa: i64,
	pub alternate_mapping_rule: Option<String>,
}

impl ExchangePoint {
	/// The `"CA-IOA"` key of this point.
	#[must_use]
	pub fn address_key(&self) -> String {
		address_key(self.common_address, self.ioa)
	}
}

#[must_use]
pub fn address_key(common_address: i64, ioa: i64) -> String {
	format!("{common_address}-{ioa}")
}

/// Parse a `"CA-IOA"` address.
pub fn parse_address(address: &str) -> Option<(i64, i64)> {
	let (ca, ioa) = address.split_once('-')?;
	Some((ca.trim().parse().ok()?, ioa.trim().parse().ok()?))
}

/// Immutable lookup snapshot of the exchanged data.
#[derive(Debug, Clone, Default)]
pub struct ExchangeConfig {
	by_label: HashMap<String, Arc<ExchangePoint>>,
	by_address: HashMap<String, Arc<ExchangePoint>>,
	by_pivot_id: HashMap<String, Arc<ExchangePoint>>,
}

impl ExchangeConfig {
	/// Parse a JSON configuration document.
	pub fn import(json: &str) -> Result<Self, ConfigError> {
		let document: ExchangedDataDocument = serde_json::from_str(json).context(InvalidDocument)?;
		Self::from_document(&document)
	}

	/// Same as [`ExchangeConfig::import`] for an already parsed document.
	pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
		let document = ExchangedDataDocument::deserialize(value).context(InvalidDocument)?;
		Self::from_document(&document)
	}

	pub fn from_document(document: &ExchangedDataDocument) -> Result<Self, ConfigError> {
		let mut config = Self::default();

		for datapoint in &document.exchanged_data.datapoints {
			for protocol in datapoint.protocols.iter().filter(|p| p.name == PROTOCOL_NAME) {
				let label = datapoint.label.as_str();
				let address = Protocol::string_field(protocol.address.as_ref(), label, "address")?
					.context(MissingAddress { label })?;
				let type_id = Protocol::string_field(protocol.typeid.as_ref(), label, "typeid")?
					.context(MissingTypeId { label })?;
				let alternate_mapping_rule = Protocol::string_field(
					protocol.alternate_mapping_rule.as_ref(),
					label,
					"alternate_mapping_rule",
				)?;
				let (common_address, ioa) = parse_address(&address)
					.context(InvalidAddress { label, address: address.as_str() })?;

				config.insert(ExchangePoint {
					label: datapoint.label.clone(),
					pivot_id: datapoint.pivot_id.clone(),
					pivot_type: datapoint.pivot_type.clone(),
					type_id,
					common_address,
					ioa,
					alternate_mapping_rule,
				});
			}
		}

		tracing::debug!("Imported {} exchanged data points", config.len());
		Ok(config)
	}

	fn insert(&mut self, point: ExchangePoint) {
		let point = Arc::new(point);
		self.by_label.insert(point.label.clone(), Arc::clone(&point));
		self.by_address.insert(point.address_key(), Arc::clone(&point));
		self.by_pivot_id.insert(point.pivot_id.clone(), point);
	}

	#[must_use]
	pub fn by_label(&self, label: &str) -> Option<&ExchangePoint> {
		self.by_label.get(label).map(AsRef::as_ref)
	}

	#[must_use]
	pub fn by_address(&self, common_address: i64, ioa: i64) -> Option<&ExchangePoint> {
		self.by_address_key(&address_key(common_address, ioa))
	}

	#[must_use]
	pub fn by_address_key(&self, key: &str) -> Option<&ExchangePoint> {
		self.by_address.get(key).map(AsRef::as_ref)
	}

	#[must_use]
	pub fn by_pivot_id(&self, pivot_id: &str) -> Option<&ExchangePoint> {
		self.by_pivot_id.get(pivot_id).map(AsRef::as_ref)
	}

	/// Number of labels in the index.
	#[must_use]
	pub fn len(&self) -> usize {
		self.by_label.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.by_label.is_empty()
	}
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum ConfigError {
	#[snafu(display("Invalid exchanged data document: {source}"))]
	InvalidDocument {
		source: serde_json::Error,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Exchanged data '{label}' has an iec104 protocol without address"))]
	MissingAddress {
		label: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Exchanged data '{label}' has an iec104 protocol without typeid"))]
	MissingTypeId {
		label: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Exchanged data '{label}' has an iec104 {field} that is not a string"))]
	InvalidProtocolField {
		label: String,
		field: &'static str,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},

	#[snafu(display("Exchanged data '{label}' has an invalid address '{address}', expected 'CA-IOA'"))]
	InvalidAddress {
		label: String,
		address: String,
		#[snafu(implicit)]
		context: Box<SpanTraceWrapper>,
	},
}

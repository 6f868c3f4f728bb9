//! OAI-MARC codec.
//!
//! OAI-MARC is the older XML vocabulary served by some OAI-PMH endpoints:
//!
//! ```text
//! <oai_marc>
//!   <fixfield id="LDR">00000nam a2200000   4500</fixfield>
//!   <fixfield id="001">000000001</fixfield>
//!   <varfield id="245" i1="1" i2="0">
//!     <subfield label="a">Title</subfield>
//!   </varfield>
//! </oai_marc>
//! ```
//!
//! The `oai_marc` element may be nested anywhere in the input document, for
//! instance inside an OAI-PMH `GetRecord` response; the first one is decoded.

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::marcxml::{strip_namespaces, XML_DECLARATION};
use crate::record::{Field, Record, LEADER_TAG};
use quick_xml::de::from_str as xml_from_str;
use quick_xml::se::to_string as xml_to_string;
use serde::{Deserialize, Serialize};

const ROOT_OPEN: &str = "<oai_marc";
const ROOT_CLOSE: &str = "</oai_marc>";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "oai_marc")]
struct OaiMarc {
    #[serde(default)]
    fixfield: Vec<FixField>,
    #[serde(default)]
    varfield: Vec<VarField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FixField {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VarField {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@i1", default)]
    i1: String,
    #[serde(rename = "@i2", default)]
    i2: String,
    #[serde(default)]
    subfield: Vec<OaiSubfield>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OaiSubfield {
    #[serde(rename = "@label")]
    label: String,
    #[serde(rename = "$value", default)]
    value: String,
}

/// Cut the first `<oai_marc>` element out of a larger document.
fn oai_marc_element(xml: &str) -> Result<&str> {
    let start = xml
        .match_indices(ROOT_OPEN)
        .map(|(pos, _)| pos)
        .find(|&pos| {
            matches!(
                xml.as_bytes().get(pos + ROOT_OPEN.len()),
                Some(b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/')
            )
        })
        .ok_or_else(|| MarcError::ParseError("No oai_marc element found".to_string()))?;
    let rest = &xml[start..];
    let end = rest
        .find(ROOT_CLOSE)
        .map_or(rest.len(), |pos| pos + ROOT_CLOSE.len());
    Ok(&rest[..end])
}

/// Parse an OAI-MARC record.
///
/// A `fixfield` with id `LDR` becomes the leader; other fixfields become
/// control fields and varfields become data fields, all in document order.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if there is no `oai_marc` element or the
/// XML is malformed, and [`MarcError::InvalidField`] if a subfield has no
/// label.
pub fn oai_marcxml_to_record(xml: &str) -> Result<Record> {
    let cleaned = strip_namespaces(xml);
    let oai: OaiMarc = xml_from_str(oai_marc_element(&cleaned)?)
        .map_err(|e| MarcError::ParseError(format!("Failed to parse OAI-MARC: {e}")))?;

    let mut record = Record::default();
    for fix in oai.fixfield {
        if fix.id == LEADER_TAG {
            record.leader = Leader::new(fix.value);
        } else {
            record.add_control_field(fix.id, fix.value);
        }
    }

    for var in oai.varfield {
        let i1 = var.i1.chars().next().unwrap_or(' ');
        let i2 = var.i2.chars().next().unwrap_or(' ');
        let mut field = Field::new(var.id, i1, i2);
        for sf in var.subfield {
            let code = sf.label.chars().next().ok_or_else(|| {
                MarcError::InvalidField(format!("Missing subfield label in {}", field.tag))
            })?;
            field.add_subfield(code, sf.value);
        }
        record.add_field(field);
    }

    Ok(record)
}

/// Serialize a record as an OAI-MARC document.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if serialization fails.
pub fn record_to_oai_marcxml(record: &Record) -> Result<String> {
    let leader = FixField {
        id: LEADER_TAG.to_string(),
        value: record.leader.as_str().to_string(),
    };
    let oai = OaiMarc {
        fixfield: std::iter::once(leader)
            .chain(record.control_fields.iter().map(|cf| FixField {
                id: cf.tag.clone(),
                value: cf.value.clone(),
            }))
            .collect(),
        varfield: record
            .fields
            .iter()
            .map(|field| VarField {
                id: field.tag.clone(),
                i1: field.indicator1.to_string(),
                i2: field.indicator2.to_string(),
                subfield: field
                    .subfields
                    .iter()
                    .map(|sf| OaiSubfield {
                        label: sf.code.to_string(),
                        value: sf.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
    };

    let body = xml_to_string(&oai)
        .map_err(|e| MarcError::ParseError(format!("Failed to serialize to OAI-MARC: {e}")))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

//! MARCXML (MARC 21 slim) codec.
//!
//! Records map onto the Library of Congress slim vocabulary: a `<record>`
//! holding one `<leader>`, any number of `<controlfield tag>` elements and any
//! number of `<datafield tag ind1 ind2>` elements with `<subfield code>`
//! children. `tag`, `ind1`, `ind2` and `code` are attributes.
//!
//! Input may use the default namespace (`<record xmlns="...">`), a prefix
//! (`<marc:record xmlns:marc="...">`) or no namespace at all.
//!
//! # Examples
//!
//! ```
//! use marcshift::{marcxml, Field, Leader, Record};
//!
//! let mut record = Record::new(Leader::default());
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield_str('a', "Title");
//! record.add_field(field);
//!
//! let xml = marcxml::record_to_marcxml(&record)?;
//! let restored = marcxml::marcxml_to_record(&xml)?;
//! assert_eq!(restored, record);
//! # Ok::<(), marcshift::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::record::{Field, Record};
use lazy_static::lazy_static;
use quick_xml::de::from_str as xml_from_str;
use quick_xml::se::to_string as xml_to_string;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The MARCXML namespace URI.
pub const MARCXML_NS: &str = "http://www.loc.gov/MARC21/slim";

pub(crate) const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "record")]
struct MarcxmlRecord {
    #[serde(default)]
    leader: Option<String>,
    #[serde(default)]
    controlfield: Vec<MarcxmlControlField>,
    #[serde(default)]
    datafield: Vec<MarcxmlDataField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarcxmlControlField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarcxmlDataField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "@ind1", default)]
    ind1: String,
    #[serde(rename = "@ind2", default)]
    ind2: String,
    #[serde(default)]
    subfield: Vec<MarcxmlSubfield>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarcxmlSubfield {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "collection")]
struct MarcxmlCollection {
    #[serde(default, rename = "record")]
    records: Vec<MarcxmlRecord>,
}

lazy_static! {
    static ref XMLNS_DECLARATION: Regex =
        Regex::new(r#"\s+xmlns(?::[\w.-]+)?\s*=\s*("[^"]*"|'[^']*')"#).expect("valid regex");
    static ref ELEMENT_PREFIX: Regex = Regex::new(r"<(/?)[\w.-]+:").expect("valid regex");
}

/// Strip namespace declarations and element prefixes.
///
/// `<marc:record xmlns:marc="...">` becomes `<record>`.
pub(crate) fn strip_namespaces(xml: &str) -> String {
    let stripped = XMLNS_DECLARATION.replace_all(xml, "");
    ELEMENT_PREFIX.replace_all(&stripped, "<$1").into_owned()
}

/// Indicators written as `_` are placeholders for a blank indicator.
fn format_indicator(indicator: char) -> String {
    if indicator == '_' {
        " ".to_string()
    } else {
        indicator.to_string()
    }
}

fn to_marcxml_record(record: &Record) -> MarcxmlRecord {
    MarcxmlRecord {
        leader: Some(record.leader.as_str().to_string()),
        controlfield: record
            .control_fields
            .iter()
            .map(|cf| MarcxmlControlField {
                tag: cf.tag.clone(),
                value: cf.value.clone(),
            })
            .collect(),
        datafield: record
            .fields
            .iter()
            .map(|field| MarcxmlDataField {
                tag: field.tag.clone(),
                ind1: format_indicator(field.indicator1),
                ind2: format_indicator(field.indicator2),
                subfield: field
                    .subfields
                    .iter()
                    .map(|sf| MarcxmlSubfield {
                        code: sf.code.to_string(),
                        value: sf.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Serialize a record as a bare `<record>` element, with no XML declaration
/// and no namespace declaration. Used inside a `<collection>`.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if serialization fails.
pub fn record_to_marcxml_element(record: &Record) -> Result<String> {
    xml_to_string(&to_marcxml_record(record))
        .map_err(|e| MarcError::ParseError(format!("Failed to serialize to MARCXML: {e}")))
}

/// Convert a record to a standalone MARCXML document.
///
/// The output starts with an XML declaration and the root `<record>` carries
/// `xmlns="http://www.loc.gov/MARC21/slim"`.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if serialization fails.
pub fn record_to_marcxml(record: &Record) -> Result<String> {
    let body = record_to_marcxml_element(record)?;
    let body = body.replacen("<record>", &format!("<record xmlns=\"{MARCXML_NS}\">"), 1);
    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Parse one MARCXML `<record>` document.
///
/// # Errors
///
/// Returns [`MarcError::ParseError`] if the XML is malformed,
/// [`MarcError::InvalidLeader`] if `<leader>` is present but empty and
/// [`MarcError::InvalidField`] if a subfield has no code.
pub fn marcxml_to_record(xml: &str) -> Result<Record> {
    let cleaned = strip_namespaces(xml);
    let xml_record: MarcxmlRecord = xml_from_str(&cleaned)
        .map_err(|e| MarcError::ParseError(format!("Failed to parse MARCXML: {e}")))?;
    from_marcxml_record(xml_record)
}

/// Parse a MARCXML `<collection>` into its records, in document order.
///
/// # Errors
///
/// Fails on the first record that [`marcxml_to_record`] would reject.
pub fn marcxml_to_records(xml: &str) -> Result<Vec<Record>> {
    let cleaned = strip_namespaces(xml);
    let collection: MarcxmlCollection = xml_from_str(&cleaned)
        .map_err(|e| MarcError::ParseError(format!("Failed to parse MARCXML collection: {e}")))?;

    collection
        .records
        .into_iter()
        .map(from_marcxml_record)
        .collect()
}

fn from_marcxml_record(xml_record: MarcxmlRecord) -> Result<Record> {
    let leader = match xml_record.leader {
        None => Leader::default(),
        Some(leader) if leader.is_empty() => {
            return Err(MarcError::InvalidLeader("Record has an empty leader".to_string()));
        },
        Some(leader) => Leader::new(leader),
    };
    let mut record = Record::new(leader);

    for cf in xml_record.controlfield {
        record.add_control_field(cf.tag, cf.value);
    }

    for df in xml_record.datafield {
        let ind1 = df.ind1.chars().next().unwrap_or(' ');
        let ind2 = df.ind2.chars().next().unwrap_or(' ');
        let mut field = Field::new(df.tag, ind1, ind2);

        for sf in df.subfield {
            let code = sf.code.chars().next().ok_or_else(|| {
                MarcError::InvalidField(format!("Missing subfield code in {}", field.tag))
            })?;
            field.add_subfield(code, sf.value);
        }

        record.add_field(field);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        Record::builder(Leader::new("01142cam  2200301 a 4500"))
            .control_field_str("001", "12345")
            .field(
                Field::builder("245".to_string(), '1', '0')
                    .subfield_str('a', "Test title")
                    .subfield_str('c', "Author & co")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_record_to_marcxml_output_format() {
        let xml = record_to_marcxml(&sample_record()).unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(&format!("<record xmlns=\"{MARCXML_NS}\">")));
        assert!(xml.contains("<leader>01142cam  2200301 a 4500</leader>"));
        assert!(xml.contains("<controlfield tag=\"001\">12345</controlfield>"));
        assert!(xml.contains("<datafield tag=\"245\" ind1=\"1\" ind2=\"0\">"));
        assert!(xml.contains("<subfield code=\"a\">Test title</subfield>"));
        assert!(xml.contains("Author &amp; co"));
    }

    #[test]
    fn test_marcxml_roundtrip() {
        let record = sample_record();
        let restored = marcxml_to_record(&record_to_marcxml(&record).unwrap()).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_underscore_indicator_written_as_blank() {
        let record = Record::builder(Leader::default())
            .field(Field::builder("650".to_string(), '_', '0').subfield_str('a', "x").build())
            .build();
        let xml = record_to_marcxml(&record).unwrap();
        assert!(xml.contains("<datafield tag=\"650\" ind1=\" \" ind2=\"0\">"));
    }

    #[test]
    fn test_parse_no_namespace() {
        let xml = r#"<record>
            <leader>01234nam a2200289 a 4500</leader>
            <controlfield tag="001">12345</controlfield>
            <datafield tag="245" ind1="1" ind2="0">
                <subfield code="a">Test title</subfield>
            </datafield>
        </record>"#;

        let record = marcxml_to_record(xml).unwrap();
        assert_eq!(record.leader.as_str(), "01234nam a2200289 a 4500");
        assert_eq!(record.get_control_field("001"), Some("12345"));
        assert_eq!(record.get_field("245").unwrap().get_subfield('a'), Some("Test title"));
    }

    #[test]
    fn test_parse_prefixed_namespace() {
        let xml = r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:leader>01234nam a2200289 a 4500</marc:leader>
            <marc:controlfield tag="001">88888</marc:controlfield>
            <marc:datafield tag="245" ind1="1" ind2="0">
                <marc:subfield code="a">Prefixed title</marc:subfield>
            </marc:datafield>
        </marc:record>"#;

        let record = marcxml_to_record(xml).unwrap();
        assert_eq!(record.get_control_field("001"), Some("88888"));
        assert_eq!(
            record.get_field("245").unwrap().get_subfield('a'),
            Some("Prefixed title")
        );
    }

    #[test]
    fn test_parse_collection() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:record>
                <marc:leader>01234nam a2200289 a 4500</marc:leader>
                <marc:controlfield tag="001">rec1</marc:controlfield>
            </marc:record>
            <marc:record>
                <marc:leader>01234nam a2200289 a 4500</marc:leader>
                <marc:controlfield tag="001">rec2</marc:controlfield>
            </marc:record>
        </marc:collection>"#;

        let records = marcxml_to_records(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_control_field("001"), Some("rec1"));
        assert_eq!(records[1].get_control_field("001"), Some("rec2"));
    }

    #[test]
    fn test_repeated_tags_keep_order() {
        let mut record = Record::new(Leader::default());
        for i in 1..=3 {
            record.add_field(
                Field::builder("650".to_string(), ' ', '0')
                    .subfield('a', format!("Subject {i}"))
                    .build(),
            );
        }
        let restored = marcxml_to_record(&record_to_marcxml(&record).unwrap()).unwrap();
        let subjects: Vec<_> = restored
            .get_fields("650")
            .filter_map(|f| f.get_subfield('a'))
            .collect();
        assert_eq!(subjects, vec!["Subject 1", "Subject 2", "Subject 3"]);
    }

    #[test]
    fn test_missing_leader_defaults() {
        let record = marcxml_to_record(r#"<record><controlfield tag="001">1</controlfield></record>"#)
            .unwrap();
        assert_eq!(record.leader, Leader::default());
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            marcxml_to_record("<record><leader>"),
            Err(MarcError::ParseError(_))
        ));
    }

    #[test]
    fn test_strip_namespaces() {
        assert_eq!(
            strip_namespaces(r#"<marc:record xmlns:marc="urn:x"><marc:leader/></marc:record>"#),
            "<record><leader/></record>"
        );
    }
}

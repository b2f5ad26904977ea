use log::debug;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::error::{NportError, Result};

const SECURITIES_TAG: &str = "invstOrSecs";
const SECURITY_TAG: &str = "invstOrSec";

/// One entry of the `invstOrSecs` schedule of an NPORT-P filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub index: usize,
    pub title: String,
    pub cusip: String,
    pub units: f64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Parses a `primary_doc.xml` into holdings in document order.
///
/// Fails if the document is not XML, has no `invstOrSecs` element, or a
/// security lacks one of the required fields.
pub fn extract_holdings(content: &[u8]) -> Result<Vec<HoldingRecord>> {
    let text = std::str::from_utf8(content)
        .map_err(|e| NportError::DocumentParse(format!("document is not UTF-8: {}", e)))?;
    let xml_tree = roxmltree::Document::parse(text)?;

    let securities = xml_tree
        .root_element()
        .descendants()
        .find(|n| n.has_tag_name(SECURITIES_TAG))
        .ok_or_else(|| NportError::DocumentParse(format!("missing <{}> element", SECURITIES_TAG)))?;

    let holdings = securities
        .children()
        .filter(|n| n.has_tag_name(SECURITY_TAG))
        .enumerate()
        .map(|(index, security)| parse_security(index, security))
        .collect::<Result<Vec<_>>>()?;

    debug!("Extracted {} holdings", holdings.len());
    Ok(holdings)
}

fn parse_security(index: usize, security: Node) -> Result<HoldingRecord> {
    Ok(HoldingRecord {
        index,
        title: field_text(index, security, "title")?.to_string(),
        cusip: field_text(index, security, "cusip")?.to_string(),
        units: field_number(index, security, "balance")?,
        value: field_number(index, security, "valUSD")?,
        currency: currency_code(security),
    })
}

fn find_field<'a, 'input>(security: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    security.descendants().find(|n| n.has_tag_name(name))
}

fn field_text<'a>(index: usize, security: Node<'a, '_>, name: &str) -> Result<&'a str> {
    find_field(security, name)
        .map(|n| n.text().unwrap_or("").trim())
        .ok_or_else(|| NportError::DocumentParse(format!("holding {} has no <{}>", index, name)))
}

fn field_number(index: usize, security: Node, name: &str) -> Result<f64> {
    let raw = field_text(index, security, name)?;
    raw.parse::<f64>().map_err(|_| {
        NportError::DocumentParse(format!(
            "holding {} has non-numeric <{}>: {:?}",
            index, name, raw
        ))
    })
}

// Non-USD positions carry the code either as a <curCd> element or as an
// attribute of <currencyConditional>.
fn currency_code(security: Node) -> Option<String> {
    find_field(security, "curCd")
        .and_then(|n| n.text())
        .or_else(|| find_field(security, "currencyConditional").and_then(|n| n.attribute("curCd")))
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

use anyhow::Result;
use yuntongxun_api::{AttrMap, Signature};

use crate::xml_output;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

pub fn print_response(response: &AttrMap, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Xml => println!("{}", xml_output::response_to_xml(response)?),
    }
    Ok(())
}

pub fn print_signature(signature: &Signature, format: &OutputFormat) -> Result<()> {
    let mut map = AttrMap::new();
    map.insert("authorization", signature.auth_header.as_str());
    map.insert("sig", signature.signature.as_str());
    map.insert("timestamp", signature.timestamp.as_str());
    print_response(&map, format)
}

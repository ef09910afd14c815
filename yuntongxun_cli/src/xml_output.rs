use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use yuntongxun_api::{AttrMap, Value};

/// Recursively write a response value as XML elements.
///
/// Sequences are written as repeated sibling elements named after their key,
/// which is the shape the platform itself uses for repeated records.
fn write_value<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &Value,
) -> Result<(), quick_xml::Error> {
    match value {
        Value::Null => {
            // Omit null fields entirely
        }
        Value::Bool(b) => write_text(writer, tag, if *b { "true" } else { "false" })?,
        Value::Number(n) => write_text(writer, tag, &n.to_string())?,
        Value::String(s) => write_text(writer, tag, s)?,
        Value::List(_) | Value::Tuple(_) => {
            for item in value.as_list().unwrap_or_default() {
                write_value(writer, tag, item)?;
            }
        }
        Value::Map(map) => {
            if map.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new(tag)))?;
            } else {
                writer.write_event(Event::Start(BytesStart::new(tag)))?;
                for (key, val) in map {
                    write_value(writer, key, val)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
        }
    }
    Ok(())
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Serialize a response mapping as an XML document rooted at `<Response>`.
pub fn response_to_xml(response: &AttrMap) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_value(&mut writer, "Response", &Value::Map(response.clone()))?;

    let buf = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

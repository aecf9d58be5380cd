//! S3 XML deserialization: parsing S3 response bodies into Rust types.
//!
//! Text is read without trimming: object keys may legitimately start or end
//! with whitespace, and entity references arrive as separate reader events.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::error::XmlError;
use crate::types::{CommonPrefix, ErrorDocument, ListBucketResult, ObjectEntry};

/// Trait for deserializing S3 types from XML.
///
/// The root element has already been consumed by the caller; the implementation
/// reads child elements until the matching end tag.
pub trait S3Deserialize: Sized {
    /// Local name of the document root this type is parsed from.
    const ROOT: &'static str;

    /// Deserialize an instance from the given XML reader.
    ///
    /// The reader is positioned just after the opening tag of this element.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or a value fails to parse.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize an S3 XML document into a typed value.
///
/// Finds the root element, checks it against [`S3Deserialize::ROOT`] and
/// delegates to the type's implementation.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed, the root element is missing or
/// of the wrong name, or deserialization fails.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                let name = utf8(local.as_ref())?;
                if name != T::ROOT {
                    return Err(XmlError::UnexpectedElement(name.to_owned()));
                }
                return T::deserialize_xml(&mut reader);
            }
            Event::Empty(e) => {
                let local = e.local_name();
                let name = utf8(local.as_ref())?;
                if name != T::ROOT {
                    return Err(XmlError::UnexpectedElement(name.to_owned()));
                }
                return Err(XmlError::MissingElement(format!("children of {name}")));
            }
            Event::Eof => {
                return Err(XmlError::MissingElement(T::ROOT.to_owned()));
            }
            // Skip declaration, comments, processing instructions, whitespace.
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions for reading common XML patterns
// ---------------------------------------------------------------------------

fn utf8(bytes: &[u8]) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|e| XmlError::ParseError(e.to_string()))
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                {
                    text.push(ch);
                } else {
                    let name = e
                        .decode()
                        .map_err(|err| XmlError::ParseError(err.to_string()))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                        .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{name};")))?;
                    text.push_str(resolved);
                }
            }
            Event::CData(e) => text.push_str(utf8(&e)?),
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Loop over the children of the current element, handing each start tag's
/// local name to `on_child`. Self-closing children are passed with `empty = true`
/// and must not be read from. Returns once the parent's end tag is consumed.
fn for_each_child<F>(reader: &mut Reader<&[u8]>, context: &str, mut on_child: F) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&[u8]>, &str, bool) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                let name = utf8(local.as_ref())?.to_owned();
                on_child(reader, &name, false)?;
            }
            Event::Empty(e) => {
                let local = e.local_name();
                let name = utf8(local.as_ref())?.to_owned();
                on_child(reader, &name, true)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

fn read_text_or_empty(reader: &mut Reader<&[u8]>, empty: bool) -> Result<String, XmlError> {
    if empty {
        Ok(String::new())
    } else {
        read_text_content(reader)
    }
}

/// Parse a boolean from XML text ("true"/"false").
fn parse_bool(s: &str) -> Result<bool, XmlError> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XmlError::ParseError(format!("invalid boolean: {s}"))),
    }
}

fn parse_u64(s: &str) -> Result<u64, XmlError> {
    s.trim()
        .parse::<u64>()
        .map_err(|e| XmlError::ParseError(format!("invalid u64 '{s}': {e}")))
}

fn parse_u32(s: &str) -> Result<u32, XmlError> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| XmlError::ParseError(format!("invalid u32 '{s}': {e}")))
}

/// Parse an ISO 8601 timestamp from XML text.
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, XmlError> {
    let s = s.trim();
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            // S3 format: 2006-02-03T16:45:09.000Z
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| XmlError::ParseError(format!("invalid timestamp '{s}': {e}")))
}

// ---------------------------------------------------------------------------
// S3Deserialize implementations
// ---------------------------------------------------------------------------

impl S3Deserialize for ListBucketResult {
    const ROOT: &'static str = "ListBucketResult";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut result = ListBucketResult::default();

        for_each_child(reader, "ListBucketResult", |reader, name, empty| {
            match name {
                "Name" => result.name = read_text_or_empty(reader, empty)?,
                "Prefix" => result.prefix = read_text_or_empty(reader, empty)?,
                "Marker" => result.marker = read_text_or_empty(reader, empty)?,
                "Delimiter" => result.delimiter = Some(read_text_or_empty(reader, empty)?),
                "NextMarker" => result.next_marker = Some(read_text_or_empty(reader, empty)?),
                "MaxKeys" => {
                    result.max_keys = Some(parse_u32(&read_text_or_empty(reader, empty)?)?);
                }
                "IsTruncated" => {
                    result.is_truncated = parse_bool(&read_text_or_empty(reader, empty)?)?;
                }
                "Contents" if !empty => result.contents.push(read_object_entry(reader)?),
                "CommonPrefixes" if !empty => {
                    result.common_prefixes.push(read_common_prefix(reader)?);
                }
                _ if empty => {}
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;

        debug!(
            bucket = %result.name,
            prefix = %result.prefix,
            contents = result.contents.len(),
            common_prefixes = result.common_prefixes.len(),
            truncated = result.is_truncated,
            "Parsed bucket listing"
        );
        Ok(result)
    }
}

fn read_object_entry(reader: &mut Reader<&[u8]>) -> Result<ObjectEntry, XmlError> {
    let mut entry = ObjectEntry::default();
    let mut has_key = false;

    for_each_child(reader, "Contents", |reader, name, empty| {
        match name {
            "Key" => {
                entry.key = read_text_or_empty(reader, empty)?;
                has_key = true;
            }
            "Size" => entry.size = parse_u64(&read_text_or_empty(reader, empty)?)?,
            "ETag" => entry.etag = Some(read_text_or_empty(reader, empty)?),
            "LastModified" => {
                let text = read_text_or_empty(reader, empty)?;
                entry.last_modified = match parse_timestamp(&text) {
                    Ok(ts) => Some(ts),
                    Err(e) => {
                        debug!(error = %e, "Ignoring unparseable LastModified");
                        None
                    }
                };
            }
            _ if empty => {}
            _ => skip_element(reader)?,
        }
        Ok(())
    })?;

    if !has_key {
        return Err(XmlError::MissingElement("Contents/Key".to_owned()));
    }
    Ok(entry)
}

fn read_common_prefix(reader: &mut Reader<&[u8]>) -> Result<CommonPrefix, XmlError> {
    let mut prefix = None;
    for_each_child(reader, "CommonPrefixes", |reader, name, empty| {
        match name {
            "Prefix" => prefix = Some(read_text_or_empty(reader, empty)?),
            _ if empty => {}
            _ => skip_element(reader)?,
        }
        Ok(())
    })?;

    prefix
        .map(|prefix| CommonPrefix { prefix })
        .ok_or_else(|| XmlError::MissingElement("CommonPrefixes/Prefix".to_owned()))
}

impl S3Deserialize for ErrorDocument {
    const ROOT: &'static str = "Error";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut doc = ErrorDocument::default();
        for_each_child(reader, "Error", |reader, name, empty| {
            match name {
                "Code" => doc.code = Some(read_text_or_empty(reader, empty)?),
                "Message" => doc.message = Some(read_text_or_empty(reader, empty)?),
                "Resource" => doc.resource = Some(read_text_or_empty(reader, empty)?),
                "RequestId" => doc.request_id = Some(read_text_or_empty(reader, empty)?),
                _ if empty => {}
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(doc)
    }
}

//! XML index documents carried in result packages.
//!
//! Every reader and writer takes an [`XmlContext`]. Readers match elements on
//! their local name, so documents with or without a namespace parse alike.

use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_matrix::PresenceMap;
use rad_stats::StatisticsSummary;

/// Root element of the sites presence document.
pub const SITES_PRESENT_ROOT: &str = "sitesPresent";
/// Root element of the layers presence document.
pub const LAYERS_PRESENT_ROOT: &str = "layersPresent";

const STAT_SITES_COVARIANCE: &str = "Sites-CompositionCovariance";
const STAT_SPECIES_COVARIANCE: &str = "Species-RangesCovariance";
const STAT_ADDITIVE_BETA: &str = "LAdditiveBeta";
const STAT_LEGENDRE_BETA: &str = "LegendreBeta";
const STAT_WHITTAKER_BETA: &str = "WhittakersBeta";

fn write_error(code: &str, err: impl ToString) -> RadError {
    RadError::Io(ErrorInfo::new(code, err.to_string()))
}

fn read_error(document: &str, err: impl ToString) -> RadError {
    RadError::Serde(ErrorInfo::new(codes::XML_READ, err.to_string()).with_context("document", document))
}

/// Serialization settings shared by all XML documents of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlContext {
    namespace: Option<String>,
}

impl XmlContext {
    /// Context writing un-namespaced documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context writing documents in the default namespace `uri`.
    pub fn with_namespace(uri: impl Into<String>) -> Self {
        Self {
            namespace: Some(uri.into()),
        }
    }

    /// Default namespace written on root elements.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn document<F>(&self, root: &str, code: &str, body: F) -> Result<Vec<u8>, RadError>
    where
        F: FnOnce(&mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error>,
    {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let mut start = BytesStart::new(root);
        if let Some(uri) = &self.namespace {
            start.push_attribute(("xmlns", uri.as_str()));
        }
        write_document(&mut writer, start, body).map_err(|err| write_error(code, err))?;
        Ok(writer.into_inner())
    }

    /// Writes a presence map as `<root><item id=".." value="True"/>..</root>`.
    pub fn write_presence(&self, root: &str, item: &str, map: &PresenceMap) -> Result<Vec<u8>, RadError> {
        self.document(root, codes::INDICES_WRITE, |writer| {
            for (idx, kept) in map.iter() {
                let mut el = BytesStart::new(item);
                el.push_attribute(("id", idx.to_string().as_str()));
                el.push_attribute(("value", if kept { "True" } else { "False" }));
                writer.write_event(Event::Empty(el))?;
            }
            Ok(())
        })
    }

    /// Reads a presence map written by [`XmlContext::write_presence`].
    pub fn read_presence(&self, item: &str, bytes: &[u8]) -> Result<PresenceMap, RadError> {
        let mut map = PresenceMap::default();
        for attrs in self.elements(item, bytes)? {
            let idx = required(&attrs, "id", item)?;
            let value = required(&attrs, "value", item)?;
            let idx: usize = idx.parse().map_err(|err| read_error(item, err))?;
            map.insert(idx, parse_flag(value).ok_or_else(|| read_error(item, format!("bad flag {value}")))?);
        }
        Ok(map)
    }

    /// Writes the layer index: matrix column to package member name.
    pub fn write_layer_index(&self, index: &BTreeMap<usize, String>) -> Result<Vec<u8>, RadError> {
        self.document("layers", codes::INDICES_WRITE, |writer| {
            for (idx, filename) in index {
                writer.write_event(Event::Start(BytesStart::new("layer")))?;
                let mut idx_el = BytesStart::new("index");
                idx_el.push_attribute(("value", idx.to_string().as_str()));
                writer.write_event(Event::Empty(idx_el))?;
                let mut name_el = BytesStart::new("filename");
                name_el.push_attribute(("value", filename.as_str()));
                writer.write_event(Event::Empty(name_el))?;
                writer.write_event(Event::End(BytesEnd::new("layer")))?;
            }
            Ok(())
        })
    }

    /// Reads a layer index written by [`XmlContext::write_layer_index`].
    pub fn read_layer_index(&self, bytes: &[u8]) -> Result<BTreeMap<usize, String>, RadError> {
        let mut index = BTreeMap::new();
        let mut pending: Option<usize> = None;
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(el)) | Ok(Event::Empty(el)) => {
                    let attrs = attributes(&el, "layerIndex")?;
                    match el.local_name().as_ref() {
                        b"layer" => pending = None,
                        b"index" => {
                            let value = required(&attrs, "value", "index")?;
                            pending = Some(value.parse().map_err(|err| read_error("layerIndex", err))?);
                        }
                        b"filename" => {
                            let value = required(&attrs, "value", "filename")?;
                            let idx = pending
                                .take()
                                .ok_or_else(|| read_error("layerIndex", "filename before index"))?;
                            index.insert(idx, value.to_string());
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(read_error("layerIndex", err)),
            }
            buf.clear();
        }
        Ok(index)
    }

    /// Writes the scalar statistics document.
    pub fn write_statistics(&self, summary: &StatisticsSummary) -> Result<Vec<u8>, RadError> {
        self.document("statistics", codes::MATRIX_WRITE, |writer| {
            if summary.schluter_sites.is_some() || summary.schluter_species.is_some() {
                writer.write_event(Event::Start(BytesStart::new("Schluter")))?;
                if let Some(value) = summary.schluter_sites {
                    write_value(writer, STAT_SITES_COVARIANCE, value)?;
                }
                if let Some(value) = summary.schluter_species {
                    write_value(writer, STAT_SPECIES_COVARIANCE, value)?;
                }
                writer.write_event(Event::End(BytesEnd::new("Schluter")))?;
            }
            writer.write_event(Event::Start(BytesStart::new("diversity")))?;
            write_value(writer, STAT_ADDITIVE_BETA, summary.lande_beta)?;
            write_value(writer, STAT_LEGENDRE_BETA, summary.legendre_beta)?;
            write_value(writer, STAT_WHITTAKER_BETA, summary.whittaker_beta)?;
            writer.write_event(Event::End(BytesEnd::new("diversity")))?;
            Ok(())
        })
    }

    /// Reads the scalar statistics document.
    pub fn read_statistics(&self, bytes: &[u8]) -> Result<StatisticsSummary, RadError> {
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(el)) | Ok(Event::Empty(el)) => {
                    let attrs = attributes(&el, "statistics")?;
                    if let Some(value) = attrs.get("value") {
                        let name = String::from_utf8_lossy(el.local_name().as_ref()).into_owned();
                        let parsed: f64 = value.parse().map_err(|err| read_error("statistics", err))?;
                        values.insert(name, parsed);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(read_error("statistics", err)),
            }
            buf.clear();
        }
        let scalar = |name: &str| {
            values
                .get(name)
                .copied()
                .ok_or_else(|| read_error("statistics", format!("missing {name}")))
        };
        Ok(StatisticsSummary {
            whittaker_beta: scalar(STAT_WHITTAKER_BETA)?,
            lande_beta: scalar(STAT_ADDITIVE_BETA)?,
            legendre_beta: scalar(STAT_LEGENDRE_BETA)?,
            schluter_sites: values.get(STAT_SITES_COVARIANCE).copied(),
            schluter_species: values.get(STAT_SPECIES_COVARIANCE).copied(),
        })
    }

    /// Attribute maps of every element named `item`, in document order.
    fn elements(&self, item: &str, bytes: &[u8]) -> Result<Vec<BTreeMap<String, String>>, RadError> {
        let mut out = Vec::new();
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(el)) | Ok(Event::Empty(el)) => {
                    if el.local_name().as_ref() == item.as_bytes() {
                        out.push(attributes(&el, item)?);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(read_error(item, err)),
            }
            buf.clear();
        }
        Ok(out)
    }
}

fn write_document<F>(writer: &mut Writer<Vec<u8>>, root: BytesStart<'_>, body: F) -> Result<(), quick_xml::Error>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error>,
{
    let end = root.to_end().into_owned();
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(root))?;
    body(writer)?;
    writer.write_event(Event::End(end))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: f64) -> Result<(), quick_xml::Error> {
    let mut el = BytesStart::new(name);
    el.push_attribute(("value", value.to_string().as_str()));
    writer.write_event(Event::Empty(el))
}

fn attributes(el: &BytesStart<'_>, document: &str) -> Result<BTreeMap<String, String>, RadError> {
    let mut attrs = BTreeMap::new();
    for attr in el.attributes() {
        let attr = attr.map_err(|err| read_error(document, err))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| read_error(document, err))?;
        attrs.insert(key, value.into_owned());
    }
    Ok(attrs)
}

fn required<'a>(attrs: &'a BTreeMap<String, String>, key: &str, element: &str) -> Result<&'a str, RadError> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| read_error(element, format!("missing attribute {key}")))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "1" => Some(true),
        "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

use crate::error::GatewayError;

// Element text when the element also has attributes or children.
pub const TEXT_KEY: &str = "_";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum XmlNode {
    Scalar(String),
    Map(BTreeMap<String, XmlNode>),
    List(Vec<XmlNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XmlDocument {
    pub root: String,
    pub body: XmlNode,
}

impl XmlNode {
    pub fn get(&self, key: &str) -> Option<&XmlNode> {
        match self {
            XmlNode::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Vec<&XmlNode> {
        match self {
            XmlNode::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            XmlNode::Scalar(text) => Some(text.as_str()),
            XmlNode::Map(map) => map.get(TEXT_KEY).and_then(XmlNode::as_scalar),
            XmlNode::List(items) => items.first().and_then(XmlNode::as_scalar),
        }
    }

    pub fn children(&self, key: &str) -> Vec<&XmlNode> {
        self.get(key).map(XmlNode::as_array).unwrap_or_default()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(XmlNode::as_scalar)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn value_of(&self, key: &str) -> Option<&str> {
        let node = self.get(key)?.as_array().into_iter().next()?;
        let raw = match node {
            XmlNode::Map(map) => map
                .get("value")
                .or_else(|| map.get(TEXT_KEY))
                .and_then(XmlNode::as_scalar),
            other => other.as_scalar(),
        };
        raw.map(str::trim).filter(|value| !value.is_empty())
    }
}

struct ElementBuilder {
    name: String,
    entries: BTreeMap<String, XmlNode>,
    has_entries: bool,
    text: String,
}

impl ElementBuilder {
    fn open(start: &BytesStart<'_>) -> Result<Self, GatewayError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut builder = Self {
            name,
            entries: BTreeMap::new(),
            has_entries: false,
            text: String::new(),
        };
        for attr in start.attributes() {
            let attr = attr.map_err(|err| GatewayError::ParseError(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|value| value.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            builder.insert(key, XmlNode::Scalar(value));
        }
        Ok(builder)
    }

    fn insert(&mut self, key: String, node: XmlNode) {
        self.has_entries = true;
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(node);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                XmlNode::List(items) => items.push(node),
                existing => {
                    let first = std::mem::replace(existing, XmlNode::List(Vec::new()));
                    *existing = XmlNode::List(vec![first, node]);
                }
            },
        }
    }

    fn finish(mut self) -> (String, XmlNode) {
        if !self.has_entries {
            return (self.name, XmlNode::Scalar(self.text));
        }
        if !self.text.trim().is_empty() {
            let text = std::mem::take(&mut self.text);
            self.insert(TEXT_KEY.to_string(), XmlNode::Scalar(text));
        }
        (self.name, XmlNode::Map(self.entries))
    }
}

pub fn parse_document(xml: &str) -> Result<XmlDocument, GatewayError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<ElementBuilder> = Vec::new();
    let mut document = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| GatewayError::ParseError(err.to_string()))?;
        match event {
            Event::Start(start) => stack.push(ElementBuilder::open(&start)?),
            Event::Empty(start) => {
                let (name, node) = ElementBuilder::open(&start)?.finish();
                attach(&mut stack, &mut document, name, node);
            }
            Event::End(_) => {
                let builder = stack.pop().ok_or_else(|| {
                    GatewayError::ParseError("unexpected closing tag".to_string())
                })?;
                let (name, node) = builder.finish();
                attach(&mut stack, &mut document, name, node);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map(|value| value.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    current.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(GatewayError::ParseError(
            "unexpected end of document".to_string(),
        ));
    }
    document.ok_or_else(|| GatewayError::ParseError("document has no root element".to_string()))
}

fn attach(
    stack: &mut [ElementBuilder],
    document: &mut Option<XmlDocument>,
    name: String,
    node: XmlNode,
) {
    match stack.last_mut() {
        Some(parent) => parent.insert(name, node),
        None => {
            if document.is_none() {
                *document = Some(XmlDocument { root: name, body: node });
            }
        }
    }
}

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use crate::error::GradebookError;

// An element being assembled while its children are still being read.
struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart) -> Result<Self, GradebookError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            fields.insert(format!("@{key}"), Value::String(value));
        }
        Ok(Element { name, fields, text: String::new() })
    }

    // A repeated child name turns the field into an array; a single child stays a bare value.
    fn push_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn close(mut self) -> (String, Value) {
        let value = if self.fields.is_empty() {
            if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            }
        } else {
            if !self.text.is_empty() {
                self.fields.insert("#text".to_string(), Value::String(self.text));
            }
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

// Decodes an XML document into the attribute-centric mapping the normalizer consumes:
// attributes become `@Name` keys, child elements become keys holding an object (one child)
// or an array (several), text-only elements become strings and empty ones `null`.
pub fn decode(xml: &str) -> Result<Value, GradebookError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Element::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => parent.push_child(name, value),
                    None => return Ok(root(name, value)),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| GradebookError::Format("unbalanced closing tag".to_string()))?;
                let (name, value) = element.close();
                match stack.last_mut() {
                    Some(parent) => parent.push_child(name, value),
                    None => return Ok(root(name, value)),
                }
            }
            Event::Eof => {
                return Err(GradebookError::Format(if stack.is_empty() {
                    "empty document".to_string()
                } else {
                    "unexpected end of document".to_string()
                }));
            }
            _ => {}
        }
    }
}

fn root(name: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name, value);
    Value::Object(map)
}

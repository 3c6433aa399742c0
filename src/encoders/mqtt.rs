//! Encoder for MQTT-style sensor messages.
//!
//! A message is a topic such as `sensor/temperature/room1` plus a JSON payload. The topic levels and
//! the (flattened) payload fields are merged into one record, and every field is given its own
//! region of the output vector the first time it is seen:
//! - numbers set a run of up to 20 bits proportional to `value / max_value`,
//! - strings set up to 10 bits picked by a stable hash of the string,
//! - `true` sets a single bit, `false` and `null` set nothing.
//!
//! Regions start 100 bits apart and wrap around the vector, so distinct fields may overlap once
//! more than `width / 100` fields have been seen.

use super::Encoder;
use crate::error::{HtmError, Result};
use fxhash::FxHashMap;
use serde_json::{Map, Value};

/// Bits used for the largest numeric value.
const NUMERIC_BITS: usize = 20;
/// Hash bits inspected for a string value.
const STRING_BITS: usize = 10;
/// Distance between the regions of consecutive new fields.
const FIELD_SPACING: usize = 100;
/// Array items encoded individually, after the array's length.
const MAX_ARRAY_ITEMS: usize = 3;

/// Encodes JSON records, optionally prefixed by an MQTT topic, into fixed-width binary vectors.
#[derive(Debug, Clone)]
pub struct MqttEncoder {
    encoding_width: usize,
    max_value: f64,
    field_indices: FxHashMap<String, usize>,
    next_index: usize,
}

impl MqttEncoder {
    /// Creates an encoder producing `encoding_width` bits, normalizing numbers by `max_value`.
    pub fn new(encoding_width: usize, max_value: f64) -> Result<Self> {
        if encoding_width == 0 {
            return Err(HtmError::invalid("encoding_width", "must be greater than zero"));
        }
        if max_value.is_nan() || max_value <= 0.0 {
            return Err(HtmError::invalid(
                "max_value",
                format!("must be positive, got {max_value}"),
            ));
        }
        Ok(Self {
            encoding_width,
            max_value,
            field_indices: FxHashMap::default(),
            next_index: 0,
        })
    }

    /// Splits a topic into `topic_level_<i>` fields.
    pub fn decode_topic(topic: &str) -> Map<String, Value> {
        topic
            .split('/')
            .enumerate()
            .map(|(i, part)| (format!("topic_level_{i}"), Value::String(part.to_owned())))
            .collect()
    }

    /// Encodes a complete message. The payload is parsed as JSON; anything that is not a JSON
    /// object is encoded as a single `value` field. Payload fields override topic levels.
    pub fn encode_message_with_topic(&mut self, topic: &str, payload: &str) -> Vec<bool> {
        let payload = match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => Map::from_iter([("value".to_owned(), other)]),
            Err(_) => Map::from_iter([("value".to_owned(), Value::String(payload.to_owned()))]),
        };

        let mut message = Self::decode_topic(topic);
        message.extend(payload);
        self.encode(&Value::Object(message))
    }

    /// Forgets the regions assigned to fields.
    pub fn reset(&mut self) {
        self.field_indices.clear();
        self.next_index = 0;
    }

    /// Number of distinct fields seen since construction or the last reset.
    pub fn field_count(&self) -> usize {
        self.field_indices.len()
    }

    fn base_index(&mut self, key: &str) -> usize {
        if let Some(&index) = self.field_indices.get(key) {
            return index;
        }
        let index = self.next_index % self.encoding_width;
        self.field_indices.insert(key.to_owned(), index);
        self.next_index += FIELD_SPACING;
        index
    }

    fn encode_field(&mut self, key: &str, value: &Value, encoding: &mut [bool]) {
        let base = self.base_index(key);
        let bits = match value {
            Value::Number(number) => {
                let normalized = (number.as_f64().unwrap_or(0.0) / self.max_value).min(1.0);
                // Negative values saturate to zero bits.
                let count = (normalized * NUMERIC_BITS as f64) as usize;
                (0..count).collect::<Vec<_>>()
            }
            Value::String(text) => {
                let hash = fxhash::hash64(text.as_str());
                (0..STRING_BITS).filter(|i| hash & (1 << i) != 0).collect()
            }
            Value::Bool(true) => vec![0],
            _ => return,
        };

        for offset in bits {
            encoding[(base + offset) % self.encoding_width] = true;
        }
    }
}

impl Default for MqttEncoder {
    fn default() -> Self {
        Self {
            encoding_width: 2048,
            max_value: 1000.0,
            field_indices: FxHashMap::default(),
            next_index: 0,
        }
    }
}

impl Encoder<Value> for MqttEncoder {
    fn width(&self) -> usize {
        self.encoding_width
    }

    fn encode(&mut self, message: &Value) -> Vec<bool> {
        let mut encoding = vec![false; self.encoding_width];
        let mut fields = Vec::new();
        flatten(message, String::new(), &mut fields);

        for (key, value) in &fields {
            self.encode_field(key, value, &mut encoding);
        }

        encoding
    }
}

/// Flattens nested objects into `a.b.c` keys. Arrays contribute `<key>.length` and their first
/// few scalar items as `<key>.<i>`. A bare scalar is encoded under the key `value`.
fn flatten(value: &Value, key: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(fields) => {
            for (name, child) in fields {
                let child_key = if key.is_empty() {
                    name.clone()
                } else {
                    format!("{key}.{name}")
                };
                flatten(child, child_key, out);
            }
        }
        Value::Array(items) => {
            out.push((format!("{key}.length"), Value::from(items.len())));
            for (i, item) in items.iter().take(MAX_ARRAY_ITEMS).enumerate() {
                if !(item.is_object() || item.is_array() || item.is_null()) {
                    out.push((format!("{key}.{i}"), item.clone()));
                }
            }
        }
        _ if key.is_empty() => out.push(("value".to_owned(), value.clone())),
        _ => out.push((key, value.clone())),
    }
}

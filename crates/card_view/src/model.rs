use serde_json::Value;
use shared::domain::{EndpointName, RawRecord};
use tracing::warn;

/// Display-ready projection of one raw record. Exists only for the duration
/// of a render pass and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    /// Stable element identifier derived from the record's `id`, e.g.
    /// `shelter-7`. `None` when the record carries no usable id, in which
    /// case the fragment renders without an id attribute.
    pub fragment_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl CardModel {
    /// Project a raw record for display. Missing or non-scalar fields
    /// default to the empty string; a record is never rejected here, so one
    /// malformed entry cannot abort the rest of the render.
    pub fn from_record(endpoint: &EndpointName, record: &RawRecord) -> Self {
        let fragment_id = match record.get("id") {
            Some(Value::String(id)) if !id.is_empty() => {
                Some(format!("{}-{}", endpoint.singular(), id))
            }
            Some(Value::Number(id)) => Some(format!("{}-{}", endpoint.singular(), id)),
            _ => {
                warn!(endpoint = %endpoint, "record has no usable id, fragment left untagged");
                None
            }
        };

        Self {
            fragment_id,
            name: display_field(endpoint, record, "name"),
            email: display_field(endpoint, record, "email"),
            phone: display_field(endpoint, record, "phone"),
            address: display_field(endpoint, record, "address"),
        }
    }
}

fn display_field(endpoint: &EndpointName, record: &RawRecord, field: &'static str) -> String {
    match record.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Null) | None => {
            warn!(endpoint = %endpoint, field, "record field missing, rendering empty");
            String::new()
        }
        Some(_) => {
            warn!(endpoint = %endpoint, field, "record field is not scalar, rendering empty");
            String::new()
        }
    }
}

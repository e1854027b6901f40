//! Pipedrive wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::NewPerson;

/// Common response envelope: `{"success": bool, "data": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
}

/// `data` of a v2 search response.
#[derive(Debug, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub item: SearchRecord,
}

#[derive(Debug, Deserialize)]
pub struct SearchRecord {
    pub id: i64,
}

impl SearchData {
    /// Id of the first hit.
    pub fn first_id(&self) -> Option<i64> {
        self.items.first().map(|hit| hit.item.id)
    }

    /// Ids of all hits, in ranking order.
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.items.iter().map(|hit| hit.item.id)
    }
}

/// `data` of `GET /api/v1/deals/{id}`. Custom fields are top-level keys.
#[derive(Debug, Deserialize)]
pub struct DealRecord {
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl DealRecord {
    /// Whether `field_key` holds exactly `value`, as text or as a number.
    pub fn field_equals(&self, field_key: &str, value: &str) -> bool {
        match self.fields.get(field_key) {
            Some(Value::String(s)) => s.trim() == value,
            Some(Value::Number(n)) => n.to_string() == value,
            _ => false,
        }
    }
}

/// `data` of a create response.
#[derive(Debug, Deserialize)]
pub struct CreatedRecord {
    pub id: Option<i64>,
}

/// One entry of the person `email` / `phone` arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPoint {
    pub value: String,
    pub primary: bool,
}

/// Body of `POST /api/v1/persons`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phone: Vec<ContactPoint>,
}

impl From<&NewPerson> for PersonBody {
    fn from(person: &NewPerson) -> Self {
        let primary = |value: &Option<String>| -> Vec<ContactPoint> {
            value
                .iter()
                .map(|v| ContactPoint {
                    value: v.clone(),
                    primary: true,
                })
                .collect()
        };
        Self {
            name: person.name.clone(),
            owner_id: person.owner_id,
            visible_to: person.visible_to,
            email: primary(&person.email),
            phone: primary(&person.phone),
        }
    }
}

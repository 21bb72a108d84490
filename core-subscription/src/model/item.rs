use crate::model::ItemKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Named properties attached to an item; where-expressions are evaluated against these.
pub type ItemProperties = BTreeMap<String, Value>;

/// One version of a named item as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreItem {
    pub id: Uuid,
    pub name: String,
    pub data_type_name: String,
    pub app_scope: String,
    pub item_kind: ItemKind,
    /// Update sequence number assigned by the client when the item was stored.
    pub usn: u64,
    pub created: DateTime<Utc>,
    pub deleted: bool,
    pub properties: ItemProperties,
    pub data: Option<Value>,
}

impl CoreItem {
    pub fn new(
        name: impl Into<String>,
        data_type_name: impl Into<String>,
        app_scope: impl Into<String>,
        item_kind: ItemKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            data_type_name: data_type_name.into(),
            app_scope: app_scope.into(),
            item_kind,
            usn: 0,
            created: Utc::now(),
            deleted: false,
            properties: ItemProperties::new(),
            data: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Marks this version as a deletion of the named item.
    pub fn into_deleted(mut self) -> Self {
        self.deleted = true;
        self.data = None;
        self
    }

    /// Copy of the item with the data body removed, as sent to body-excluding subscribers.
    pub fn without_body(&self) -> Self {
        Self {
            data: None,
            ..self.clone()
        }
    }
}

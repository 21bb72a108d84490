//! Formatting helpers for structured log fields.

use crate::model::CoreItem;
use std::any::Any;

/// Extracts a printable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

pub fn format_scopes(scopes: &[String]) -> String {
    scopes.join(",")
}

pub fn format_item(item: &CoreItem) -> String {
    format!("{}#{}", item.name, item.usn)
}

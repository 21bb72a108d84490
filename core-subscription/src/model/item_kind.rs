use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a cached item. A subscription must name one before it starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    Undefined,
    Object,
    Debug,
    Local,
    System,
    Signal,
    Event,
}

impl ItemKind {
    pub fn is_defined(self) -> bool {
        self != ItemKind::Undefined
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

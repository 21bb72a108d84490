use crate::model::ItemProperties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Filter evaluated against an item's properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WhereExpr {
    /// Matches every item.
    #[default]
    All,
    Equal { name: String, value: Value },
    NotEqual { name: String, value: Value },
    Exists { name: String },
    StartsWith { name: String, prefix: String },
    And { terms: Vec<WhereExpr> },
    Or { terms: Vec<WhereExpr> },
    Not { term: Box<WhereExpr> },
}

impl WhereExpr {
    pub fn equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        WhereExpr::Equal {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn not_equal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        WhereExpr::NotEqual {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn exists(name: impl Into<String>) -> Self {
        WhereExpr::Exists { name: name.into() }
    }

    pub fn starts_with(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        WhereExpr::StartsWith {
            name: name.into(),
            prefix: prefix.into(),
        }
    }

    pub fn and(terms: Vec<WhereExpr>) -> Self {
        WhereExpr::And { terms }
    }

    pub fn or(terms: Vec<WhereExpr>) -> Self {
        WhereExpr::Or { terms }
    }

    pub fn negate(term: WhereExpr) -> Self {
        WhereExpr::Not {
            term: Box::new(term),
        }
    }

    pub fn matches(&self, properties: &ItemProperties) -> bool {
        match self {
            WhereExpr::All => true,
            WhereExpr::Equal { name, value } => properties.get(name) == Some(value),
            WhereExpr::NotEqual { name, value } => properties.get(name) != Some(value),
            WhereExpr::Exists { name } => properties.contains_key(name),
            WhereExpr::StartsWith { name, prefix } => properties
                .get(name)
                .and_then(Value::as_str)
                .is_some_and(|text| text.starts_with(prefix.as_str())),
            WhereExpr::And { terms } => terms.iter().all(|term| term.matches(properties)),
            WhereExpr::Or { terms } => terms.iter().any(|term| term.matches(properties)),
            WhereExpr::Not { term } => !term.matches(properties),
        }
    }

    /// JSON form sent to a cache server.
    pub fn serialise(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"op\":\"all\"}"))
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[WhereExpr], separator: &str) -> fmt::Result {
    write!(f, "(")?;
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            write!(f, " {separator} ")?;
        }
        write!(f, "{term}")?;
    }
    write!(f, ")")
}

impl fmt::Display for WhereExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereExpr::All => write!(f, "ALL"),
            WhereExpr::Equal { name, value } => write!(f, "{name} == {value}"),
            WhereExpr::NotEqual { name, value } => write!(f, "{name} != {value}"),
            WhereExpr::Exists { name } => write!(f, "EXISTS({name})"),
            WhereExpr::StartsWith { name, prefix } => write!(f, "{name} STARTSWITH {prefix:?}"),
            WhereExpr::And { terms } => write_joined(f, terms, "AND"),
            WhereExpr::Or { terms } => write_joined(f, terms, "OR"),
            WhereExpr::Not { term } => write!(f, "NOT {term}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WhereExpr;
    use crate::model::ItemProperties;
    use serde_json::json;

    fn properties() -> ItemProperties {
        let mut properties = ItemProperties::new();
        properties.insert("Currency".to_string(), json!("AUD"));
        properties.insert("Tenor".to_string(), json!("3M"));
        properties.insert("Market".to_string(), json!("QR_LIVE"));
        properties
    }

    #[test]
    fn default_matches_everything() {
        assert!(WhereExpr::default().matches(&ItemProperties::new()));
        assert!(WhereExpr::default().matches(&properties()));
    }

    #[test]
    fn compound_expressions_evaluate_against_properties() {
        let expr = WhereExpr::and(vec![
            WhereExpr::equal("Currency", "AUD"),
            WhereExpr::or(vec![
                WhereExpr::equal("Tenor", "6M"),
                WhereExpr::starts_with("Market", "QR_"),
            ]),
            WhereExpr::negate(WhereExpr::exists("Expired")),
        ]);
        assert!(expr.matches(&properties()));

        let miss = WhereExpr::and(vec![
            WhereExpr::equal("Currency", "AUD"),
            WhereExpr::not_equal("Tenor", "3M"),
        ]);
        assert!(!miss.matches(&properties()));
    }

    #[test]
    fn display_is_human_readable() {
        let expr = WhereExpr::and(vec![
            WhereExpr::equal("Currency", "AUD"),
            WhereExpr::exists("Tenor"),
        ]);
        assert_eq!(expr.to_string(), "(Currency == \"AUD\" AND EXISTS(Tenor))");
    }

    #[test]
    fn serialise_produces_tagged_json() {
        let expr = WhereExpr::equal("Currency", "AUD");
        let parsed: WhereExpr = serde_json::from_str(&expr.serialise()).unwrap();
        assert_eq!(parsed, expr);
        assert!(expr.serialise().contains("\"op\":\"equal\""));
    }
}

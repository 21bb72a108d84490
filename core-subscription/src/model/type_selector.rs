use std::any::{type_name, TypeId};

/// Selects the data type a subscription is interested in.
///
/// A runtime type and a bare type name are mutually exclusive: choosing one
/// replaces the other.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeSelector {
    #[default]
    Unspecified,
    ByType {
        type_id: TypeId,
        type_name: &'static str,
    },
    ByName(String),
}

impl TypeSelector {
    pub fn of<T: 'static>() -> Self {
        TypeSelector::ByType {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        TypeSelector::ByName(name.into())
    }

    /// The runtime type, when one was selected.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            TypeSelector::ByType { type_id, .. } => Some(*type_id),
            _ => None,
        }
    }

    /// Fully qualified name of the selected type, whichever way it was chosen.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            TypeSelector::Unspecified => None,
            TypeSelector::ByType { type_name, .. } => Some(type_name),
            TypeSelector::ByName(name) => Some(name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TypeSelector;
    use std::any::TypeId;

    struct Market;

    #[test]
    fn by_type_reports_fully_qualified_name() {
        let selector = TypeSelector::of::<Market>();
        assert_eq!(selector.type_id(), Some(TypeId::of::<Market>()));
        assert_eq!(
            selector.type_name(),
            Some(std::any::type_name::<Market>())
        );
        assert!(selector.type_name().unwrap().contains("::Market"));
    }

    #[test]
    fn by_name_has_no_runtime_type() {
        let selector = TypeSelector::by_name("FpML.Market");
        assert_eq!(selector.type_id(), None);
        assert_eq!(selector.type_name(), Some("FpML.Market"));
        assert_eq!(TypeSelector::default().type_name(), None);
    }
}

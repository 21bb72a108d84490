//! Domain types exchanged between subscriptions and core clients.

mod core_state;
mod item;
mod item_kind;
mod type_selector;
mod where_expr;

pub use core_state::{CoreState, CoreStateChange};
pub use item::{CoreItem, ItemProperties};
pub use item_kind::ItemKind;
pub use type_selector::TypeSelector;
pub use where_expr::WhereExpr;

/// Scope applied when no application scope has been configured.
pub const LEGACY_APP_SCOPE: &str = "Legacy";

/// Normalizes a scope list: `None` or an empty list yields the legacy scope.
pub fn app_scopes_or_default(scopes: Option<Vec<String>>) -> Vec<String> {
    match scopes {
        Some(scopes) if !scopes.is_empty() => scopes,
        _ => vec![LEGACY_APP_SCOPE.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::{app_scopes_or_default, LEGACY_APP_SCOPE};

    #[test]
    fn missing_or_empty_scopes_fall_back_to_legacy() {
        assert_eq!(app_scopes_or_default(None), vec![LEGACY_APP_SCOPE]);
        assert_eq!(app_scopes_or_default(Some(vec![])), vec![LEGACY_APP_SCOPE]);
        assert_eq!(
            app_scopes_or_default(Some(vec!["Pricing".to_string()])),
            vec!["Pricing"]
        );
    }
}

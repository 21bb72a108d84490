//! Query evaluation of a started subscription against stored items.

use core_subscription::{CoreItem, SubscriptionConfig};

/// Whether `item` satisfies the subscription's query.
pub(crate) fn is_match(config: &SubscriptionConfig, item: &CoreItem) -> bool {
    item.item_kind == config.item_kind
        && config
            .type_selector
            .type_name()
            .map_or(true, |name| name == item.data_type_name)
        && config.app_scopes.iter().any(|scope| *scope == item.app_scope)
        && item.usn > config.minimum_usn
        && !(config.exclude_deleted && item.deleted)
        && config.where_expr.matches(&item.properties)
}

/// The form of `item` the subscriber receives.
pub(crate) fn shape(config: &SubscriptionConfig, item: &CoreItem) -> CoreItem {
    if config.exclude_data_body {
        item.without_body()
    } else {
        item.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{is_match, shape};
    use core_subscription::{CoreItem, ItemKind, SubscriptionConfig, TypeSelector, WhereExpr};
    use serde_json::json;

    fn config() -> SubscriptionConfig {
        let mut config = SubscriptionConfig::new(vec!["Pricing".to_string()]);
        config.item_kind = ItemKind::Object;
        config.type_selector = TypeSelector::by_name("Quote");
        config
    }

    fn quote(usn: u64) -> CoreItem {
        let mut item = CoreItem::new("AUD.1Y", "Quote", "Pricing", ItemKind::Object)
            .with_property("Currency", "AUD")
            .with_data(json!({ "rate": 4.25 }));
        item.usn = usn;
        item
    }

    #[test]
    fn kind_type_and_scope_must_all_agree() {
        let config = config();
        assert!(is_match(&config, &quote(1)));

        let mut other_kind = quote(1);
        other_kind.item_kind = ItemKind::Event;
        assert!(!is_match(&config, &other_kind));

        let mut other_type = quote(1);
        other_type.data_type_name = "Trade".to_string();
        assert!(!is_match(&config, &other_type));

        let mut other_scope = quote(1);
        other_scope.app_scope = "Legacy".to_string();
        assert!(!is_match(&config, &other_scope));
    }

    #[test]
    fn unspecified_type_matches_any_type_name() {
        let mut config = config();
        config.type_selector = TypeSelector::Unspecified;
        let mut item = quote(1);
        item.data_type_name = "Anything".to_string();
        assert!(is_match(&config, &item));
    }

    #[test]
    fn minimum_usn_is_exclusive() {
        let mut config = config();
        config.minimum_usn = 5;
        assert!(!is_match(&config, &quote(5)));
        assert!(is_match(&config, &quote(6)));
    }

    #[test]
    fn deleted_items_and_where_expression() {
        let mut config = config();
        config.exclude_deleted = true;
        assert!(!is_match(&config, &quote(1).into_deleted()));

        config.exclude_deleted = false;
        config.where_expr = WhereExpr::equal("Currency", "NZD");
        assert!(!is_match(&config, &quote(1)));
    }

    #[test]
    fn body_is_stripped_on_request() {
        let mut config = config();
        assert!(shape(&config, &quote(1)).data.is_some());
        config.exclude_data_body = true;
        let shaped = shape(&config, &quote(1));
        assert!(shaped.data.is_none());
        assert_eq!(shaped.properties, quote(1).properties);
    }
}

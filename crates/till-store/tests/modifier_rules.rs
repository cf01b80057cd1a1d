//! Integration tests for the modifier rule engine against an in-memory
//! store database: applicability, implication closure, incompatibilities,
//! group cardinality, required groups, and surcharge pricing.

use std::collections::HashMap;

use rust_decimal_macros::dec;

use till_core::{ModifierSelection, PaymentTenderType, StoreExtension, StoreProfile};
use till_store::{reference_migrations, ModifierRuleEngine, SqlStoreExtension, StoreDb};

/// Builds the reference schema and a small coffee-shop rule graph:
///
/// - TEMPERATURE (single-select, required): ICED (+0.10), HOT (free)
/// - SWEETNESS (multi): LESS_SUGAR (free)
/// - MILK (single-select): SOY (free), OAT (free)
/// - PREP (multi): ICE_CUBES (+0.05), implied by ICED
/// - PACKAGING/SERVICE: TO_GO forbids the whole SERVICE group
/// - ICED ↔ HOT are incompatible
/// - LESS_SUGAR implies a GHOST modifier that does not exist (advisory)
/// - EXTRA_SHOT (+0.75) applies to LATTE only
async fn coffee_graph() -> (StoreDb, ModifierRuleEngine) {
    let db = StoreDb::in_memory().await.unwrap();
    for script in reference_migrations("test").scripts {
        sqlx::raw_sql(&script.sql).execute(db.pool()).await.unwrap();
    }

    sqlx::raw_sql(
        r#"
        INSERT INTO modification_groups (code, name, selection_type, is_required) VALUES
            ('TEMPERATURE', 'Temperature', 'single', 1),
            ('SWEETNESS', 'Sweetness', 'multi', 0),
            ('MILK', 'Milk', 'single', 0),
            ('PREP', 'Preparation', 'multi', 0),
            ('PACKAGING', 'Packaging', 'multi', 0),
            ('SERVICE', 'Service', 'multi', 0);

        INSERT INTO product_modifications
            (modification_id, name, modification_type, price_adjustment_type,
             base_price_cents, is_automatic, display_order, is_active) VALUES
            ('ICED', 'Iced', 'preparation', 'SURCHARGE', 10, 0, 1, 1),
            ('HOT', 'Hot', 'preparation', 'FREE', 0, 1, 2, 1),
            ('LESS_SUGAR', 'Less Sugar', 'recipe', 'FREE', 0, 0, 3, 1),
            ('SOY', 'Soy Milk', 'recipe', 'FREE', 0, 0, 4, 1),
            ('OAT', 'Oat Milk', 'recipe', 'FREE', 0, 0, 5, 1),
            ('ICE_CUBES', 'Ice Cubes', 'preparation', 'SURCHARGE', 5, 0, 6, 1),
            ('TO_GO', 'To Go', 'service', 'FREE', 0, 0, 7, 1),
            ('FOR_HERE', 'For Here', 'service', 'FREE', 0, 0, 8, 1),
            ('EXTRA_SHOT', 'Extra Shot', 'recipe', 'SURCHARGE', 75, 0, 9, 1),
            ('RETIRED', 'Gone', 'recipe', 'FREE', 0, 0, 10, 0);

        INSERT INTO modification_group_members (modification_id, group_code) VALUES
            ('ICED', 'TEMPERATURE'),
            ('HOT', 'TEMPERATURE'),
            ('LESS_SUGAR', 'SWEETNESS'),
            ('SOY', 'MILK'),
            ('OAT', 'MILK'),
            ('ICE_CUBES', 'PREP'),
            ('TO_GO', 'PACKAGING'),
            ('FOR_HERE', 'SERVICE'),
            ('EXTRA_SHOT', 'SWEETNESS');

        INSERT INTO product_modifier_applicability (sku, modification_id, is_active) VALUES
            ('COFFEE', 'ICED', 1),
            ('COFFEE', 'HOT', 1),
            ('COFFEE', 'LESS_SUGAR', 1),
            ('COFFEE', 'SOY', 1),
            ('COFFEE', 'OAT', 1),
            ('COFFEE', 'ICE_CUBES', 1),
            ('COFFEE', 'TO_GO', 1),
            ('COFFEE', 'FOR_HERE', 1),
            ('LATTE', 'EXTRA_SHOT', 1),
            ('LATTE', 'HOT', 1);

        INSERT INTO modification_implications
            (source_modification_id, implied_modification_id) VALUES
            ('ICED', 'ICE_CUBES'),
            ('LESS_SUGAR', 'GHOST');

        INSERT INTO modification_incompatibilities
            (modification_id, incompatible_modification_id) VALUES
            ('ICED', 'HOT');

        INSERT INTO modification_group_incompatibilities
            (modification_id, incompatible_group_code) VALUES
            ('TO_GO', 'SERVICE');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let engine = ModifierRuleEngine::load(db.pool()).await.unwrap();
    (db, engine)
}

fn sel(id: &str) -> ModifierSelection {
    ModifierSelection::new(id, 1)
}

#[tokio::test]
async fn valid_single_selection_prices_surcharge_and_closure() {
    let (_db, engine) = coffee_graph().await;

    // ICED alone satisfies TEMPERATURE; its implication pulls in ICE_CUBES.
    let check = engine.validate("COFFEE", &[sel("ICED")]);
    assert!(check.is_valid, "{:?}", check.error_message);
    assert_eq!(check.total_extra_price, dec!(0.15));
}

#[tokio::test]
async fn incompatible_pair_is_rejected() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("ICED"), sel("HOT")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("cannot be combined"));
}

#[tokio::test]
async fn missing_required_group_is_rejected() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("LESS_SUGAR")]);
    assert!(!check.is_valid);
    let message = check.error_message.unwrap();
    assert!(message.contains("TEMPERATURE"));
    assert!(message.contains("has no selection"));
}

#[tokio::test]
async fn unknown_modifier_is_rejected_but_unknown_implication_is_skipped() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("SPRINKLES")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("Unknown modifier 'SPRINKLES'"));

    // LESS_SUGAR implies GHOST, which is not defined anywhere: advisory,
    // silently skipped, validation still passes.
    let check = engine.validate("COFFEE", &[sel("HOT"), sel("LESS_SUGAR")]);
    assert!(check.is_valid, "{:?}", check.error_message);
    assert_eq!(check.total_extra_price, dec!(0));
}

#[tokio::test]
async fn non_applicable_and_inactive_modifiers_are_rejected() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("EXTRA_SHOT")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("not applicable to product 'COFFEE'"));

    // Inactive modifiers are not even loaded, so they read as unknown.
    let check = engine.validate("COFFEE", &[sel("RETIRED")]);
    assert!(!check.is_valid);
    assert!(check.error_message.as_deref().unwrap().contains("Unknown"));
}

#[tokio::test]
async fn group_claim_must_match_stored_membership() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("ICED").in_group("SWEETNESS")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("does not belong to group 'SWEETNESS'"));

    // Correct claim (case-insensitive) passes.
    let check = engine.validate("COFFEE", &[sel("ICED").in_group("temperature")]);
    assert!(check.is_valid, "{:?}", check.error_message);
}

#[tokio::test]
async fn single_select_group_allows_one_member() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("ICED"), sel("SOY"), sel("OAT")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("allows only one selection"));
}

#[tokio::test]
async fn group_incompatibility_is_rejected() {
    let (_db, engine) = coffee_graph().await;

    let check = engine.validate("COFFEE", &[sel("ICED"), sel("TO_GO"), sel("FOR_HERE")]);
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("cannot be combined with group 'SERVICE'"));
}

#[tokio::test]
async fn quantities_accumulate_through_the_closure() {
    let (_db, engine) = coffee_graph().await;

    // ICED ×2 surcharges 0.20; implied ICE_CUBES inherits quantity 2 for
    // another 0.10.
    let check = engine.validate("COFFEE", &[ModifierSelection::new("ICED", 2)]);
    assert!(check.is_valid, "{:?}", check.error_message);
    assert_eq!(check.total_extra_price, dec!(0.30));

    // Explicit ICE_CUBES wins over the implication: one unit only.
    let check = engine.validate(
        "COFFEE",
        &[
            ModifierSelection::new("ICED", 2),
            ModifierSelection::new("ICE_CUBES", 1),
        ],
    );
    assert!(check.is_valid);
    assert_eq!(check.total_extra_price, dec!(0.25));
}

#[tokio::test]
async fn validation_is_deterministic() {
    let (_db, engine) = coffee_graph().await;

    let selections = [sel("ICED"), sel("LESS_SUGAR"), sel("SOY")];
    let first = engine.validate("COFFEE", &selections);
    let second = engine.validate("COFFEE", &selections);
    assert_eq!(first.is_valid, second.is_valid);
    assert_eq!(first.total_extra_price, second.total_extra_price);
    assert_eq!(first.error_message, second.error_message);
}

#[tokio::test]
async fn price_without_product_context_ignores_unknowns() {
    let (_db, engine) = coffee_graph().await;

    let total = engine.price(&[sel("ICED"), sel("SPRINKLES")]);
    // ICED (0.10) plus its implied ICE_CUBES (0.05); SPRINKLES contributes
    // nothing.
    assert_eq!(total, dec!(0.15));
}

#[tokio::test]
async fn modifier_service_contract_reaches_the_rule_engine() {
    let (db, _engine) = coffee_graph().await;

    let mut payment_types = HashMap::new();
    payment_types.insert(
        "cash".to_string(),
        PaymentTenderType {
            id: "cash".to_string(),
            allows_change: true,
            requires_exact: false,
        },
    );
    let profile = StoreProfile {
        store_id: "seam-test".to_string(),
        display_name: "Seam Test".to_string(),
        currency: "USD".to_string(),
        culture: "en-US".to_string(),
        version: 2,
        payment_types,
        database: None,
    };
    let extension = SqlStoreExtension::activate(profile, db).await.unwrap();

    // The composed extension routes validation through the loaded graph.
    let modifications = extension.modifications();
    let check = modifications
        .validate_modifications("COFFEE", &[sel("ICED")])
        .await
        .unwrap();
    assert!(check.is_valid, "{:?}", check.error_message);
    assert_eq!(check.total_extra_price, dec!(0.15));

    let check = modifications
        .validate_modifications("COFFEE", &[sel("ICED"), sel("HOT")])
        .await
        .unwrap();
    assert!(!check.is_valid);
    assert!(check
        .error_message
        .as_deref()
        .unwrap()
        .contains("cannot be combined"));

    let total = modifications
        .calculate_modification_total(&[sel("ICED"), sel("SPRINKLES")])
        .await
        .unwrap();
    assert_eq!(total, dec!(0.15));
}

#[tokio::test]
async fn applicable_listing_is_ordered_by_display_order() {
    let (_db, engine) = coffee_graph().await;

    let ids: Vec<&str> = engine
        .applicable_to("COFFEE")
        .into_iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(
        ids,
        ["ICED", "HOT", "LESS_SUGAR", "SOY", "OAT", "ICE_CUBES", "TO_GO", "FOR_HERE"]
    );

    // HOT is flagged automatic; it is exposed, never injected.
    let auto: Vec<&str> = engine
        .automatic_for("COFFEE")
        .into_iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(auto, ["HOT"]);
}

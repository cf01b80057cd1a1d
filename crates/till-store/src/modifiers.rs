//! # Modifier Rule Engine
//!
//! Loads a store's modifier graph (definitions, group memberships,
//! applicability per SKU, implications, incompatibilities, group
//! incompatibilities, required/single-select groups) into immutable
//! in-memory maps at store activation, then validates and prices selection
//! sets without touching the database again.
//!
//! ## Validation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  selections                                                             │
//! │     │ 1. resolve each id (unknown → fail); group claim must match      │
//! │     │ 2. applicability(sku, modifier) (missing → fail)                 │
//! │     ▼                                                                   │
//! │  implication closure (breadth-first; implied ids inherit the implying  │
//! │  quantity; unknown implied ids are advisory and skipped with a warn)   │
//! │     │ 3. implied modifiers must also be applicable                     │
//! │     ▼                                                                   │
//! │  4. pairwise incompatibilities over the closed set                     │
//! │  5. group incompatibilities                                            │
//! │  6. single-select cardinality per group                                │
//! │  7. required groups last (implied selections may satisfy them)         │
//! │     ▼                                                                   │
//! │  8. price = Σ surcharge value × accumulated quantity                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All id and code comparisons are case-insensitive (uppercased keys).
//! Ordering within the closed set follows `display_order` then id, so
//! messages and totals are deterministic for identical input.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use till_core::{
    KernelResult, ModificationCheck, Modifier, ModifierGroup, ModifierSelection, ModifierService,
    PriceAdjustment,
};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Row Shapes
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ModifierRow {
    modification_id: String,
    name: String,
    price_adjustment_type: String,
    base_price_cents: i64,
    is_automatic: bool,
    display_order: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    code: String,
    name: String,
    selection_type: String,
    is_required: bool,
}

// =============================================================================
// Rule Engine
// =============================================================================

/// The loaded modifier graph for one store. Immutable after load; safe to
/// share across sessions without locking.
#[derive(Debug)]
pub struct ModifierRuleEngine {
    /// Keyed by uppercased modifier id.
    modifiers: HashMap<String, Modifier>,
    /// Keyed by uppercased group code.
    groups: HashMap<String, ModifierGroup>,
    /// Uppercased sku → applicable modifier keys.
    applicability: HashMap<String, HashSet<String>>,
    /// Source modifier key → implied modifier keys (load order preserved).
    implications: HashMap<String, Vec<String>>,
    /// Symmetric: each pair is inserted in both directions at load.
    incompatibilities: HashMap<String, HashSet<String>>,
    /// Modifier key → forbidden group keys.
    group_incompatibilities: HashMap<String, HashSet<String>>,
}

fn key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

impl ModifierRuleEngine {
    /// Loads the whole graph from a store database. Called once at store
    /// activation; the optional rule tables may be absent in older catalogs.
    pub async fn load(pool: &SqlitePool) -> StoreResult<Self> {
        let group_rows = sqlx::query_as::<_, GroupRow>(
            "SELECT code, name, selection_type, is_required FROM modification_groups",
        )
        .fetch_all(pool)
        .await?;

        let mut groups = HashMap::new();
        for row in group_rows {
            let group = ModifierGroup {
                code: row.code.trim().to_string(),
                name: row.name,
                single_select: row.selection_type.trim().eq_ignore_ascii_case("single"),
                required: row.is_required,
            };
            groups.insert(key(&group.code), group);
        }

        let modifier_rows = sqlx::query_as::<_, ModifierRow>(
            r#"
            SELECT modification_id, name, price_adjustment_type, base_price_cents,
                   is_automatic, display_order
            FROM product_modifications
            WHERE is_active = 1
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut modifiers = HashMap::new();
        for row in modifier_rows {
            let adjustment = match row.price_adjustment_type.trim().to_uppercase().as_str() {
                "FREE" => PriceAdjustment::Free,
                "SURCHARGE" => PriceAdjustment::Surcharge,
                other => {
                    return Err(StoreError::QueryFailed(format!(
                        "unknown price adjustment type '{}' on modifier '{}'",
                        other, row.modification_id
                    )))
                }
            };
            let modifier = Modifier {
                id: row.modification_id.trim().to_string(),
                name: row.name,
                group_code: None,
                adjustment,
                value: Decimal::new(row.base_price_cents, 2),
                is_automatic: row.is_automatic,
                display_order: row.display_order,
            };
            modifiers.insert(key(&modifier.id), modifier);
        }

        // Group membership: single group per modifier (phase 1).
        let member_rows = sqlx::query_as::<_, (String, String)>(
            "SELECT modification_id, group_code FROM modification_group_members",
        )
        .fetch_all(pool)
        .await?;
        for (modification_id, group_code) in member_rows {
            if let Some(modifier) = modifiers.get_mut(&key(&modification_id)) {
                let group_key = key(&group_code);
                match groups.get(&group_key) {
                    Some(group) => modifier.group_code = Some(group.code.clone()),
                    None => warn!(
                        modifier = %modification_id,
                        group = %group_code,
                        "membership references unknown group; ignored"
                    ),
                }
            }
        }

        let applicability_rows = sqlx::query_as::<_, (String, String)>(
            "SELECT sku, modification_id FROM product_modifier_applicability WHERE is_active = 1",
        )
        .fetch_all(pool)
        .await?;
        let mut applicability: HashMap<String, HashSet<String>> = HashMap::new();
        for (sku, modification_id) in applicability_rows {
            applicability
                .entry(key(&sku))
                .or_default()
                .insert(key(&modification_id));
        }

        let mut implications: HashMap<String, Vec<String>> = HashMap::new();
        if table_exists(pool, "modification_implications").await? {
            let rows = sqlx::query_as::<_, (String, String)>(
                "SELECT source_modification_id, implied_modification_id FROM modification_implications",
            )
            .fetch_all(pool)
            .await?;
            for (source, implied) in rows {
                implications.entry(key(&source)).or_default().push(key(&implied));
            }
        }

        let mut incompatibilities: HashMap<String, HashSet<String>> = HashMap::new();
        if table_exists(pool, "modification_incompatibilities").await? {
            let rows = sqlx::query_as::<_, (String, String)>(
                "SELECT modification_id, incompatible_modification_id FROM modification_incompatibilities",
            )
            .fetch_all(pool)
            .await?;
            for (a, b) in rows {
                let (a, b) = (key(&a), key(&b));
                incompatibilities.entry(a.clone()).or_default().insert(b.clone());
                incompatibilities.entry(b).or_default().insert(a);
            }
        }

        let mut group_incompatibilities: HashMap<String, HashSet<String>> = HashMap::new();
        if table_exists(pool, "modification_group_incompatibilities").await? {
            let rows = sqlx::query_as::<_, (String, String)>(
                "SELECT modification_id, incompatible_group_code FROM modification_group_incompatibilities",
            )
            .fetch_all(pool)
            .await?;
            for (modifier, group) in rows {
                group_incompatibilities
                    .entry(key(&modifier))
                    .or_default()
                    .insert(key(&group));
            }
        }

        info!(
            modifiers = modifiers.len(),
            groups = groups.len(),
            skus = applicability.len(),
            "modifier graph loaded"
        );

        Ok(ModifierRuleEngine {
            modifiers,
            groups,
            applicability,
            implications,
            incompatibilities,
            group_incompatibilities,
        })
    }

    /// Resolves a modifier by id, case-insensitively.
    pub fn modifier(&self, id: &str) -> Option<&Modifier> {
        self.modifiers.get(&key(id))
    }

    /// Modifiers applicable to a SKU, ordered by `display_order` then id.
    pub fn applicable_to(&self, sku: &str) -> Vec<&Modifier> {
        let mut list: Vec<&Modifier> = self
            .applicability
            .get(&key(sku))
            .map(|set| set.iter().filter_map(|k| self.modifiers.get(k)).collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.id.cmp(&b.id)));
        list
    }

    /// Automatic modifiers for a SKU. Exposed for callers that pre-select;
    /// the engine itself never injects them into a selection set.
    pub fn automatic_for(&self, sku: &str) -> Vec<&Modifier> {
        self.applicable_to(sku)
            .into_iter()
            .filter(|m| m.is_automatic)
            .collect()
    }

    /// Full validation pipeline for one product's selection set.
    pub fn validate(&self, product_id: &str, selections: &[ModifierSelection]) -> ModificationCheck {
        let product = product_id.trim();
        let applicable = self.applicability.get(&key(product));

        // Steps 1-2: resolve, check the group claim, check applicability.
        // Explicit selections of the same modifier accumulate quantity.
        let mut closed: Vec<(String, i64)> = Vec::new();
        for selection in selections {
            let modifier_key = key(&selection.modifier_id);
            let modifier = match self.modifiers.get(&modifier_key) {
                Some(m) => m,
                None => {
                    return ModificationCheck::invalid(format!(
                        "Unknown modifier '{}'.",
                        selection.modifier_id.trim()
                    ))
                }
            };

            if let Some(claimed) = &selection.group_code {
                let stored = modifier.group_code.as_deref().unwrap_or("");
                if !claimed.trim().eq_ignore_ascii_case(stored) {
                    return ModificationCheck::invalid(format!(
                        "Modifier '{}' does not belong to group '{}'.",
                        modifier.id,
                        claimed.trim()
                    ));
                }
            }

            if !applicable.is_some_and(|set| set.contains(&modifier_key)) {
                return ModificationCheck::invalid(format!(
                    "Modifier '{}' not applicable to product '{}'.",
                    modifier.id, product
                ));
            }

            let quantity = selection.quantity.max(1);
            match closed.iter_mut().find(|(k, _)| k == &modifier_key) {
                Some((_, q)) => *q += quantity,
                None => closed.push((modifier_key, quantity)),
            }
        }

        // Step 3: implication closure, breadth-first. Implied modifiers join
        // with the implying quantity; already-present modifiers are left
        // alone so an explicit selection wins over an implication.
        let mut queue: VecDeque<(String, i64)> = closed.iter().cloned().collect();
        while let Some((current, quantity)) = queue.pop_front() {
            let Some(implied_ids) = self.implications.get(&current) else {
                continue;
            };
            for implied_key in implied_ids {
                let Some(implied) = self.modifiers.get(implied_key) else {
                    // Implications are advisory metadata; unknown targets are
                    // skipped, not fatal.
                    warn!(source = %current, implied = %implied_key, "implied modifier unknown; skipped");
                    continue;
                };
                if closed.iter().any(|(k, _)| k == implied_key) {
                    continue;
                }
                if !applicable.is_some_and(|set| set.contains(implied_key)) {
                    return ModificationCheck::invalid(format!(
                        "Implied modifier '{}' not applicable to product '{}'.",
                        implied.id, product
                    ));
                }
                closed.push((implied_key.clone(), quantity));
                queue.push_back((implied_key.clone(), quantity));
            }
        }

        // Deterministic ordering for every later check and message.
        closed.sort_by(|(a, _), (b, _)| {
            let ma = &self.modifiers[a];
            let mb = &self.modifiers[b];
            ma.display_order.cmp(&mb.display_order).then(ma.id.cmp(&mb.id))
        });

        // Step 4: pairwise incompatibilities over the closed set.
        for i in 0..closed.len() {
            for j in (i + 1)..closed.len() {
                let (a, b) = (&closed[i].0, &closed[j].0);
                if self.incompatibilities.get(a).is_some_and(|s| s.contains(b)) {
                    return ModificationCheck::invalid(format!(
                        "Modifier '{}' cannot be combined with modifier '{}'.",
                        self.modifiers[a].id, self.modifiers[b].id
                    ));
                }
            }
        }

        // Step 5: group incompatibilities.
        for (a, _) in &closed {
            let Some(forbidden) = self.group_incompatibilities.get(a) else {
                continue;
            };
            for (b, _) in &closed {
                if a == b {
                    continue;
                }
                let Some(group) = self.modifiers[b].group_code.as_deref() else {
                    continue;
                };
                if forbidden.contains(&key(group)) {
                    return ModificationCheck::invalid(format!(
                        "Modifier '{}' cannot be combined with group '{}'.",
                        self.modifiers[a].id, group
                    ));
                }
            }
        }

        // Step 6: single-select cardinality.
        let mut per_group: HashMap<String, Vec<&str>> = HashMap::new();
        for (modifier_key, _) in &closed {
            if let Some(group) = self.modifiers[modifier_key].group_code.as_deref() {
                per_group
                    .entry(key(group))
                    .or_default()
                    .push(&self.modifiers[modifier_key].id);
            }
        }
        let mut group_keys: Vec<&String> = per_group.keys().collect();
        group_keys.sort();
        for group_key in group_keys {
            let members = &per_group[group_key];
            let Some(group) = self.groups.get(group_key) else {
                continue;
            };
            if group.single_select && members.len() > 1 {
                return ModificationCheck::invalid(format!(
                    "Group '{}' allows only one selection; got {}.",
                    group.code,
                    members.join(", ")
                ));
            }
        }

        // Step 7: required groups, checked last so implied selections count.
        let mut required: Vec<&ModifierGroup> =
            self.groups.values().filter(|g| g.required).collect();
        required.sort_by(|a, b| a.code.cmp(&b.code));
        for group in required {
            let satisfied = closed
                .iter()
                .any(|(k, _)| self.modifiers[k].group_code.as_deref()
                    .is_some_and(|g| g.eq_ignore_ascii_case(&group.code)));
            if !satisfied {
                return ModificationCheck::invalid(format!(
                    "Required group '{}' has no selection.",
                    group.code
                ));
            }
        }

        // Step 8: surcharge pricing over the closed set.
        let total = self.price_closed(&closed);
        debug!(product = %product, selections = selections.len(), closed = closed.len(), total = %total, "modifier selection valid");
        ModificationCheck::valid(total)
    }

    /// Prices a selection set without product context: closure of the known
    /// modifiers, surcharges only. Unknown ids contribute nothing.
    pub fn price(&self, selections: &[ModifierSelection]) -> Decimal {
        let mut closed: Vec<(String, i64)> = Vec::new();
        for selection in selections {
            let modifier_key = key(&selection.modifier_id);
            if !self.modifiers.contains_key(&modifier_key) {
                continue;
            }
            let quantity = selection.quantity.max(1);
            match closed.iter_mut().find(|(k, _)| k == &modifier_key) {
                Some((_, q)) => *q += quantity,
                None => closed.push((modifier_key, quantity)),
            }
        }

        let mut queue: VecDeque<(String, i64)> = closed.iter().cloned().collect();
        while let Some((current, quantity)) = queue.pop_front() {
            let Some(implied_ids) = self.implications.get(&current) else {
                continue;
            };
            for implied_key in implied_ids {
                if !self.modifiers.contains_key(implied_key)
                    || closed.iter().any(|(k, _)| k == implied_key)
                {
                    continue;
                }
                closed.push((implied_key.clone(), quantity));
                queue.push_back((implied_key.clone(), quantity));
            }
        }

        self.price_closed(&closed)
    }

    fn price_closed(&self, closed: &[(String, i64)]) -> Decimal {
        closed
            .iter()
            .filter_map(|(modifier_key, quantity)| {
                let modifier = &self.modifiers[modifier_key];
                match modifier.adjustment {
                    PriceAdjustment::Surcharge => {
                        Some(modifier.value * Decimal::from(*quantity))
                    }
                    PriceAdjustment::Free => None,
                }
            })
            .sum()
    }
}

async fn table_exists(pool: &SqlitePool, name: &str) -> StoreResult<bool> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

// =============================================================================
// Kernel-Facing Contract
// =============================================================================

/// Adapter exposing a loaded [`ModifierRuleEngine`] through the kernel's
/// `ModifierService` contract.
#[derive(Debug, Clone)]
pub struct GraphModifierService {
    engine: std::sync::Arc<ModifierRuleEngine>,
}

impl GraphModifierService {
    pub fn new(engine: std::sync::Arc<ModifierRuleEngine>) -> Self {
        GraphModifierService { engine }
    }

    pub fn engine(&self) -> &ModifierRuleEngine {
        &self.engine
    }
}

#[async_trait]
impl ModifierService for GraphModifierService {
    async fn validate_modifications(
        &self,
        product_id: &str,
        selections: &[ModifierSelection],
    ) -> KernelResult<ModificationCheck> {
        Ok(self.engine.validate(product_id, selections))
    }

    async fn calculate_modification_total(
        &self,
        selections: &[ModifierSelection],
    ) -> KernelResult<Decimal> {
        Ok(self.engine.price(selections))
    }
}

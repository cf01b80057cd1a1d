//! # SQL Store Extension
//!
//! Composes the three store sub-services (catalog, modifier rules, currency
//! formatting) over one store database, activated from a profile.
//!
//! ## Activation
//! ```text
//! StoreProfile ──► migrations (migrate.rs, separate connection)
//!       │
//!       ▼
//! SqlStoreExtension::activate(profile, db)
//!       ├── SqlCatalog over the pool
//!       ├── ModifierRuleEngine::load  (graph → immutable maps, ONCE)
//!       └── CultureFormatter
//! ```
//!
//! Missing collaborators are construction-time failures with a remediation
//! message, never nil checks at the call site.

use std::sync::Arc;

use tracing::info;

use till_core::{
    CurrencyFormatter, KernelError, KernelResult, ModifierService, ProductCatalog,
    ProfilePaymentRules, StoreExtension, StoreProfile,
};

use crate::catalog::SqlCatalog;
use crate::db::StoreDb;
use crate::format::CultureFormatter;
use crate::modifiers::{GraphModifierService, ModifierRuleEngine};

/// One store's activated extension.
pub struct SqlStoreExtension {
    profile: StoreProfile,
    catalog: SqlCatalog,
    modifier_service: GraphModifierService,
    formatter: CultureFormatter,
}

impl SqlStoreExtension {
    /// Activates a store: loads the modifier graph once into immutable maps
    /// and wires the catalog over the shared pool.
    ///
    /// Fails with `ConfigurationMissing` when the profile declares no
    /// payment types - an extension that can sell but never settle is a
    /// wiring mistake, not a runtime surprise.
    pub async fn activate(profile: StoreProfile, db: StoreDb) -> KernelResult<Self> {
        if profile.payment_types.is_empty() {
            return Err(KernelError::configuration_missing(
                format!("payment types for store '{}'", profile.store_id),
                "declare at least one [payment_types.<id>] entry in the store profile",
            ));
        }

        let engine = ModifierRuleEngine::load(db.pool())
            .await
            .map_err(|e| KernelError::Extension(e.to_string()))?;

        info!(store = %profile.store_id, currency = %profile.currency, "store extension activated");

        Ok(SqlStoreExtension {
            catalog: SqlCatalog::new(db.pool().clone()),
            modifier_service: GraphModifierService::new(Arc::new(engine)),
            formatter: CultureFormatter::new(),
            profile,
        })
    }

    /// Payment rules derived from the profile's tender table.
    pub fn payment_rules(&self) -> ProfilePaymentRules {
        ProfilePaymentRules::new(self.profile.payment_types.values())
    }

    /// Direct access to the loaded rule engine (host diagnostics, tests).
    pub fn modifier_engine(&self) -> &ModifierRuleEngine {
        self.modifier_service.engine()
    }
}

impl StoreExtension for SqlStoreExtension {
    fn profile(&self) -> &StoreProfile {
        &self.profile
    }

    fn catalog(&self) -> &dyn ProductCatalog {
        &self.catalog
    }

    fn modifications(&self) -> &dyn ModifierService {
        &self.modifier_service
    }

    fn currency_formatter(&self) -> &dyn CurrencyFormatter {
        &self.formatter
    }
}

//! # Reference Tool Set
//!
//! The tool catalog an orchestrator drives the kernel with:
//! `start_transaction`, `add_item`, `pay`, `show`, `void_item`.
//!
//! ## Handler Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handlers bridge intent to kernel operations. They NEVER:              │
//! │   - compute a price        (the catalog owns every price)              │
//! │   - aggregate a total      (the engine owns every total)               │
//! │   - format money inline    (the store formatter owns every string)     │
//! │                                                                         │
//! │  Domain failures (rejected payment, unknown product) come back as      │
//! │  reply text built from the result envelope. Structural failures        │
//! │  (bad parameters) never reach a handler at all.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use till_core::{
    KernelError, LineItemId, LineItemRequest, LineType, ModifierSelection, Money, OperationResult,
    SessionId, StoreExtension, Transaction, TransactionId,
};

use crate::client::KernelClient;
use crate::definition::{ParamType, ToolDefinition, ToolParameter, ToolArgs};
use crate::executor::{ToolExecutor, ToolHandler, ToolReply, ToolResult};

// =============================================================================
// Tool Context
// =============================================================================

/// Shared state the reference tools operate on: one operator session and the
/// transaction currently rung up at this terminal.
pub struct ToolContext {
    pub client: Arc<KernelClient>,
    pub extension: Arc<dyn StoreExtension>,
    pub session: SessionId,
    current: Mutex<Option<TransactionId>>,
}

impl ToolContext {
    pub fn new(
        client: Arc<KernelClient>,
        extension: Arc<dyn StoreExtension>,
        session: SessionId,
    ) -> Self {
        ToolContext {
            client,
            extension,
            session,
            current: Mutex::new(None),
        }
    }

    fn current_transaction(&self) -> Option<TransactionId> {
        self.current.lock().expect("current-transaction mutex poisoned").clone()
    }

    fn set_current(&self, tx: Option<TransactionId>) {
        *self.current.lock().expect("current-transaction mutex poisoned") = tx;
    }

    fn format(&self, amount: Decimal) -> String {
        let profile = self.extension.profile();
        self.extension.currency_formatter().format_currency(
            amount,
            &profile.currency,
            &profile.culture,
        )
    }
}

fn envelope_errors(env: &OperationResult) -> String {
    if env.errors.is_empty() {
        "error: operation failed".to_string()
    } else {
        format!("error: {}", env.errors.join("; "))
    }
}

// =============================================================================
// start_transaction
// =============================================================================

struct StartTransactionTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for StartTransactionTool {
    async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply> {
        let currency = args.text("currency").unwrap_or_default();
        let env = self
            .ctx
            .client
            .start_transaction(&self.ctx.session, currency)
            .await;

        match env.transaction {
            Some(tx) if env.success => {
                self.ctx.set_current(Some(tx.id.clone()));
                Ok(ToolReply::new(format!(
                    "Started transaction {} in {}.",
                    tx.id, tx.currency
                )))
            }
            _ => Ok(ToolReply::new(envelope_errors(&env))),
        }
    }
}

// =============================================================================
// add_item
// =============================================================================

struct AddItemTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for AddItemTool {
    async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply> {
        let Some(tx_id) = self.ctx.current_transaction() else {
            return Ok(ToolReply::new(
                "error: no open transaction; run start_transaction first",
            ));
        };
        let product_id = args.text("product_id").unwrap_or_default();
        let quantity = args.int("quantity").unwrap_or(1);
        // Selections mirror the parent quantity by convention.
        let selections: Vec<ModifierSelection> = args
            .text("modifiers")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| ModifierSelection::new(id, quantity))
                    .collect()
            })
            .unwrap_or_default();

        // The catalog owns the price; the handler only carries it across.
        let check = self
            .ctx
            .extension
            .catalog()
            .validate_product(product_id)
            .await?;
        if !check.is_valid {
            return Ok(ToolReply::new(format!(
                "error: {}",
                check
                    .error_message
                    .unwrap_or_else(|| "product rejected".to_string())
            )));
        }
        let Some(product) = check.product else {
            return Ok(ToolReply::new("error: catalog returned no product data"));
        };

        // The rule engine owns modifier validity; a rejection surfaces as a
        // ModifierRule kernel error before anything is rung.
        let modifications = self.ctx.extension.modifications();
        if !selections.is_empty() {
            let mod_check = modifications
                .validate_modifications(&product.sku, &selections)
                .await?;
            if !mod_check.is_valid {
                let err = KernelError::ModifierRule {
                    message: mod_check
                        .error_message
                        .unwrap_or_else(|| "modifier selection rejected".to_string()),
                };
                return Ok(ToolReply::new(format!("error: {}", err)));
            }
        }

        let currency = self.ctx.extension.profile().currency.clone();
        let mut request = LineItemRequest::new(
            product.sku.as_str(),
            quantity,
            Money::new(check.effective_price, currency.clone()),
        )
        .named(product.name.clone());
        if let Some(description) = &product.description {
            request = request.described(description.clone());
        }

        let env = self
            .ctx
            .client
            .add_line_item(&self.ctx.session, &tx_id, request)
            .await;
        let mut tx = match env.transaction {
            Some(tx) if env.success => tx,
            _ => return Ok(ToolReply::new(envelope_errors(&env))),
        };
        let Some(parent_id) = tx.lines.last().map(|l| l.line_item_id.clone()) else {
            return Ok(ToolReply::new("error: engine returned no line for the item"));
        };

        // Ring each selection as a child line priced by its marginal closure
        // total, so the line aggregation always equals the validated extra
        // price even when selections share implied surcharges.
        let mut priced = Decimal::ZERO;
        for index in 0..selections.len() {
            let cumulative = modifications
                .calculate_modification_total(&selections[..=index])
                .await?;
            let marginal = cumulative - priced;
            priced = cumulative;

            let child = LineItemRequest::new(
                selections[index].modifier_id.as_str(),
                1,
                Money::new(marginal, currency.clone()),
            )
            .child_of(parent_id.clone());
            let env = self
                .ctx
                .client
                .add_line_item(&self.ctx.session, &tx_id, child)
                .await;
            tx = match env.transaction {
                Some(tx) if env.success => tx,
                _ => return Ok(ToolReply::new(envelope_errors(&env))),
            };
        }

        Ok(ToolReply::new(format!(
            "Added {} x {} - total {}.",
            quantity,
            product.name,
            self.ctx.format(tx.total)
        )))
    }
}

// =============================================================================
// pay
// =============================================================================

struct PayTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for PayTool {
    async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply> {
        let Some(tx_id) = self.ctx.current_transaction() else {
            return Ok(ToolReply::new(
                "error: no open transaction; run start_transaction first",
            ));
        };
        let amount = args.decimal("amount").unwrap_or_default();
        // The reference catalog declares `pay(amount)`; the optional tender
        // defaults to cash HERE, at the tool layer, and reaches the kernel
        // explicitly - the kernel itself never defaults a tender.
        let tender = args.text("tender").unwrap_or("cash").to_string();

        let env = self
            .ctx
            .client
            .process_payment(&self.ctx.session, &tx_id, amount, &tender)
            .await;

        match env.transaction {
            Some(tx) if env.success => {
                if tx.state == till_core::TransactionState::EndOfTransaction {
                    self.ctx.set_current(None);
                    Ok(ToolReply::new(format!(
                        "Payment complete. Change due {}.",
                        self.ctx.format(tx.change_due)
                    )))
                } else {
                    Ok(ToolReply::new(format!(
                        "Partial payment accepted. Balance due {}.",
                        self.ctx.format(tx.balance_due)
                    )))
                }
            }
            _ => Ok(ToolReply::new(envelope_errors(&env))),
        }
    }
}

// =============================================================================
// show
// =============================================================================

struct ShowTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for ShowTool {
    async fn handle(&self, _args: ToolArgs) -> ToolResult<ToolReply> {
        let Some(tx_id) = self.ctx.current_transaction() else {
            return Ok(ToolReply::new("No open transaction."));
        };
        let env = self
            .ctx
            .client
            .get_transaction(&self.ctx.session, &tx_id)
            .await;
        match env.transaction {
            Some(tx) if env.success => Ok(ToolReply::new(render_receipt(&tx, &self.ctx))),
            _ => Ok(ToolReply::new(envelope_errors(&env))),
        }
    }
}

fn render_receipt(tx: &Transaction, ctx: &ToolContext) -> String {
    let mut out = format!("Transaction {} [{}]\n", tx.id, tx.state);
    for line in &tx.lines {
        let indent = "  ".repeat(line.display_indent_level as usize + 1);
        let label = match line.line_type {
            LineType::Item => line
                .product_name
                .clone()
                .unwrap_or_else(|| line.product_id.to_string()),
            LineType::Tender => format!(
                "tender ({})",
                line.tender_type.as_deref().unwrap_or("unknown")
            ),
            LineType::Change => "change".to_string(),
        };
        let voided = if line.is_voided { " (voided)" } else { "" };
        out.push_str(&format!(
            "{}{} x{}  {}{}\n",
            indent,
            label,
            line.quantity,
            ctx.format(line.extended.amount),
            voided
        ));
    }
    out.push_str(&format!(
        "TOTAL {}  TENDERED {}  CHANGE {}  BALANCE {}",
        ctx.format(tx.total),
        ctx.format(tx.tendered),
        ctx.format(tx.change_due),
        ctx.format(tx.balance_due)
    ));
    out
}

// =============================================================================
// void_item
// =============================================================================

struct VoidItemTool {
    ctx: Arc<ToolContext>,
}

#[async_trait]
impl ToolHandler for VoidItemTool {
    async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply> {
        let Some(tx_id) = self.ctx.current_transaction() else {
            return Ok(ToolReply::new(
                "error: no open transaction; run start_transaction first",
            ));
        };
        let line_id = LineItemId::new(args.text("line_item_id").unwrap_or_default());
        let reason = args.text("reason").map(str::to_string);

        let env = self
            .ctx
            .client
            .void_line_item(&self.ctx.session, &tx_id, &line_id, reason.as_deref())
            .await;

        match env.transaction {
            Some(tx) if env.success => Ok(ToolReply::new(format!(
                "Voided line {}. Total now {}.",
                line_id,
                self.ctx.format(tx.total)
            ))),
            _ => Ok(ToolReply::new(envelope_errors(&env))),
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registers the reference tool catalog against one terminal context.
pub fn register_reference_tools(executor: &mut ToolExecutor, ctx: Arc<ToolContext>) {
    executor.register(
        ToolDefinition::new("start_transaction", "transaction", "Begin a new transaction")
            .with_parameter(ToolParameter::required(
                "currency",
                ParamType::String,
                "3-letter ISO currency code",
            )),
        Arc::new(StartTransactionTool { ctx: ctx.clone() }),
    );

    executor.register(
        ToolDefinition::new("add_item", "transaction", "Ring up a product")
            .with_parameter(ToolParameter::required(
                "product_id",
                ParamType::String,
                "Catalog SKU",
            ))
            .with_parameter(ToolParameter::required(
                "quantity",
                ParamType::Int,
                "Units to add",
            ))
            .with_parameter(ToolParameter::optional(
                "modifiers",
                ParamType::String,
                "Comma-separated modifier ids, rung as child lines",
            )),
        Arc::new(AddItemTool { ctx: ctx.clone() }),
    );

    executor.register(
        ToolDefinition::new("pay", "payment", "Apply a tender to the open transaction")
            .with_parameter(ToolParameter::required(
                "amount",
                ParamType::Decimal,
                "Amount tendered",
            ))
            .with_parameter(ToolParameter::optional(
                "tender",
                ParamType::String,
                "Tender type (defaults to cash)",
            )),
        Arc::new(PayTool { ctx: ctx.clone() }),
    );

    executor.register(
        ToolDefinition::new("show", "display", "Show the open transaction"),
        Arc::new(ShowTool { ctx: ctx.clone() }),
    );

    executor.register(
        ToolDefinition::new("void_item", "transaction", "Void a line and its children")
            .with_parameter(ToolParameter::required(
                "line_item_id",
                ParamType::String,
                "Stable line identity",
            ))
            .with_parameter(ToolParameter::optional(
                "reason",
                ParamType::String,
                "Void reason",
            )),
        Arc::new(VoidItemTool { ctx }),
    );
}

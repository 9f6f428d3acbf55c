use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{
    Actor, Collection, ContributionCmd, EngineError, ExpenseCmd, LogEntry, Notification,
    ResultEngine, SettleCmd, Transaction, TransactionDetail, TransactionKind, TransactionUpdate,
    transactions,
    util::{category_key, normalize_category_display, normalize_optional_text, require_positive},
};

use super::{
    Changes, Engine, access::require_admin, audit, investors::require_investor, load_settings,
    load_transactions, with_tx,
};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    /// Only contributions and settlements of this investor.
    pub investor_id: Option<Uuid>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidPayload(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidPayload(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(investor_id) = filter.investor_id {
            self = self.filter(transactions::Column::InvestorId.eq(investor_id));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

/// Resolves a category to its configured spelling when an equivalent one
/// exists (case and accents ignored), otherwise keeps the normalized input.
async fn resolve_category(db_tx: &DatabaseTransaction, input: &str) -> ResultEngine<String> {
    let display = normalize_category_display(input)?;
    let key = category_key(&display);
    let settings = load_settings(db_tx).await?;
    Ok(settings
        .expense_categories
        .list
        .into_iter()
        .find(|configured| category_key(configured) == key)
        .unwrap_or(display))
}

async fn require_transaction(
    db_tx: &DatabaseTransaction,
    transaction_id: Uuid,
) -> ResultEngine<Transaction> {
    let model = transactions::Entity::find_by_id(transaction_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
    Transaction::try_from(model)
}

/// Inserts a transaction and its audit row.
pub(super) async fn insert_transaction(
    db_tx: &DatabaseTransaction,
    actor: &Actor,
    tx: &Transaction,
    log_kind: &str,
    message: String,
    notification: Option<&Notification>,
) -> ResultEngine<Changes> {
    transactions::ActiveModel::from(tx).insert(db_tx).await?;

    let mut changes = Changes::default();
    changes.created(Collection::Transactions, tx.id);
    let log = LogEntry::new(log_kind, message, &actor.email, serde_json::to_value(tx)?);
    audit::record(db_tx, &log, notification, &mut changes).await?;
    Ok(changes)
}

impl Engine {
    /// Every transaction, oldest first.
    pub async fn transactions(&self) -> ResultEngine<Vec<Transaction>> {
        load_transactions(&self.database).await
    }

    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| require_transaction(&db_tx, transaction_id).await)
    }

    /// Lists transactions with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`.
    pub async fn list_transactions_page(
        &self,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;

        with_tx!(self, |db_tx| {
            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
            for tx_model in rows.into_iter().take(limit as usize) {
                out.push(Transaction::try_from(tx_model)?);
            }

            let next_cursor = out.last().map(|tx| TransactionsCursor {
                occurred_at: tx.occurred_at,
                transaction_id: tx.id,
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Records a shared expense and notifies the investors.
    pub async fn add_expense(&self, actor: &Actor, cmd: ExpenseCmd) -> ResultEngine<Uuid> {
        require_admin(actor, "add expense")?;
        require_positive(cmd.amount, "expense amount")?;
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let (id, changes) = with_tx!(self, |db_tx| {
            let category = resolve_category(&db_tx, &cmd.category).await?;
            let tx = Transaction::new(
                TransactionDetail::Expense {
                    category: category.clone(),
                },
                cmd.amount,
                note,
                cmd.meta.occurred_at,
                actor.email.clone(),
            )?;
            let notification = Notification::all_investors(
                "notifications.expense.title",
                "notifications.expense.message",
                json!({ "amount": tx.amount, "category": category }),
            );
            let changes = insert_transaction(
                &db_tx,
                actor,
                &tx,
                "expense",
                format!("Expense of {} ({category})", tx.amount),
                Some(&notification),
            )
            .await?;
            Ok((tx.id, changes))
        })?;

        tracing::info!(transaction_id = %id, "expense added");
        self.publish(changes);
        Ok(id)
    }

    /// Credits cash brought into the fund by one investor.
    pub async fn add_contribution(
        &self,
        actor: &Actor,
        cmd: ContributionCmd,
    ) -> ResultEngine<Uuid> {
        require_admin(actor, "add contribution")?;
        require_positive(cmd.amount, "contribution amount")?;
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let (id, changes) = with_tx!(self, |db_tx| {
            let investor = require_investor(&db_tx, cmd.investor_id).await?;
            let tx = Transaction::new(
                TransactionDetail::Contribution {
                    investor_id: investor.id,
                    investor_name: investor.name.clone(),
                    automated: None,
                },
                cmd.amount,
                note,
                cmd.meta.occurred_at,
                actor.email.clone(),
            )?;
            let changes = insert_transaction(
                &db_tx,
                actor,
                &tx,
                "contribution",
                format!("Contribution of {} by {}", tx.amount, investor.name),
                None,
            )
            .await?;
            Ok((tx.id, changes))
        })?;

        tracing::info!(transaction_id = %id, "contribution added");
        self.publish(changes);
        Ok(id)
    }

    /// Moves cash between one investor and the fund.
    pub async fn settle(&self, actor: &Actor, cmd: SettleCmd) -> ResultEngine<Uuid> {
        require_admin(actor, "settle")?;
        require_positive(cmd.amount, "settlement amount")?;
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let (id, changes) = with_tx!(self, |db_tx| {
            let investor = require_investor(&db_tx, cmd.investor_id).await?;
            let tx = Transaction::new(
                TransactionDetail::Settlement {
                    investor_id: investor.id,
                    investor_name: investor.name.clone(),
                    settlement_type: cmd.settlement_type,
                    automated: None,
                },
                cmd.amount,
                note,
                cmd.meta.occurred_at,
                actor.email.clone(),
            )?;
            let changes = insert_transaction(
                &db_tx,
                actor,
                &tx,
                "settlement",
                format!(
                    "Settlement {} of {} with {}",
                    cmd.settlement_type.as_str(),
                    tx.amount,
                    investor.name
                ),
                None,
            )
            .await?;
            Ok((tx.id, changes))
        })?;

        tracing::info!(transaction_id = %id, "settlement added");
        self.publish(changes);
        Ok(id)
    }

    /// Overwrites fields of a stored transaction. The kind never changes.
    ///
    /// An empty `note` clears it.
    pub async fn edit_transaction(
        &self,
        actor: &Actor,
        transaction_id: Uuid,
        update: TransactionUpdate,
    ) -> ResultEngine<Transaction> {
        require_admin(actor, "edit transaction")?;
        if let Some(amount) = update.amount {
            require_positive(amount, "amount")?;
        }

        let (tx, changes) = with_tx!(self, |db_tx| {
            let mut tx = require_transaction(&db_tx, transaction_id).await?;
            let before = serde_json::to_value(&tx)?;

            if let Some(amount) = update.amount {
                tx.amount = amount;
            }
            if let Some(note) = update.note.as_deref() {
                tx.note = normalize_optional_text(Some(note));
            }
            if let Some(occurred_at) = update.occurred_at {
                tx.occurred_at = occurred_at;
            }
            if let Some(new_category) = update.category.as_deref() {
                let resolved = resolve_category(&db_tx, new_category).await?;
                match &mut tx.detail {
                    TransactionDetail::Expense { category } => *category = resolved,
                    _ => {
                        return Err(EngineError::InvalidPayload(
                            "only expenses have a category".to_string(),
                        ));
                    }
                }
            }
            if let Some(new_investor) = update.investor_id {
                let investor = require_investor(&db_tx, new_investor).await?;
                match &mut tx.detail {
                    TransactionDetail::Contribution {
                        investor_id,
                        investor_name,
                        ..
                    }
                    | TransactionDetail::Settlement {
                        investor_id,
                        investor_name,
                        ..
                    } => {
                        *investor_id = investor.id;
                        *investor_name = investor.name;
                    }
                    TransactionDetail::Expense { .. } => {
                        return Err(EngineError::InvalidPayload(
                            "expenses are not tied to an investor".to_string(),
                        ));
                    }
                }
            }

            transactions::ActiveModel::from(&tx).update(&db_tx).await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Transactions, Some(tx.id));
            let log = LogEntry::new(
                "transaction_edit",
                format!("Edited {} of {}", tx.kind().as_str(), tx.amount),
                &actor.email,
                json!({ "before": before, "after": serde_json::to_value(&tx)? }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok((tx, changes))
        })?;

        tracing::info!(transaction_id = %tx.id, "transaction edited");
        self.publish(changes);
        Ok(tx)
    }

    /// Hard-deletes a transaction.
    pub async fn delete_transaction(&self, actor: &Actor, transaction_id: Uuid) -> ResultEngine<()> {
        require_admin(actor, "delete transaction")?;

        let changes = with_tx!(self, |db_tx| {
            let tx = require_transaction(&db_tx, transaction_id).await?;
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;

            let mut changes = Changes::default();
            changes.deleted(Collection::Transactions, transaction_id);
            let log = LogEntry::new(
                "transaction_delete",
                format!("Deleted {} of {}", tx.kind().as_str(), tx.amount),
                &actor.email,
                serde_json::to_value(&tx)?,
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%transaction_id, "transaction deleted");
        self.publish(changes);
        Ok(())
    }
}

use std::collections::HashSet;

use sea_orm::{ActiveModelTrait, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Actor, Automation, Collection, Debt, DebtNew, DebtPayment, DebtPaymentCmd, EngineError,
    LogEntry, Notification, PaymentSource, ResultEngine, Transaction,
    TransactionDetail, debt_payments, debts,
    debts::validate_split,
    transactions,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{
    Changes, Engine, access::require_admin, audit, investors::require_investor, load_debts,
    with_tx,
};

/// Category of the fund expense generated by a debt payment.
const DEBT_PAYMENT_CATEGORY: &str = "debt_payment";

async fn require_debt(db_tx: &DatabaseTransaction, debt_id: Uuid) -> ResultEngine<Debt> {
    let model = debts::Entity::find_by_id(debt_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("debt not exists".to_string()))?;
    let payments = debt_payments::Entity::find()
        .filter(debt_payments::Column::DebtId.eq(debt_id))
        .all(db_tx)
        .await?;
    Debt::try_from((model, payments))
}

impl Engine {
    /// All debts with their payment history, oldest first.
    pub async fn debts(&self) -> ResultEngine<Vec<Debt>> {
        load_debts(&self.database).await
    }

    pub async fn debt(&self, debt_id: Uuid) -> ResultEngine<Debt> {
        with_tx!(self, |db_tx| require_debt(&db_tx, debt_id).await)
    }

    pub async fn create_debt(&self, actor: &Actor, cmd: DebtNew) -> ResultEngine<Uuid> {
        require_admin(actor, "create debt")?;
        let creditor = normalize_required_name(&cmd.creditor_name, "creditor")?;
        let debt = Debt::new(
            creditor,
            cmd.total_amount,
            cmd.deduct_from_fund,
            normalize_optional_text(cmd.meta.note.as_deref()),
            cmd.meta.occurred_at,
        )?;

        let changes = with_tx!(self, |db_tx| {
            debts::ActiveModel::from(&debt).insert(&db_tx).await?;

            let mut changes = Changes::default();
            changes.created(Collection::Debts, debt.id);
            let log = LogEntry::new(
                "debt",
                format!("Debt of {} towards {}", debt.total_amount, debt.creditor_name),
                &actor.email,
                json!({
                    "debtId": debt.id,
                    "total": debt.total_amount,
                    "deductFromFund": debt.deduct_from_fund,
                }),
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(debt_id = %debt.id, "debt created");
        self.publish(changes);
        Ok(debt.id)
    }

    /// Pays (part of) a debt.
    ///
    /// When the debt is deducted from the fund, the payment also enters the
    /// ledger as one `debt_payment` expense. An `investors` payment adds one
    /// automated contribution per investor share, offsetting that expense.
    /// Returns the payment id.
    pub async fn record_payment(&self, actor: &Actor, cmd: DebtPaymentCmd) -> ResultEngine<Uuid> {
        require_admin(actor, "record debt payment")?;
        match cmd.source {
            PaymentSource::Fund => {}
            PaymentSource::Investors => {
                validate_split(cmd.amount, &cmd.investor_payments)?;
                let mut seen = HashSet::new();
                if !cmd
                    .investor_payments
                    .iter()
                    .all(|p| seen.insert(p.investor_id))
                {
                    return Err(EngineError::SplitMismatch(
                        "an investor appears twice in the split".to_string(),
                    ));
                }
            }
        }
        let note = normalize_optional_text(cmd.meta.note.as_deref());

        let (payment_id, changes) = with_tx!(self, |db_tx| {
            let mut debt = require_debt(&db_tx, cmd.debt_id).await?;
            debt.apply_payment(cmd.amount)?;

            let investor_payments = match cmd.source {
                PaymentSource::Fund => Vec::new(),
                PaymentSource::Investors => cmd.investor_payments.clone(),
            };
            let mut payers = Vec::with_capacity(investor_payments.len());
            for share in &investor_payments {
                payers.push((require_investor(&db_tx, share.investor_id).await?, share.amount));
            }

            let payment = DebtPayment {
                id: Uuid::new_v4(),
                amount: cmd.amount,
                source: cmd.source,
                investor_payments,
                note: note.clone(),
                paid_at: cmd.meta.occurred_at,
                recorded_by: actor.email.clone(),
            };
            debts::ActiveModel::from(&debt).update(&db_tx).await?;
            debt_payments::ActiveModel::try_from((debt.id, &payment))?
                .insert(&db_tx)
                .await?;

            let mut changes = Changes::default();
            changes.updated(Collection::Debts, Some(debt.id));

            if debt.deduct_from_fund {
                let description = format!("Debt payment to {}", debt.creditor_name);
                let automation = Automation {
                    related_debt_id: Some(debt.id),
                    ..Default::default()
                };
                let mut generated = vec![Transaction::new(
                    TransactionDetail::Expense {
                        category: DEBT_PAYMENT_CATEGORY.to_string(),
                    },
                    payment.amount,
                    Some(description.clone()),
                    payment.paid_at,
                    actor.email.clone(),
                )?];
                for (investor, amount) in payers {
                    generated.push(Transaction::new(
                        TransactionDetail::Contribution {
                            investor_id: investor.id,
                            investor_name: investor.name,
                            automated: Some(automation.clone()),
                        },
                        amount,
                        Some(description.clone()),
                        payment.paid_at,
                        actor.email.clone(),
                    )?);
                }
                for tx in &generated {
                    transactions::ActiveModel::from(tx).insert(&db_tx).await?;
                    changes.created(Collection::Transactions, tx.id);
                }
            }

            let log = LogEntry::new(
                "debt_payment",
                format!(
                    "Paid {} to {} ({} remaining)",
                    payment.amount, debt.creditor_name, debt.remaining_amount
                ),
                &actor.email,
                json!({
                    "debtId": debt.id,
                    "payment": payment,
                    "status": debt.status,
                }),
            );
            let notification = Notification::all_investors(
                "notifications.debt_payment.title",
                "notifications.debt_payment.message",
                json!({
                    "creditor": debt.creditor_name,
                    "amount": payment.amount,
                    "remaining": debt.remaining_amount,
                }),
            );
            audit::record(&db_tx, &log, Some(&notification), &mut changes).await?;
            Ok((payment.id, changes))
        })?;

        tracing::info!(debt_id = %cmd.debt_id, %payment_id, "debt payment recorded");
        self.publish(changes);
        Ok(payment_id)
    }

    /// Hard-deletes a debt with its payment history. Ledger transactions
    /// generated by its payments stay.
    pub async fn delete_debt(&self, actor: &Actor, debt_id: Uuid) -> ResultEngine<()> {
        require_admin(actor, "delete debt")?;

        let changes = with_tx!(self, |db_tx| {
            let debt = require_debt(&db_tx, debt_id).await?;
            debt_payments::Entity::delete_many()
                .filter(debt_payments::Column::DebtId.eq(debt_id))
                .exec(&db_tx)
                .await?;
            debts::Entity::delete_by_id(debt_id).exec(&db_tx).await?;

            let mut changes = Changes::default();
            changes.deleted(Collection::Debts, debt_id);
            let log = LogEntry::new(
                "debt_delete",
                format!("Deleted debt towards {}", debt.creditor_name),
                &actor.email,
                serde_json::to_value(&debt)?,
            );
            audit::record(&db_tx, &log, None, &mut changes).await?;
            Ok(changes)
        })?;

        tracing::info!(%debt_id, "debt deleted");
        self.publish(changes);
        Ok(())
    }
}

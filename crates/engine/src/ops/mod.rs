use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    ChangeEvent, ChangeKind, Collection, Debt, EggRecord, EngineError, Investor, LedgerSnapshot,
    ResultEngine, Settings, Subscription, Transaction, debt_payments, egg_deliveries,
    events::ChangeBus,
};

mod access;
mod audit;
mod backup;
mod debts;
mod eggs;
mod investors;
mod settings;
mod transactions;

pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    bus: ChangeBus,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Subscribes to changes of the given collections (all of them when
    /// empty). Events are published once the write has been committed.
    pub fn subscribe(&self, collections: &[Collection]) -> Subscription {
        self.bus.subscribe(collections)
    }

    /// Recomputes the ledger from the full stored history.
    pub async fn snapshot(&self) -> ResultEngine<LedgerSnapshot> {
        with_tx!(self, |db_tx| {
            let investors = load_investors(&db_tx).await?;
            let transactions = load_transactions(&db_tx).await?;
            let eggs = load_eggs(&db_tx).await?;
            let settings = load_settings(&db_tx).await?;
            Ok(LedgerSnapshot::compute(
                &investors,
                &transactions,
                &eggs,
                &settings,
            ))
        })
    }

    fn publish(&self, changes: Changes) {
        self.bus.publish(changes.0);
    }
}

/// Change events collected while a write runs, published after commit.
#[derive(Debug, Default)]
pub(super) struct Changes(Vec<ChangeEvent>);

impl Changes {
    fn push(&mut self, collection: Collection, kind: ChangeKind, id: Option<Uuid>) {
        self.0.push(ChangeEvent::new(collection, kind, id));
    }

    pub(super) fn created(&mut self, collection: Collection, id: Uuid) {
        self.push(collection, ChangeKind::Created, Some(id));
    }

    pub(super) fn updated(&mut self, collection: Collection, id: Option<Uuid>) {
        self.push(collection, ChangeKind::Updated, id);
    }

    pub(super) fn deleted(&mut self, collection: Collection, id: Uuid) {
        self.push(collection, ChangeKind::Deleted, Some(id));
    }

    pub(super) fn replaced(&mut self, collection: Collection) {
        self.push(collection, ChangeKind::Replaced, None);
    }
}

pub(super) async fn load_investors<C: ConnectionTrait>(db: &C) -> ResultEngine<Vec<Investor>> {
    crate::investors::Entity::find()
        .order_by_asc(crate::investors::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Investor::try_from)
        .collect()
}

pub(super) async fn load_transactions<C: ConnectionTrait>(
    db: &C,
) -> ResultEngine<Vec<Transaction>> {
    crate::transactions::Entity::find()
        .order_by_asc(crate::transactions::Column::OccurredAt)
        .order_by_asc(crate::transactions::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
}

pub(super) async fn load_eggs<C: ConnectionTrait>(db: &C) -> ResultEngine<Vec<EggRecord>> {
    crate::eggs::Entity::find()
        .order_by_asc(crate::eggs::Column::OccurredAt)
        .find_with_related(egg_deliveries::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(EggRecord::try_from)
        .collect()
}

pub(super) async fn load_egg<C: ConnectionTrait>(db: &C, egg_id: Uuid) -> ResultEngine<EggRecord> {
    let model = crate::eggs::Entity::find_by_id(egg_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("egg record not exists".to_string()))?;
    let deliveries = egg_deliveries::Entity::find()
        .filter(egg_deliveries::Column::EggId.eq(egg_id))
        .all(db)
        .await?;
    EggRecord::try_from((model, deliveries))
}

pub(super) async fn load_debts<C: ConnectionTrait>(db: &C) -> ResultEngine<Vec<Debt>> {
    let mut out = crate::debts::Entity::find()
        .order_by_asc(crate::debts::Column::OccurredAt)
        .find_with_related(debt_payments::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(Debt::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    for debt in &mut out {
        debt.payments.sort_by_key(|p| p.paid_at);
    }
    Ok(out)
}

/// Reads both settings documents; a missing key yields its default.
pub(super) async fn load_settings<C: ConnectionTrait>(db: &C) -> ResultEngine<Settings> {
    let mut out = Settings::default();
    for model in crate::settings::Entity::find().all(db).await? {
        match model.key.as_str() {
            crate::settings::EXPENSE_CATEGORIES_KEY => {
                out.expense_categories = serde_json::from_str(&model.value)?;
            }
            crate::settings::FAMILY_SETTINGS_KEY => {
                out.family_settings = serde_json::from_str(&model.value)?;
            }
            other => tracing::warn!(key = other, "ignoring unknown settings key"),
        }
    }
    Ok(out)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            bus: ChangeBus::default(),
        })
    }
}

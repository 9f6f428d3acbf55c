use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};

use engine::{
    Actor, Collection, ContributionCmd, DeliveryStatus, EggsCmd, Engine, EngineError, ErrorKind,
    ExpenseCmd, Family, InvestorNew, MoneyCents, Role, SettleCmd, SettlementType,
    TransactionDetail, TransactionKind, TransactionListFilter, TransactionUpdate, User,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn root() -> Actor {
    Actor::new("root@farm", Role::SuperAdmin)
}

fn admin() -> Actor {
    Actor::new("ops@farm", Role::Admin)
}

fn member() -> Actor {
    Actor::new("ada@farm", Role::Investor)
}

async fn new_investor(engine: &Engine, name: &str, capital: i64) -> Uuid {
    engine
        .create_investor(&admin(), InvestorNew::new(name, MoneyCents::new(capital)))
        .await
        .unwrap()
}

fn family(id: &str, members: &[Uuid]) -> Family {
    Family {
        id: id.to_string(),
        name: id.to_uppercase(),
        icon: String::new(),
        member_count: members.len(),
        investor_ids: members.to_vec(),
    }
}

#[tokio::test]
async fn non_admin_writes_are_denied_before_anything_is_written() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let expense_id = engine
        .add_expense(
            &admin(),
            ExpenseCmd::new(MoneyCents::new(2_000), "feed", Utc::now()),
        )
        .await
        .unwrap();
    let logs_before = engine.logs(100).await.unwrap().len();

    let err = engine
        .add_expense(
            &member(),
            ExpenseCmd::new(MoneyCents::new(1_000), "feed", Utc::now()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = engine
        .settle(
            &member(),
            SettleCmd::new(a, MoneyCents::new(1_000), SettlementType::Pay, Utc::now()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .set_capital(&member(), a, MoneyCents::new(999_999))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .delete_transaction(&member(), expense_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine.delete_investor(&admin(), a).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let transactions = engine.transactions().await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].id, expense_id);
    assert_eq!(transactions[0].amount, MoneyCents::new(2_000));
    let investor = engine.investor(a).await.unwrap();
    assert_eq!(investor.initial_capital, MoneyCents::new(100_000));
    assert_eq!(investor.current_capital, MoneyCents::new(100_000));
    assert_eq!(engine.investors().await.unwrap().len(), 1);
    assert_eq!(engine.logs(100).await.unwrap().len(), logs_before);
}

#[tokio::test]
async fn snapshot_folds_the_whole_history() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 200_000).await;
    let now = Utc::now();

    engine
        .add_expense(&admin(), ExpenseCmd::new(MoneyCents::new(50_000), "feed", now))
        .await
        .unwrap();
    engine
        .add_contribution(&admin(), ContributionCmd::new(a, MoneyCents::new(20_000), now))
        .await
        .unwrap();
    engine
        .settle(
            &admin(),
            SettleCmd::new(a, MoneyCents::new(5_000), SettlementType::Pay, now),
        )
        .await
        .unwrap();
    engine
        .settle(
            &admin(),
            SettleCmd::new(b, MoneyCents::new(10_000), SettlementType::Receive, now),
        )
        .await
        .unwrap();

    let snapshot = engine.snapshot().await.unwrap();
    assert_eq!(snapshot.fund_balance, MoneyCents::new(265_000));
    assert_eq!(snapshot.fund_balance.to_string(), "2650.00");
    assert_eq!(
        snapshot.investor(a).unwrap().balance,
        MoneyCents::new(100_000)
    );
    assert_eq!(
        snapshot.investor(b).unwrap().balance,
        MoneyCents::new(165_000)
    );
    assert_eq!(snapshot, engine.snapshot().await.unwrap());
}

#[tokio::test]
async fn set_capital_rewrites_both_capitals() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;

    engine
        .set_capital(&admin(), a, MoneyCents::new(250_000))
        .await
        .unwrap();
    let investor = engine.investor(a).await.unwrap();
    assert_eq!(investor.initial_capital, MoneyCents::new(250_000));
    assert_eq!(investor.current_capital, MoneyCents::new(250_000));

    let err = engine
        .set_capital(&admin(), Uuid::new_v4(), MoneyCents::new(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let logs = engine.logs(10).await.unwrap();
    assert_eq!(logs[0].kind, "capital");
}

#[tokio::test]
async fn contribution_requires_known_investor() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .add_contribution(
            &admin(),
            ContributionCmd::new(Uuid::new_v4(), MoneyCents::new(1_000), Utc::now()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(engine.transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn expense_category_follows_configured_spelling() {
    let (engine, _db) = engine_with_db().await;
    engine
        .set_expense_categories(
            &admin(),
            vec!["Mangime".to_string(), " mangime ".to_string(), "Veterinario".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(
        engine.settings().await.unwrap().expense_categories.list,
        vec!["Mangime", "Veterinario"]
    );

    let id = engine
        .add_expense(
            &admin(),
            ExpenseCmd::new(MoneyCents::new(1_000), "  MANGIME ", Utc::now()),
        )
        .await
        .unwrap();
    let tx = engine.transaction(id).await.unwrap();
    assert_eq!(
        tx.detail,
        TransactionDetail::Expense {
            category: "Mangime".to_string()
        }
    );

    let notifications = engine.notifications(10).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title_key, "notifications.expense.title");
}

#[tokio::test]
async fn edit_and_delete_transactions() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;

    let id = engine
        .add_contribution(
            &admin(),
            ContributionCmd::new(a, MoneyCents::new(1_000), Utc::now()).note("first"),
        )
        .await
        .unwrap();

    let edited = engine
        .edit_transaction(
            &admin(),
            id,
            TransactionUpdate::default()
                .amount(MoneyCents::new(2_500))
                .investor_id(b)
                .note(""),
        )
        .await
        .unwrap();
    assert_eq!(edited.amount, MoneyCents::new(2_500));
    assert_eq!(edited.note, None);
    assert_eq!(edited.detail.investor_id(), Some(b));
    assert_eq!(engine.transaction(id).await.unwrap(), edited);

    let err = engine
        .edit_transaction(
            &admin(),
            id,
            TransactionUpdate::default().category("feed"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPayload(_)));

    let err = engine
        .edit_transaction(
            &admin(),
            Uuid::new_v4(),
            TransactionUpdate::default().amount(MoneyCents::new(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    engine.delete_transaction(&admin(), id).await.unwrap();
    assert!(engine.transactions().await.unwrap().is_empty());
    let err = engine.delete_transaction(&admin(), id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn list_transactions_pages_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let base = Utc::now();

    let mut ids = Vec::new();
    for day in 0..5 {
        let id = engine
            .add_expense(
                &admin(),
                ExpenseCmd::new(MoneyCents::new(100 + day), "feed", base + Duration::days(day)),
            )
            .await
            .unwrap();
        ids.push(id);
    }
    engine
        .add_contribution(&admin(), ContributionCmd::new(a, MoneyCents::new(1_000), base))
        .await
        .unwrap();

    let filter = TransactionListFilter {
        kinds: Some(vec![TransactionKind::Expense]),
        ..Default::default()
    };
    let (first, cursor) = engine
        .list_transactions_page(2, None, &filter)
        .await
        .unwrap();
    assert_eq!(
        first.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![ids[4], ids[3]]
    );
    let cursor = cursor.unwrap();

    let (second, cursor) = engine
        .list_transactions_page(2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(
        second.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );

    let (last, cursor) = engine
        .list_transactions_page(2, cursor.as_deref(), &filter)
        .await
        .unwrap();
    assert_eq!(last.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[0]]);
    assert!(cursor.is_none());

    let err = engine
        .list_transactions_page(2, Some("not-a-cursor"), &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn families_must_match_member_count() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;

    let mut short = family("f1", &[a]);
    short.member_count = 2;
    let err = engine.save_families(&admin(), vec![short]).await.unwrap_err();
    assert!(matches!(err, EngineError::MemberCountMismatch(_)));

    let err = engine
        .save_families(&admin(), vec![family("f1", &[a]), family("f2", &[a, b])])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.settings().await.unwrap().families().is_empty());

    engine
        .set_egg_price(&admin(), MoneyCents::new(1_000))
        .await
        .unwrap();
    let saved = engine
        .save_families(&admin(), vec![family("f1", &[a]), family("f2", &[b])])
        .await
        .unwrap();
    assert_eq!(saved.list.len(), 2);
    assert_eq!(saved.egg_price, MoneyCents::new(1_000));
}

#[tokio::test]
async fn rejected_delivery_becomes_member_contributions() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;
    let c = new_investor(&engine, "C", 100_000).await;
    let d = new_investor(&engine, "D", 100_000).await;
    engine
        .save_families(
            &admin(),
            vec![family("f1", &[a, b]), family("f2", &[c]), family("f3", &[d])],
        )
        .await
        .unwrap();
    engine
        .set_egg_price(&admin(), MoneyCents::new(1_000))
        .await
        .unwrap();

    // any authenticated actor can record production
    let egg_id = engine
        .add_eggs(&member(), EggsCmd::new(100, Utc::now()))
        .await
        .unwrap();
    let record = engine.egg(egg_id).await.unwrap();
    assert_eq!(record.family_count_at_production, 3);
    assert_eq!(record.deliveries.len(), 3);

    let err = engine
        .reject_delivery(&member(), egg_id, "f1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let ids = engine.reject_delivery(&admin(), egg_id, "f1").await.unwrap();
    assert_eq!(ids.len(), 2);

    let generated: Vec<_> = engine
        .transactions()
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.is_automated())
        .collect();
    assert_eq!(generated.len(), 2);
    for tx in &generated {
        assert_eq!(tx.amount, MoneyCents::new(16_500));
        assert_eq!(tx.kind(), TransactionKind::Contribution);
    }
    let credited: Vec<_> = generated
        .iter()
        .filter_map(|tx| tx.detail.investor_id())
        .collect();
    assert!(credited.contains(&a) && credited.contains(&b));

    let record = engine.egg(egg_id).await.unwrap();
    match &record.deliveries["f1"].status {
        DeliveryStatus::Rejected {
            egg_price,
            cash_value,
            ..
        } => {
            assert_eq!(*egg_price, MoneyCents::new(1_000));
            assert_eq!(*cash_value, MoneyCents::new(33_000));
        }
        other => panic!("unexpected status {other:?}"),
    }

    // terminal states do not move
    let err = engine
        .reject_delivery(&admin(), egg_id, "f1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    assert_eq!(engine.transactions().await.unwrap().len(), 2);

    engine.confirm_delivery(&admin(), egg_id, "f2").await.unwrap();
    let err = engine
        .confirm_delivery(&admin(), egg_id, "f2")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let snapshot = engine.snapshot().await.unwrap();
    let f1 = snapshot.family("f1").unwrap();
    assert_eq!(f1.eggs_rejected, 33);
    assert_eq!(f1.rejected_cash, MoneyCents::new(33_000));
    assert_eq!(snapshot.family("f2").unwrap().eggs_received, 33);
    assert_eq!(snapshot.family("f3").unwrap().eggs_pending, 33);
    assert_eq!(
        snapshot.investor(a).unwrap().contributions,
        MoneyCents::new(16_500)
    );

    let logs = engine.logs(50).await.unwrap();
    assert!(logs.iter().any(|log| log.kind == "delivery_rejected"));
}

#[tokio::test]
async fn zero_price_rejection_generates_no_contributions() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    engine
        .save_families(&admin(), vec![family("f1", &[a])])
        .await
        .unwrap();

    let egg_id = engine
        .add_eggs(&admin(), EggsCmd::new(12, Utc::now()))
        .await
        .unwrap();
    let ids = engine.reject_delivery(&admin(), egg_id, "f1").await.unwrap();
    assert!(ids.is_empty());
    assert!(engine.transactions().await.unwrap().is_empty());

    let record = engine.egg(egg_id).await.unwrap();
    assert!(matches!(
        record.deliveries["f1"].status,
        DeliveryStatus::Rejected { cash_value, .. } if cash_value.is_zero()
    ));
}

#[tokio::test]
async fn eggs_for_unknown_family_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .add_eggs(
            &admin(),
            EggsCmd::new(10, Utc::now()).families(vec!["ghost".to_string()]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .add_eggs(&admin(), EggsCmd::new(0, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert!(engine.eggs().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_egg_removes_batch_and_deliveries() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    engine
        .save_families(&admin(), vec![family("f1", &[a])])
        .await
        .unwrap();
    let egg_id = engine
        .add_eggs(&admin(), EggsCmd::new(10, Utc::now()))
        .await
        .unwrap();

    engine.delete_egg(&admin(), egg_id).await.unwrap();
    assert!(engine.eggs().await.unwrap().is_empty());
    let err = engine.egg(egg_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn subscribers_see_committed_writes_only() {
    let (engine, _db) = engine_with_db().await;
    let mut transactions = engine.subscribe(&[Collection::Transactions]);
    let a = new_investor(&engine, "A", 100_000).await;
    assert!(transactions.try_next().is_none());

    let id = engine
        .add_contribution(&admin(), ContributionCmd::new(a, MoneyCents::new(500), Utc::now()))
        .await
        .unwrap();
    let event = transactions.try_next().unwrap();
    assert_eq!(event.collection, Collection::Transactions);
    assert_eq!(event.id, Some(id));

    let _ = engine
        .add_contribution(
            &admin(),
            ContributionCmd::new(Uuid::new_v4(), MoneyCents::new(500), Utc::now()),
        )
        .await;
    assert!(transactions.try_next().is_none());
}

#[tokio::test]
async fn users_resolve_to_actors() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;

    engine
        .create_user(
            &root(),
            User {
                email: "Ada@Farm".to_string(),
                password: "secret".to_string(),
                role: Role::Investor,
                investor_id: Some(a),
            },
        )
        .await
        .unwrap();

    let actor = engine
        .authenticate("ada@farm", "secret")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(actor.investor_id, Some(a));
    assert!(!actor.is_admin());
    assert!(
        engine
            .authenticate("ada@farm", "wrong")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(engine.resolve_actor("ada@farm").await.unwrap(), actor);

    let err = engine
        .create_user(
            &admin(),
            User {
                email: "eve@farm".to_string(),
                password: "x".to_string(),
                role: Role::SuperAdmin,
                investor_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn backup_import_replaces_ledger_collections() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    engine
        .add_contribution(&admin(), ContributionCmd::new(a, MoneyCents::new(500), Utc::now()))
        .await
        .unwrap();

    let backup = engine.export_backup(&root()).await.unwrap();
    let json = backup.to_json().unwrap();
    assert_eq!(engine::Backup::from_json(&json).unwrap(), backup);

    new_investor(&engine, "B", 100_000).await;
    engine
        .add_expense(&admin(), ExpenseCmd::new(MoneyCents::new(100), "feed", Utc::now()))
        .await
        .unwrap();

    let err = engine
        .import_backup(&admin(), backup.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    engine.import_backup(&root(), backup.clone()).await.unwrap();
    assert_eq!(engine.investors().await.unwrap(), backup.investors);
    assert_eq!(engine.transactions().await.unwrap(), backup.transactions);
}

#[tokio::test]
async fn family_members_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;
    engine
        .save_families(&admin(), vec![family("f1", &[a, b])])
        .await
        .unwrap();
    engine
        .set_egg_price(&admin(), MoneyCents::new(100))
        .await
        .unwrap();
    let egg_id = engine
        .add_eggs(&admin(), EggsCmd::new(10, Utc::now()))
        .await
        .unwrap();

    let err = engine.delete_investor(&root(), b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(engine.investors().await.unwrap().len(), 2);

    // the untouched family can still be saved and its deliveries rejected
    engine
        .save_families(&admin(), vec![family("f1", &[a, b])])
        .await
        .unwrap();
    let ids = engine.reject_delivery(&admin(), egg_id, "f1").await.unwrap();
    assert_eq!(ids.len(), 2);

    // once the family no longer lists them, the investor can go
    engine
        .save_families(&admin(), vec![family("f1", &[a])])
        .await
        .unwrap();
    engine.delete_investor(&root(), b).await.unwrap();
    assert_eq!(engine.investors().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_for_a_removed_family_credits_nobody() {
    let (engine, _db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;
    engine
        .save_families(&admin(), vec![family("f1", &[a]), family("f2", &[b])])
        .await
        .unwrap();
    engine
        .set_egg_price(&admin(), MoneyCents::new(100))
        .await
        .unwrap();
    let egg_id = engine
        .add_eggs(&admin(), EggsCmd::new(10, Utc::now()))
        .await
        .unwrap();
    engine
        .save_families(&admin(), vec![family("f1", &[a])])
        .await
        .unwrap();

    let err = engine
        .reject_delivery(&admin(), egg_id, "f2")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let record = engine.egg(egg_id).await.unwrap();
    assert_eq!(record.deliveries["f2"].status, DeliveryStatus::Pending);
    assert!(engine.transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_rejection_rolls_back_every_write() {
    let (engine, db) = engine_with_db().await;
    let a = new_investor(&engine, "A", 100_000).await;
    let b = new_investor(&engine, "B", 100_000).await;
    engine
        .save_families(&admin(), vec![family("f1", &[a, b])])
        .await
        .unwrap();
    engine
        .set_egg_price(&admin(), MoneyCents::new(100))
        .await
        .unwrap();
    let egg_id = engine
        .add_eggs(&admin(), EggsCmd::new(10, Utc::now()))
        .await
        .unwrap();

    // a member row vanishing behind the engine's back makes the rejection
    // fail after the delivery update and the first contribution
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "DELETE FROM investors WHERE id = ?",
        [b.into()],
    ))
    .await
    .unwrap();

    let err = engine
        .reject_delivery(&admin(), egg_id, "f1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let record = engine.egg(egg_id).await.unwrap();
    assert_eq!(record.deliveries["f1"].status, DeliveryStatus::Pending);
    assert!(engine.transactions().await.unwrap().is_empty());
    let logs = engine.logs(100).await.unwrap();
    assert!(!logs.iter().any(|log| log.kind == "delivery_rejected"));
    assert!(engine.notifications(100).await.unwrap().iter().all(|n| {
        n.title_key != "notifications.rejection.title"
    }));
}

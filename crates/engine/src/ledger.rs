//! Ledger aggregation.
//!
//! Balances are never stored. [`LedgerSnapshot::compute`] folds the full
//! history (investors, transactions, egg batches, settings) into the derived
//! position of the fund and of every investor. The fold is pure, so it is
//! recomputed from scratch whenever any input changes.
//!
//! Expense policy: the total of all expenses is split **equally** among the
//! investors holding capital, not proportionally to their capital.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DeliveryStatus, EggRecord, Investor, MoneyCents, SettlementType, Settings, Transaction,
    TransactionDetail, allocation,
    money::{div_round, div_round_wide},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestorSummary {
    pub investor_id: Uuid,
    pub name: String,
    pub initial_capital: MoneyCents,
    /// Ownership share in percent (0–100).
    pub share_percent: f64,
    pub contributions: MoneyCents,
    pub settlements_paid: MoneyCents,
    pub settlements_received: MoneyCents,
    pub balance: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyAllocation {
    pub family_id: String,
    pub name: String,
    pub eggs_received: i64,
    pub eggs_pending: i64,
    pub eggs_rejected: i64,
    pub rejected_cash: MoneyCents,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_initial_capital: MoneyCents,
    pub total_expenses: MoneyCents,
    pub total_contributions: MoneyCents,
    pub total_settlements_in: MoneyCents,
    pub total_settlements_out: MoneyCents,
    pub fund_balance: MoneyCents,
    pub total_eggs: i64,
    /// Investors taking part in the expense split (at least 1).
    pub active_investors: i64,
    /// `total_expenses / active_investors`, rounded to cents for display.
    pub expense_per_person: MoneyCents,
    pub expenses_by_category: BTreeMap<String, MoneyCents>,
    pub investors: Vec<InvestorSummary>,
    pub families: Vec<FamilyAllocation>,
}

#[derive(Default)]
struct InvestorTotals {
    contributions: MoneyCents,
    paid: MoneyCents,
    received: MoneyCents,
}

impl LedgerSnapshot {
    pub fn compute(
        investors: &[Investor],
        transactions: &[Transaction],
        eggs: &[EggRecord],
        settings: &Settings,
    ) -> Self {
        let total_initial_capital: MoneyCents = investors.iter().map(|i| i.initial_capital).sum();

        let mut snapshot = LedgerSnapshot {
            total_initial_capital,
            ..Default::default()
        };
        let mut per_investor: HashMap<Uuid, InvestorTotals> = HashMap::new();

        for tx in transactions {
            match &tx.detail {
                TransactionDetail::Expense { category } => {
                    snapshot.total_expenses += tx.amount;
                    *snapshot
                        .expenses_by_category
                        .entry(category.clone())
                        .or_default() += tx.amount;
                }
                TransactionDetail::Contribution { investor_id, .. } => {
                    snapshot.total_contributions += tx.amount;
                    per_investor.entry(*investor_id).or_default().contributions += tx.amount;
                }
                TransactionDetail::Settlement {
                    investor_id,
                    settlement_type,
                    ..
                } => {
                    let totals = per_investor.entry(*investor_id).or_default();
                    match settlement_type {
                        SettlementType::Pay => {
                            snapshot.total_settlements_in += tx.amount;
                            totals.paid += tx.amount;
                        }
                        SettlementType::Receive => {
                            snapshot.total_settlements_out += tx.amount;
                            totals.received += tx.amount;
                        }
                    }
                }
            }
        }

        snapshot.fund_balance = fund_balance(&snapshot);
        snapshot.total_eggs = eggs.iter().map(|egg| egg.quantity).sum();
        snapshot.active_investors = active_investor_count(investors);
        snapshot.expense_per_person = MoneyCents::new(div_round(
            snapshot.total_expenses.cents(),
            snapshot.active_investors,
        ));

        snapshot.investors = investors
            .iter()
            .map(|investor| {
                let totals = per_investor.remove(&investor.id).unwrap_or_default();
                InvestorSummary {
                    investor_id: investor.id,
                    name: investor.name.clone(),
                    initial_capital: investor.initial_capital,
                    share_percent: investor_share(investor, total_initial_capital),
                    contributions: totals.contributions,
                    settlements_paid: totals.paid,
                    settlements_received: totals.received,
                    balance: investor_balance(
                        investor,
                        &totals,
                        snapshot.total_expenses,
                        snapshot.active_investors,
                    ),
                }
            })
            .collect();

        snapshot.families = family_allocations(eggs, settings);

        tracing::debug!(
            transactions = transactions.len(),
            fund_balance = %snapshot.fund_balance,
            "ledger recomputed"
        );
        snapshot
    }

    pub fn investor(&self, investor_id: Uuid) -> Option<&InvestorSummary> {
        self.investors.iter().find(|i| i.investor_id == investor_id)
    }

    pub fn family(&self, family_id: &str) -> Option<&FamilyAllocation> {
        self.families.iter().find(|f| f.family_id == family_id)
    }
}

fn fund_balance(snapshot: &LedgerSnapshot) -> MoneyCents {
    snapshot.total_initial_capital + snapshot.total_contributions - snapshot.total_expenses
        + snapshot.total_settlements_in
        - snapshot.total_settlements_out
}

/// Number of investors with capital, never below 1.
pub fn active_investor_count(investors: &[Investor]) -> i64 {
    (investors.iter().filter(|i| i.is_active()).count() as i64).max(1)
}

/// `initial_capital / total * 100`, or 0 when nobody holds capital.
pub fn investor_share(investor: &Investor, total_initial_capital: MoneyCents) -> f64 {
    if total_initial_capital.is_zero() {
        return 0.0;
    }
    investor.initial_capital.cents() as f64 / total_initial_capital.cents() as f64 * 100.0
}

/// `capital - expenses / active + contributions + paid - received`, rounded
/// to cents once at the end.
fn investor_balance(
    investor: &Investor,
    totals: &InvestorTotals,
    total_expenses: MoneyCents,
    active_investors: i64,
) -> MoneyCents {
    let own = investor.initial_capital + totals.contributions + totals.paid - totals.received;
    let active = i128::from(active_investors);
    let scaled = i128::from(own.cents()) * active - i128::from(total_expenses.cents());
    let balance = div_round_wide(scaled, active);
    let balance = i64::try_from(balance).unwrap_or(if balance < 0 { i64::MIN } else { i64::MAX });
    MoneyCents::new(balance)
}

fn family_allocations(eggs: &[EggRecord], settings: &Settings) -> Vec<FamilyAllocation> {
    let families = settings.families();
    families
        .iter()
        .map(|family| {
            let mut allocation = FamilyAllocation {
                family_id: family.id.clone(),
                name: family.name.clone(),
                eggs_received: allocation::family_egg_share(eggs, &family.id, families.len()),
                eggs_pending: 0,
                eggs_rejected: 0,
                rejected_cash: MoneyCents::ZERO,
            };
            for delivery in eggs.iter().filter_map(|egg| egg.deliveries.get(&family.id)) {
                match &delivery.status {
                    DeliveryStatus::Pending => allocation.eggs_pending += delivery.amount,
                    DeliveryStatus::Delivered { .. } => {}
                    DeliveryStatus::Rejected { cash_value, .. } => {
                        allocation.eggs_rejected += delivery.amount;
                        allocation.rejected_cash += *cash_value;
                    }
                }
            }
            allocation
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Family, FamilySettings};

    fn investor(name: &str, capital: i64) -> Investor {
        Investor::new(name.to_string(), MoneyCents::new(capital)).unwrap()
    }

    fn tx(detail: TransactionDetail, amount: i64) -> Transaction {
        Transaction::new(
            detail,
            MoneyCents::new(amount),
            None,
            Utc::now(),
            "admin@farm".to_string(),
        )
        .unwrap()
    }

    fn expense(amount: i64) -> Transaction {
        tx(
            TransactionDetail::Expense {
                category: "feed".to_string(),
            },
            amount,
        )
    }

    fn contribution(investor: &Investor, amount: i64) -> Transaction {
        tx(
            TransactionDetail::Contribution {
                investor_id: investor.id,
                investor_name: investor.name.clone(),
                automated: None,
            },
            amount,
        )
    }

    fn settlement(investor: &Investor, settlement_type: SettlementType, amount: i64) -> Transaction {
        tx(
            TransactionDetail::Settlement {
                investor_id: investor.id,
                investor_name: investor.name.clone(),
                settlement_type,
                automated: None,
            },
            amount,
        )
    }

    /// Capital {A: 1000, B: 2000}, expense 500, contribution 200 (A),
    /// settlement pay 50 (A), settlement receive 100 (B).
    fn example() -> (Vec<Investor>, Vec<Transaction>) {
        let a = investor("A", 100_000);
        let b = investor("B", 200_000);
        let txs = vec![
            expense(50_000),
            contribution(&a, 20_000),
            settlement(&a, SettlementType::Pay, 5_000),
            settlement(&b, SettlementType::Receive, 10_000),
        ];
        (vec![a, b], txs)
    }

    #[test]
    fn large_capitals_do_not_overflow_the_balance() {
        let whale = investor("W", 5_000_000_000_000_000_000);
        let minnow = investor("M", 1);
        let txs = vec![expense(2)];
        let investors = vec![whale, minnow];
        let snapshot = LedgerSnapshot::compute(&investors, &txs, &[], &Settings::default());

        assert_eq!(
            snapshot.investor(investors[0].id).unwrap().balance,
            MoneyCents::new(4_999_999_999_999_999_999)
        );
        assert_eq!(
            snapshot.investor(investors[1].id).unwrap().balance,
            MoneyCents::ZERO
        );
    }

    #[test]
    fn fund_balance_identity() {
        let (investors, txs) = example();
        let snapshot = LedgerSnapshot::compute(&investors, &txs, &[], &Settings::default());

        assert_eq!(snapshot.total_initial_capital, MoneyCents::new(300_000));
        assert_eq!(snapshot.total_expenses, MoneyCents::new(50_000));
        assert_eq!(snapshot.total_contributions, MoneyCents::new(20_000));
        assert_eq!(snapshot.total_settlements_in, MoneyCents::new(5_000));
        assert_eq!(snapshot.total_settlements_out, MoneyCents::new(10_000));
        assert_eq!(snapshot.fund_balance, MoneyCents::new(265_000));
    }

    #[test]
    fn expenses_split_by_headcount() {
        let (investors, txs) = example();
        let snapshot = LedgerSnapshot::compute(&investors, &txs, &[], &Settings::default());

        assert_eq!(snapshot.active_investors, 2);
        assert_eq!(snapshot.expense_per_person, MoneyCents::new(25_000));
        let a = snapshot.investor(investors[0].id).unwrap();
        assert_eq!(a.balance, MoneyCents::new(100_000));
        let b = snapshot.investor(investors[1].id).unwrap();
        assert_eq!(b.balance, MoneyCents::new(200_000 - 25_000 - 10_000));
    }

    #[test]
    fn shares_sum_to_hundred() {
        let investors = vec![
            investor("A", 100_000),
            investor("B", 200_000),
            investor("C", 33_333),
        ];
        let snapshot = LedgerSnapshot::compute(&investors, &[], &[], &Settings::default());
        let total: f64 = snapshot.investors.iter().map(|i| i.share_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn no_capital_means_zero_share_and_single_divisor() {
        let investors = vec![investor("A", 0), investor("B", 0)];
        let txs = vec![expense(1_000)];
        let snapshot = LedgerSnapshot::compute(&investors, &txs, &[], &Settings::default());

        assert_eq!(snapshot.active_investors, 1);
        assert!(snapshot.investors.iter().all(|i| i.share_percent == 0.0));
        assert!(
            snapshot
                .investors
                .iter()
                .all(|i| i.balance == MoneyCents::new(-1_000))
        );
    }

    #[test]
    fn balance_rounds_to_cents() {
        let investors = vec![
            investor("A", 100_000),
            investor("B", 100_000),
            investor("C", 100_000),
        ];
        let txs = vec![expense(10_000)];
        let snapshot = LedgerSnapshot::compute(&investors, &txs, &[], &Settings::default());
        // 100.00 / 3 = 33.333..
        assert!(
            snapshot
                .investors
                .iter()
                .all(|i| i.balance == MoneyCents::new(96_667))
        );
    }

    #[test]
    fn recomputation_is_idempotent() {
        let (investors, txs) = example();
        let settings = Settings::default();
        let first = LedgerSnapshot::compute(&investors, &txs, &[], &settings);
        let second = LedgerSnapshot::compute(&investors, &txs, &[], &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn categories_and_families_are_aggregated() {
        let a = investor("A", 100_000);
        let txs = vec![
            expense(1_000),
            expense(500),
            tx(
                TransactionDetail::Expense {
                    category: "vet".to_string(),
                },
                700,
            ),
        ];
        let settings = Settings {
            family_settings: FamilySettings {
                list: vec![Family {
                    id: "f1".to_string(),
                    name: "Rossi".to_string(),
                    icon: String::new(),
                    member_count: 1,
                    investor_ids: vec![a.id],
                }],
                egg_price: MoneyCents::new(50),
            },
            ..Default::default()
        };
        let ids = vec!["f1".to_string()];
        let mut delivered = EggRecord::new(10, None, Utc::now(), "a".to_string(), &ids).unwrap();
        delivered
            .delivery_mut("f1")
            .unwrap()
            .confirm("admin", Utc::now())
            .unwrap();
        let mut rejected = EggRecord::new(4, None, Utc::now(), "a".to_string(), &ids).unwrap();
        rejected
            .delivery_mut("f1")
            .unwrap()
            .reject("admin", Utc::now(), MoneyCents::new(50))
            .unwrap();
        let pending = EggRecord::new(6, None, Utc::now(), "a".to_string(), &ids).unwrap();

        let snapshot =
            LedgerSnapshot::compute(&[a], &txs, &[delivered, rejected, pending], &settings);
        assert_eq!(snapshot.expenses_by_category["feed"], MoneyCents::new(1_500));
        assert_eq!(snapshot.expenses_by_category["vet"], MoneyCents::new(700));
        assert_eq!(snapshot.total_eggs, 20);

        let family = snapshot.family("f1").unwrap();
        assert_eq!(family.eggs_received, 10);
        assert_eq!(family.eggs_pending, 6);
        assert_eq!(family.eggs_rejected, 4);
        assert_eq!(family.rejected_cash, MoneyCents::new(200));
    }
}

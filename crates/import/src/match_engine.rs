use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tally_core::{
    within_tolerance, CanonicalTransaction, Money, PaymentMethod, RecordedExpense, TransactionKind,
};

use crate::config::ReconcileConfig;

/// Recorded expenses bucketed by effective amount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseIndex {
    buckets: HashMap<Money, Vec<RecordedExpense>>,
    len: usize,
}

impl ExpenseIndex {
    /// Builds the index. Expenses sharing an amount keep their input order.
    pub fn build<I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = RecordedExpense>,
    {
        let mut buckets: HashMap<Money, Vec<RecordedExpense>> = HashMap::new();
        let mut len = 0;
        for expense in expenses {
            buckets.entry(expense.effective_amount()).or_default().push(expense);
            len += 1;
        }
        tracing::debug!(expenses = len, amounts = buckets.len(), "Built expense index");
        Self { buckets, len }
    }

    /// Every expense recorded at exactly `amount`.
    pub fn bucket(&self, amount: Money) -> &[RecordedExpense] {
        self.buckets.get(&amount).map(Vec::as_slice).unwrap_or_default()
    }

    /// The expenses at `amount`, restricted to `methods` when given.
    pub fn candidates<'a>(
        &'a self,
        amount: Money,
        methods: Option<&'a [PaymentMethod]>,
    ) -> impl Iterator<Item = &'a RecordedExpense> + 'a {
        self.bucket(amount)
            .iter()
            .filter(move |expense| methods.map_or(true, |m| m.contains(&expense.payment_method)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No debit to look for, or a kind that is never reconciled.
    Skipped,
    Unmatched,
    Matched,
    /// More than one expense fits; carries how many.
    Ambiguous(usize),
}

/// A flattened view of one unmatched transaction, suitable for writing out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepantTransaction {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
}

impl From<&CanonicalTransaction> for DiscrepantTransaction {
    fn from(tx: &CanonicalTransaction) -> Self {
        Self {
            date: tx.date(),
            kind: tx.kind(),
            amount: tx.amount(),
            description: tx.description(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscrepancyReport {
    /// Bank transactions with no recorded expense, in encounter order.
    pub unmatched: Vec<CanonicalTransaction>,
    pub matched: usize,
    pub ambiguous: usize,
    pub skipped: usize,
}

impl DiscrepancyReport {
    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn unmatched_total(&self) -> Money {
        self.unmatched.iter().map(CanonicalTransaction::debit).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty() && self.ambiguous == 0
    }

    pub fn discrepancies(&self) -> Vec<DiscrepantTransaction> {
        self.unmatched.iter().map(DiscrepantTransaction::from).collect()
    }

    fn record(&mut self, tx: &CanonicalTransaction, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Skipped => self.skipped += 1,
            MatchOutcome::Unmatched => self.unmatched.push(tx.clone()),
            MatchOutcome::Matched => self.matched += 1,
            MatchOutcome::Ambiguous(_) => self.ambiguous += 1,
        }
    }
}

/// Classifies bank transactions against an [`ExpenseIndex`].
#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance: Duration,
    match_payment_method: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&ReconcileConfig::default())
    }
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            tolerance: config.tolerance(),
            match_payment_method: config.match_payment_method,
        }
    }

    pub fn classify(&self, tx: &CanonicalTransaction, index: &ExpenseIndex) -> MatchOutcome {
        if tx.debit().is_zero() || !tx.kind().is_reconcilable() {
            tracing::debug!("No debit to reconcile, skipping: {}", tx);
            return MatchOutcome::Skipped;
        }

        let methods = self.match_payment_method.then(|| tx.kind().payment_methods());
        let hits = index
            .candidates(tx.debit(), methods)
            .filter(|expense| within_tolerance(expense.expensed_at, tx.date(), self.tolerance))
            .count();

        match hits {
            0 => {
                tracing::info!("Unmatched transaction: {}", tx);
                MatchOutcome::Unmatched
            }
            1 => {
                tracing::debug!("Matched transaction: {}", tx);
                MatchOutcome::Matched
            }
            n => {
                tracing::info!(
                    transaction = %tx,
                    date = %tx.date(),
                    kind = %tx.kind(),
                    debit = %tx.debit(),
                    candidates = n,
                    "Ambiguous transaction, several expenses fit"
                );
                MatchOutcome::Ambiguous(n)
            }
        }
    }

    pub fn reconcile(&self, transactions: &[CanonicalTransaction], index: &ExpenseIndex) -> DiscrepancyReport {
        let mut report = DiscrepancyReport::default();
        for tx in transactions {
            report.record(tx, self.classify(tx, index));
        }
        tracing::info!(
            transactions = transactions.len(),
            matched = report.matched,
            unmatched = report.unmatched_count(),
            ambiguous = report.ambiguous,
            skipped = report.skipped,
            "Reconciliation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn tx(date: NaiveDate, kind: TransactionKind, debit: &str, credit: &str) -> CanonicalTransaction {
        CanonicalTransaction::new(
            date,
            kind,
            Money::parse_or_zero(debit).unwrap(),
            Money::parse_or_zero(credit).unwrap(),
            ["SHOP".to_string(), String::new(), String::new()],
        )
        .unwrap()
    }

    fn expense(id: i64, amount: &str, method: PaymentMethod, when: DateTime<Utc>) -> RecordedExpense {
        RecordedExpense {
            id,
            amount: money(amount),
            payment_method: method,
            expensed_at: when,
            reference_amount: None,
            description: format!("expense {id}"),
        }
    }

    #[test]
    fn no_expense_at_amount_is_unmatched() {
        let index = ExpenseIndex::build([expense(1, "49.99", PaymentMethod::Nets, at(2019, 1, 5, 12, 0))]);
        let report = Reconciler::default().reconcile(
            &[tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "")],
            &index,
        );
        assert_eq!(report.unmatched_count(), 1);
        assert_eq!(report.matched, 0);
        assert_eq!(report.unmatched_total(), money("50"));
    }

    #[test]
    fn single_expense_in_window_is_matched() {
        let index = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 6, 9, 30))]);
        let report = Reconciler::default().reconcile(
            &[tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "")],
            &index,
        );
        assert_eq!(report.matched, 1);
        assert!(report.unmatched.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn two_expenses_in_window_are_ambiguous() {
        let index = ExpenseIndex::build([
            expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 5, 8, 0)),
            expense(2, "50.00", PaymentMethod::Cash, at(2019, 1, 6, 20, 0)),
        ]);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");
        let reconciler = Reconciler::default();
        assert_eq!(reconciler.classify(&transaction, &index), MatchOutcome::Ambiguous(2));

        let report = reconciler.reconcile(&[transaction], &index);
        assert_eq!(report.ambiguous, 1);
        assert!(report.unmatched.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn window_is_measured_from_end_of_day() {
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");
        let reconciler = Reconciler::default();

        // End of day is 2019-01-05T23:59:59.999999999, so the window opens just before 4 Jan.
        let early = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 4, 0, 0))]);
        assert_eq!(reconciler.classify(&transaction, &early), MatchOutcome::Matched);

        let too_early = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 3, 23, 0))]);
        assert_eq!(reconciler.classify(&transaction, &too_early), MatchOutcome::Unmatched);

        let late = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 7, 23, 59))]);
        assert_eq!(reconciler.classify(&transaction, &late), MatchOutcome::Matched);

        let too_late = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 8, 0, 0))]);
        assert_eq!(reconciler.classify(&transaction, &too_late), MatchOutcome::Unmatched);
    }

    #[test]
    fn only_in_window_candidates_count() {
        let index = ExpenseIndex::build([
            expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 5, 12, 0)),
            expense(2, "50.00", PaymentMethod::Nets, at(2018, 12, 1, 12, 0)),
        ]);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");
        assert_eq!(Reconciler::default().classify(&transaction, &index), MatchOutcome::Matched);
    }

    #[test]
    fn credit_only_and_zero_rows_are_skipped() {
        let index = ExpenseIndex::build([expense(1, "250.00", PaymentMethod::ElectronicTransfer, at(2019, 1, 5, 12, 0))]);
        let report = Reconciler::default().reconcile(
            &[
                tx(date(2019, 1, 5), TransactionKind::FundsTransfer, "", "250.00"),
                tx(date(2019, 1, 5), TransactionKind::InterbankGiro, "", ""),
            ],
            &index,
        );
        assert_eq!(report.skipped, 2);
        assert!(report.unmatched.is_empty());
        assert_eq!(report.matched, 0);
    }

    #[test]
    fn amounts_compare_by_value_not_scale() {
        let index = ExpenseIndex::build([expense(1, "50.0", PaymentMethod::Nets, at(2019, 1, 5, 12, 0))]);
        assert_eq!(index.bucket(money("50.00")).len(), 1);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50", "");
        assert_eq!(Reconciler::default().classify(&transaction, &index), MatchOutcome::Matched);
    }

    #[test]
    fn reference_amount_is_the_bucket_key() {
        let mut recorded = expense(1, "10.00", PaymentMethod::Nets, at(2019, 1, 5, 12, 0));
        recorded.reference_amount = Some(money("12.50"));
        let index = ExpenseIndex::build([recorded]);
        assert!(index.bucket(money("10.00")).is_empty());
        assert_eq!(index.bucket(money("12.50")).len(), 1);
    }

    #[test]
    fn index_preserves_insertion_order_within_bucket() {
        let index = ExpenseIndex::build([
            expense(3, "5.00", PaymentMethod::Cash, at(2019, 1, 5, 12, 0)),
            expense(1, "7.00", PaymentMethod::Cash, at(2019, 1, 5, 12, 0)),
            expense(2, "5.00", PaymentMethod::Cash, at(2019, 1, 5, 12, 0)),
        ]);
        let ids: Vec<i64> = index.bucket(money("5")).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.bucket_count(), 2);
        assert!(index.bucket(money("9.99")).is_empty());
    }

    #[test]
    fn rebuilding_the_index_gives_the_same_outcomes() {
        let expenses = vec![
            expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 5, 8, 0)),
            expense(2, "50.00", PaymentMethod::Nets, at(2019, 1, 5, 9, 0)),
            expense(3, "12.30", PaymentMethod::Nets, at(2019, 1, 5, 9, 0)),
        ];
        let transactions = vec![
            tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", ""),
            tx(date(2019, 1, 5), TransactionKind::Nets, "12.30", ""),
            tx(date(2019, 1, 5), TransactionKind::Nets, "99.00", ""),
        ];
        let first = ExpenseIndex::build(expenses.clone());
        let second = ExpenseIndex::build(expenses);
        assert_eq!(first, second);

        let reconciler = Reconciler::default();
        assert_eq!(
            reconciler.reconcile(&transactions, &first),
            reconciler.reconcile(&transactions, &second)
        );
    }

    #[test]
    fn unmatched_list_keeps_encounter_order() {
        let index = ExpenseIndex::default();
        let transactions = vec![
            tx(date(2019, 1, 7), TransactionKind::Nets, "3.00", ""),
            tx(date(2019, 1, 5), TransactionKind::BillPayment, "1.00", ""),
            tx(date(2019, 1, 6), TransactionKind::Nets, "2.00", ""),
        ];
        let report = Reconciler::default().reconcile(&transactions, &index);
        assert_eq!(report.unmatched, transactions);
        assert_eq!(report.unmatched_total(), money("6"));
    }

    #[test]
    fn payment_method_filter_is_opt_in() {
        let index = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Cash, at(2019, 1, 5, 12, 0))]);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");

        assert_eq!(Reconciler::default().classify(&transaction, &index), MatchOutcome::Matched);

        let strict = Reconciler::new(&ReconcileConfig {
            match_payment_method: true,
            ..ReconcileConfig::default()
        });
        assert_eq!(strict.classify(&transaction, &index), MatchOutcome::Unmatched);

        let nets = ExpenseIndex::build([expense(2, "50.00", PaymentMethod::Nets, at(2019, 1, 5, 12, 0))]);
        assert_eq!(strict.classify(&transaction, &nets), MatchOutcome::Matched);
    }

    #[test]
    fn narrower_tolerance_from_config() {
        let index = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2019, 1, 7, 12, 0))]);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");
        assert_eq!(Reconciler::default().classify(&transaction, &index), MatchOutcome::Matched);

        let config = ReconcileConfig::default().with_tolerance_hours(24).unwrap();
        assert_eq!(Reconciler::new(&config).classify(&transaction, &index), MatchOutcome::Unmatched);
    }

    #[test]
    fn unvalidated_huge_tolerance_does_not_panic() {
        let config = ReconcileConfig {
            tolerance_hours: i64::MAX,
            ..ReconcileConfig::default()
        };
        let index = ExpenseIndex::build([expense(1, "50.00", PaymentMethod::Nets, at(2001, 1, 1, 0, 0))]);
        let transaction = tx(date(2019, 1, 5), TransactionKind::Nets, "50.00", "");
        assert_eq!(Reconciler::new(&config).classify(&transaction, &index), MatchOutcome::Matched);
    }

    #[test]
    fn discrepancy_view_flattens_transaction() {
        let transaction = CanonicalTransaction::new(
            date(2019, 1, 5),
            TransactionKind::CardPayment,
            money("15.90"),
            Money::zero(),
            [" TAPAS 26 ".to_string(), "".to_string(), "SG".to_string()],
        )
        .unwrap();
        let report = Reconciler::default().reconcile(&[transaction], &ExpenseIndex::default());
        let rows = report.discrepancies();
        assert_eq!(
            rows,
            vec![DiscrepantTransaction {
                date: date(2019, 1, 5),
                kind: TransactionKind::CardPayment,
                amount: money("15.90"),
                description: "TAPAS 26 SG".to_string(),
            }]
        );
    }
}

//! Financial report shaping over posted activity.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use gl::{
    FinancialReportService, GeneralLedgerService, GlAccount, GlAccountType, NewGlAccount,
    NewJournalEntry, NewJournalEntryDetail, NormalBalance,
};
use platform_contracts::ErrorKind;

use common::{finance_roles, stack, Stack};

struct Books {
    ledger: GeneralLedgerService,
    reports: FinancialReportService,
    cash: GlAccount,
    revenue: GlAccount,
    rent: GlAccount,
    equity: GlAccount,
    loan: GlAccount,
}

fn account(
    ledger: &GeneralLedgerService,
    number: &str,
    name: &str,
    account_type: GlAccountType,
    normal_balance: NormalBalance,
) -> GlAccount {
    ledger
        .create_gl_account(
            NewGlAccount {
                account_number: number.into(),
                account_name: name.into(),
                account_type,
                normal_balance,
                parent_account_id: None,
                description: None,
            },
            "u1",
            &finance_roles(),
        )
        .unwrap()
}

fn books(stack: &Stack) -> Books {
    let ledger = GeneralLedgerService::new(Arc::clone(&stack.ctx), Arc::clone(&stack.pool));
    let reports = FinancialReportService::new(Arc::clone(&stack.ctx), Arc::clone(&stack.pool));

    let cash = account(&ledger, "1000", "Operating Cash", GlAccountType::Asset, NormalBalance::Debit);
    let revenue = account(&ledger, "4000", "Service Revenue", GlAccountType::Revenue, NormalBalance::Credit);
    let rent = account(&ledger, "5100", "Rent Expense", GlAccountType::Expense, NormalBalance::Debit);
    let equity = account(&ledger, "3000", "Owner Equity", GlAccountType::Equity, NormalBalance::Credit);
    let loan = account(&ledger, "2100", "Bank Loan", GlAccountType::Liability, NormalBalance::Credit);

    Books {
        ledger,
        reports,
        cash,
        revenue,
        rent,
        equity,
        loan,
    }
}

fn post(books: &Books, number: &str, lines: Vec<(&GlAccount, f64, f64)>) {
    let roles = finance_roles();
    let details = lines
        .into_iter()
        .map(|(account, debit, credit)| NewJournalEntryDetail {
            gl_account_id: account.id.clone(),
            debit_amount: debit,
            credit_amount: credit,
            notes: None,
        })
        .collect();
    let entry = books
        .ledger
        .create_journal_entry(
            NewJournalEntry {
                journal_number: number.into(),
                description: format!("entry {number}"),
                entry_date: Utc::now(),
                reference: None,
            },
            details,
            "u1",
            &roles,
        )
        .unwrap();
    books
        .ledger
        .post_journal_entry(&entry.id, "u1", &roles)
        .unwrap();
}

fn seed_activity(books: &Books) {
    // Owner funds the company, it earns revenue, pays rent, takes a loan.
    post(books, "JE-1", vec![(&books.cash, 1000.0, 0.0), (&books.equity, 0.0, 1000.0)]);
    post(books, "JE-2", vec![(&books.cash, 400.0, 0.0), (&books.revenue, 0.0, 400.0)]);
    post(books, "JE-3", vec![(&books.rent, 150.0, 0.0), (&books.cash, 0.0, 150.0)]);
    post(books, "JE-4", vec![(&books.cash, 250.0, 0.0), (&books.loan, 0.0, 250.0)]);
}

fn window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let now = Utc::now();
    (now - Duration::hours(1), now + Duration::hours(1))
}

#[test]
fn trial_balance_sums_match_posted_activity() {
    let stack = stack();
    let roles = finance_roles();
    let books = books(&stack);
    seed_activity(&books);

    let (start, end) = window();
    let report = books.reports.trial_balance(start, end, "u1", &roles).unwrap();

    assert!((report.total_debit - report.total_credit).abs() < 1e-6);
    assert!((report.total_debit - 1800.0).abs() < 1e-6);

    let cash_row = report
        .rows
        .iter()
        .find(|r| r.account_number == "1000")
        .unwrap();
    assert!((cash_row.net_change - 1500.0).abs() < 1e-6);

    // Rows come back ordered by account number.
    let numbers: Vec<&str> = report.rows.iter().map(|r| r.account_number.as_str()).collect();
    assert_eq!(numbers, vec!["1000", "2100", "3000", "4000", "5100"]);
}

#[test]
fn unposted_entries_do_not_appear_in_reports() {
    let stack = stack();
    let roles = finance_roles();
    let books = books(&stack);
    seed_activity(&books);

    // Created but never posted.
    books
        .ledger
        .create_journal_entry(
            NewJournalEntry {
                journal_number: "JE-UNPOSTED".into(),
                description: "draft".into(),
                entry_date: Utc::now(),
                reference: None,
            },
            vec![
                NewJournalEntryDetail {
                    gl_account_id: books.cash.id.clone(),
                    debit_amount: 9999.0,
                    credit_amount: 0.0,
                    notes: None,
                },
                NewJournalEntryDetail {
                    gl_account_id: books.equity.id.clone(),
                    debit_amount: 0.0,
                    credit_amount: 9999.0,
                    notes: None,
                },
            ],
            "u1",
            &roles,
        )
        .unwrap();

    let (start, end) = window();
    let report = books.reports.trial_balance(start, end, "u1", &roles).unwrap();
    assert!((report.total_debit - 1800.0).abs() < 1e-6);
}

#[test]
fn balance_sheet_balances() {
    let stack = stack();
    let roles = finance_roles();
    let books = books(&stack);
    seed_activity(&books);

    let (_, end) = window();
    let report = books.reports.balance_sheet(end, "u1", &roles).unwrap();

    // Cash 1500; liabilities 250; equity 1000. The 250 of retained earnings
    // (revenue minus rent) lives in income-statement accounts, so assets
    // exceed liabilities+equity by exactly net income.
    assert!((report.total_assets - 1500.0).abs() < 1e-6);
    assert!((report.total_liabilities - 250.0).abs() < 1e-6);
    assert!((report.total_equity - 1000.0).abs() < 1e-6);
}

#[test]
fn income_statement_reports_revenue_and_expenses_positive() {
    let stack = stack();
    let roles = finance_roles();
    let books = books(&stack);
    seed_activity(&books);

    let (start, end) = window();
    let report = books
        .reports
        .income_statement(start, end, "u1", &roles)
        .unwrap();

    assert!((report.total_revenue - 400.0).abs() < 1e-6);
    assert!((report.total_expenses - 150.0).abs() < 1e-6);
    assert!((report.net_income - 250.0).abs() < 1e-6);
    assert_eq!(report.revenue.len(), 1);
    assert_eq!(report.expenses.len(), 1);
}

#[test]
fn cash_flow_classifies_by_counter_account() {
    let stack = stack();
    let roles = finance_roles();
    let books = books(&stack);
    seed_activity(&books);

    let (start, end) = window();
    let report = books
        .reports
        .cash_flow_statement(start, end, "u1", &roles)
        .unwrap();

    // JE-2 (+400 revenue) and JE-3 (-150 rent) are operating; JE-1 (+1000
    // equity) and JE-4 (+250 loan) are financing. No investing flows.
    assert!((report.operating - 250.0).abs() < 1e-6);
    assert!((report.financing - 1250.0).abs() < 1e-6);
    assert!((report.investing - 0.0).abs() < 1e-6);
    assert!((report.net_cash_change - 1500.0).abs() < 1e-6);
}

#[test]
fn reports_require_their_view_permission() {
    let stack = stack();
    let books = books(&stack);

    let (start, end) = window();
    let err = books
        .reports
        .trial_balance(start, end, "u2", &["warehouse".to_string()])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

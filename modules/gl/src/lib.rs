//! # General Ledger
//!
//! The composite that exercises the whole transactional stack: a chart of
//! accounts forming a forest, balanced journal entries with a one-way posting
//! state machine, per-account running balances maintained exclusively by the
//! posting routine, and the read-only report primitives (trial balance,
//! balance sheet, income statement, cash flow) shaped over posted activity.

pub mod records;
pub mod repos;
pub mod services;
pub mod validation;

pub use records::{
    GlAccount, GlAccountBalance, GlAccountType, JournalEntry, JournalEntryDetail, NormalBalance,
};
pub use services::ledger_service::{
    GeneralLedgerService, NewGlAccount, NewJournalEntry, NewJournalEntryDetail,
};
pub use services::report_service::{
    ActivityClass, BalanceSheetReport, CashFlowReport, FinancialReportService,
    IncomeStatementReport, ReportLine, TrialBalanceReport, TrialBalanceRow,
};

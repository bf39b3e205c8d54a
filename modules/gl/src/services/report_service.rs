//! Read-only financial reports shaped over posted journal activity.
//!
//! Every statement is an aggregation over one primitive: per-account net
//! activity (debit minus credit) across posted entries, windowed by posting
//! date. Figures are presented adjusted for the account's normal balance so
//! liabilities, equity, and revenue read positive.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use persistence::{ConnectionPool, Params, Repository};
use platform_contracts::{EntityStatus, ServiceResult};
use serde::Serialize;
use service_core::ServiceContext;

use crate::records::{GlAccount, GlAccountType, JournalEntry, JournalEntryDetail, NormalBalance};
use crate::repos::{account_repo, journal_repo};

/// Cash-flow activity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityClass {
    Operating,
    Investing,
    Financing,
}

/// Deterministic account-type → activity mapping for the cash-flow
/// statement. Revenue and expense flows are operating, asset movements are
/// investing, liability and equity movements are financing; anything
/// unclassifiable defaults to operating.
pub fn classify_activity(account_type: GlAccountType) -> ActivityClass {
    match account_type {
        GlAccountType::Revenue | GlAccountType::Expense | GlAccountType::Other => {
            ActivityClass::Operating
        }
        GlAccountType::Asset => ActivityClass::Investing,
        GlAccountType::Liability | GlAccountType::Equity => ActivityClass::Financing,
    }
}

/// Cash accounts are recognised by name token; the chart controls the
/// wording, the report only reads it.
pub fn is_cash_account(account: &GlAccount) -> bool {
    let name = account.account_name.to_lowercase();
    name.contains("cash") || name.contains("bank")
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceRow {
    pub account_id: String,
    pub account_number: String,
    pub account_name: String,
    pub debit_total: f64,
    pub credit_total: f64,
    /// Debit minus credit, unadjusted.
    pub net_change: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: f64,
    pub total_credit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    pub account_number: String,
    pub account_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheetReport {
    pub as_of: DateTime<Utc>,
    pub assets: Vec<ReportLine>,
    pub liabilities: Vec<ReportLine>,
    pub equity: Vec<ReportLine>,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncomeStatementReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub revenue: Vec<ReportLine>,
    pub expenses: Vec<ReportLine>,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_income: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub operating: f64,
    pub investing: f64,
    pub financing: f64,
    pub net_cash_change: f64,
}

pub struct FinancialReportService {
    ctx: Arc<ServiceContext>,
    accounts: Repository<GlAccount>,
    entries: Repository<JournalEntry>,
    details: Repository<JournalEntryDetail>,
}

impl FinancialReportService {
    pub fn new(ctx: Arc<ServiceContext>, pool: Arc<ConnectionPool>) -> Self {
        Self {
            ctx,
            accounts: account_repo::repository(Arc::clone(&pool)),
            entries: journal_repo::entries_repository(Arc::clone(&pool)),
            details: journal_repo::details_repository(pool),
        }
    }

    /// Per-account `(debit_total, credit_total)` over posted entries in the
    /// window; `start == None` reads from the beginning of time.
    fn posted_activity(
        &self,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> ServiceResult<HashMap<String, (f64, f64)>> {
        let sums = journal_repo::posted_activity_by_account(&self.entries, start, end)?;
        Ok(sums
            .into_iter()
            .map(|(account_id, debit, credit)| (account_id, (debit, credit)))
            .collect())
    }

    fn active_accounts(&self) -> ServiceResult<Vec<GlAccount>> {
        let mut accounts = account_repo::list(&self.accounts, &Params::new())?;
        accounts.retain(|a| a.status != EntityStatus::Deleted);
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        Ok(accounts)
    }

    pub fn trial_balance(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<TrialBalanceReport> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.TrialBalance.View",
            "You do not have permission to view the trial balance.",
        )?;

        let activity = self.posted_activity(Some(start), end)?;
        let mut rows = Vec::new();
        let mut total_debit = 0.0;
        let mut total_credit = 0.0;

        for account in self.active_accounts()? {
            let (debit, credit) = activity.get(&account.id).copied().unwrap_or((0.0, 0.0));
            total_debit += debit;
            total_credit += credit;
            rows.push(TrialBalanceRow {
                account_id: account.id.clone(),
                account_number: account.account_number.clone(),
                account_name: account.account_name.clone(),
                debit_total: debit,
                credit_total: credit,
                net_change: debit - credit,
            });
        }

        Ok(TrialBalanceReport {
            start,
            end,
            rows,
            total_debit,
            total_credit,
        })
    }

    pub fn balance_sheet(
        &self,
        as_of: DateTime<Utc>,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<BalanceSheetReport> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.BalanceSheet.View",
            "You do not have permission to view the balance sheet.",
        )?;

        let activity = self.posted_activity(None, as_of)?;
        let mut report = BalanceSheetReport {
            as_of,
            assets: Vec::new(),
            liabilities: Vec::new(),
            equity: Vec::new(),
            total_assets: 0.0,
            total_liabilities: 0.0,
            total_equity: 0.0,
        };

        for account in self.active_accounts()? {
            let (debit, credit) = activity.get(&account.id).copied().unwrap_or((0.0, 0.0));
            let mut amount = debit - credit;
            if account.normal_balance == NormalBalance::Credit {
                amount = -amount;
            }
            let line = ReportLine {
                account_number: account.account_number.clone(),
                account_name: account.account_name.clone(),
                amount,
            };
            match account.account_type {
                GlAccountType::Asset => {
                    report.total_assets += amount;
                    report.assets.push(line);
                }
                GlAccountType::Liability => {
                    report.total_liabilities += amount;
                    report.liabilities.push(line);
                }
                GlAccountType::Equity => {
                    report.total_equity += amount;
                    report.equity.push(line);
                }
                _ => {}
            }
        }

        Ok(report)
    }

    pub fn income_statement(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<IncomeStatementReport> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.IncomeStatement.View",
            "You do not have permission to view the income statement.",
        )?;

        let activity = self.posted_activity(Some(start), end)?;
        let mut report = IncomeStatementReport {
            start,
            end,
            revenue: Vec::new(),
            expenses: Vec::new(),
            total_revenue: 0.0,
            total_expenses: 0.0,
            net_income: 0.0,
        };

        for account in self.active_accounts()? {
            let (debit, credit) = activity.get(&account.id).copied().unwrap_or((0.0, 0.0));
            let net = debit - credit;
            match account.account_type {
                // Revenue accounts are credit-normal; flip so income reads
                // positive.
                GlAccountType::Revenue => {
                    let amount = -net;
                    report.total_revenue += amount;
                    report.revenue.push(ReportLine {
                        account_number: account.account_number.clone(),
                        account_name: account.account_name.clone(),
                        amount,
                    });
                }
                GlAccountType::Expense => {
                    report.total_expenses += net;
                    report.expenses.push(ReportLine {
                        account_number: account.account_number.clone(),
                        account_name: account.account_name.clone(),
                        amount: net,
                    });
                }
                _ => {}
            }
        }

        report.net_income = report.total_revenue - report.total_expenses;
        Ok(report)
    }

    /// Direct-method cash flow over the window: the cash movement of each
    /// posted entry, classified by the entry's dominant counter-account.
    pub fn cash_flow_statement(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<CashFlowReport> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.CashFlowStatement.View",
            "You do not have permission to view the cash flow statement.",
        )?;

        let accounts: HashMap<String, GlAccount> = self
            .active_accounts()?
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect();

        let mut report = CashFlowReport {
            start,
            end,
            operating: 0.0,
            investing: 0.0,
            financing: 0.0,
            net_cash_change: 0.0,
        };

        for entry in journal_repo::posted_entries_in_window(&self.entries, Some(start), end)? {
            let details = journal_repo::details_for_entry(&self.details, &entry.id)?;

            let mut cash_impact = 0.0;
            let mut dominant: Option<(f64, ActivityClass)> = None;
            for detail in &details {
                let account = match accounts.get(&detail.gl_account_id) {
                    Some(account) => account,
                    None => continue,
                };
                let movement = detail.debit_amount - detail.credit_amount;
                if is_cash_account(account) {
                    cash_impact += movement;
                } else {
                    let weight = movement.abs();
                    let class = classify_activity(account.account_type);
                    if dominant.map_or(true, |(current, _)| weight > current) {
                        dominant = Some((weight, class));
                    }
                }
            }

            if cash_impact == 0.0 {
                continue;
            }
            match dominant.map(|(_, class)| class).unwrap_or(ActivityClass::Operating) {
                ActivityClass::Operating => report.operating += cash_impact,
                ActivityClass::Investing => report.investing += cash_impact,
                ActivityClass::Financing => report.financing += cash_impact,
            }
        }

        report.net_cash_change = report.operating + report.investing + report.financing;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use platform_contracts::EntityStatus;

    fn account(name: &str, account_type: GlAccountType) -> GlAccount {
        GlAccount {
            id: "a".into(),
            account_number: "1000".into(),
            account_name: name.into(),
            account_type,
            normal_balance: NormalBalance::Debit,
            parent_account_id: None,
            description: None,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: "u1".into(),
            updated_at: None,
            updated_by: None,
        }
    }

    #[test]
    fn activity_classes_follow_account_type() {
        assert_eq!(classify_activity(GlAccountType::Revenue), ActivityClass::Operating);
        assert_eq!(classify_activity(GlAccountType::Expense), ActivityClass::Operating);
        assert_eq!(classify_activity(GlAccountType::Asset), ActivityClass::Investing);
        assert_eq!(classify_activity(GlAccountType::Liability), ActivityClass::Financing);
        assert_eq!(classify_activity(GlAccountType::Equity), ActivityClass::Financing);
        assert_eq!(classify_activity(GlAccountType::Other), ActivityClass::Operating);
    }

    #[test]
    fn cash_accounts_are_recognised_by_name_token() {
        assert!(is_cash_account(&account("Petty Cash", GlAccountType::Asset)));
        assert!(is_cash_account(&account("First National Bank", GlAccountType::Asset)));
        assert!(!is_cash_account(&account("Accounts Receivable", GlAccountType::Asset)));
    }
}

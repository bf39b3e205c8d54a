//! Chart-of-accounts maintenance and the journal entry lifecycle.
//!
//! Posting is the only code path that touches `gl_account_balances`, and the
//! transition to posted is one-way: an unposted entry may be deleted, a
//! posted one may not.

use std::sync::Arc;

use chrono::Utc;
use event_bus::{DomainEvent, EventKind};
use persistence::{ConnectionPool, DbConnection, Params, Record, Repository};
use platform_audit::{AuditActionType, AuditEntry};
use platform_contracts::{EntityStatus, LogSeverity, ServiceError, ServiceResult};
use serde_json::json;
use service_core::ServiceContext;
use uuid::Uuid;

use crate::records::{
    GlAccount, GlAccountBalance, GlAccountType, JournalEntry, JournalEntryDetail, NormalBalance,
};
use crate::repos::{account_repo, balance_repo, journal_repo};
use crate::validation::{
    details_are_balanced, validate_balanced, validate_detail, JournalValidationError,
};

const MODULE: &str = "Finance";
const SERVICE: &str = "GeneralLedgerService";

/// Balances carry a single currency until multi-currency ledgers land.
pub const BALANCE_CURRENCY: &str = "USD";

/// Input for creating a GL account.
#[derive(Debug, Clone)]
pub struct NewGlAccount {
    pub account_number: String,
    pub account_name: String,
    pub account_type: GlAccountType,
    pub normal_balance: NormalBalance,
    pub parent_account_id: Option<String>,
    pub description: Option<String>,
}

/// Input for a journal entry header.
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub journal_number: String,
    pub description: String,
    pub entry_date: chrono::DateTime<Utc>,
    pub reference: Option<String>,
}

/// Input for one journal entry line.
#[derive(Debug, Clone)]
pub struct NewJournalEntryDetail {
    pub gl_account_id: String,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub notes: Option<String>,
}

pub struct GeneralLedgerService {
    ctx: Arc<ServiceContext>,
    accounts: Repository<GlAccount>,
    balances: Repository<GlAccountBalance>,
    entries: Repository<JournalEntry>,
    details: Repository<JournalEntryDetail>,
}

impl GeneralLedgerService {
    pub fn new(ctx: Arc<ServiceContext>, pool: Arc<ConnectionPool>) -> Self {
        Self {
            ctx,
            accounts: account_repo::repository(Arc::clone(&pool)),
            balances: balance_repo::repository(Arc::clone(&pool)),
            entries: journal_repo::entries_repository(Arc::clone(&pool)),
            details: journal_repo::details_repository(pool),
        }
    }

    // ---- Chart of accounts -------------------------------------------------

    pub fn create_gl_account(
        &self,
        input: NewGlAccount,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<GlAccount> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.CreateGLAccount",
            "You do not have permission to create GL accounts.",
        )?;

        if input.account_number.is_empty() || input.account_name.is_empty() {
            return Err(ServiceError::invalid_input(
                "account number and name are required",
            ));
        }
        if account_repo::number_taken(&self.accounts, &input.account_number, None)? {
            return Err(ServiceError::invalid_input(format!(
                "account number '{}' already exists",
                input.account_number
            )));
        }
        if let Some(parent_id) = &input.parent_account_id {
            self.accounts
                .find_by_id(parent_id)?
                .filter(|parent| parent.status != EntityStatus::Deleted)
                .ok_or_else(|| {
                    ServiceError::invalid_input(format!(
                        "parent account '{parent_id}' does not exist"
                    ))
                })?;
        }

        let account = GlAccount {
            id: Uuid::new_v4().to_string(),
            account_number: input.account_number,
            account_name: input.account_name,
            account_type: input.account_type,
            normal_balance: input.normal_balance,
            parent_account_id: input.parent_account_id,
            description: input.description,
            status: EntityStatus::Active,
            created_at: Utc::now(),
            created_by: user_id.to_string(),
            updated_at: None,
            updated_by: None,
        };

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "create_gl_account", |conn| {
                self.accounts.create_with(conn, &account)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("account create was not committed"));
        }

        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Create,
                LogSeverity::Info,
                MODULE,
                "GLAccount",
            )
            .with_entity(&account.id, "GlAccount", &account.account_number)
            .with_after(account.to_row()),
        );

        tracing::info!(account_number = %account.account_number, "GL account created");
        Ok(account)
    }

    pub fn update_gl_account(
        &self,
        updated: GlAccount,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<GlAccount> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.UpdateGLAccount",
            "You do not have permission to update GL accounts.",
        )?;

        let existing = self
            .accounts
            .find_by_id(&updated.id)?
            .ok_or_else(|| ServiceError::not_found(format!("GL account '{}' not found", updated.id)))?;

        if updated.account_number.is_empty() || updated.account_name.is_empty() {
            return Err(ServiceError::invalid_input(
                "account number and name are required",
            ));
        }
        if account_repo::number_taken(&self.accounts, &updated.account_number, Some(&updated.id))? {
            return Err(ServiceError::invalid_input(format!(
                "account number '{}' already exists",
                updated.account_number
            )));
        }
        if let Some(parent_id) = &updated.parent_account_id {
            if parent_id == &updated.id {
                return Err(ServiceError::invalid_input(
                    "an account cannot be its own parent",
                ));
            }
            self.accounts
                .find_by_id(parent_id)?
                .filter(|parent| parent.status != EntityStatus::Deleted)
                .ok_or_else(|| {
                    ServiceError::invalid_input(format!(
                        "parent account '{parent_id}' does not exist"
                    ))
                })?;
            if account_repo::is_descendant_chain(&self.accounts, &updated.id, parent_id)? {
                return Err(ServiceError::invalid_input(
                    "parent assignment would create a cycle in the account hierarchy",
                ));
            }
        }

        let mut account = updated;
        account.created_at = existing.created_at;
        account.created_by = existing.created_by.clone();
        account.updated_at = Some(Utc::now());
        account.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "update_gl_account", |conn| {
                self.accounts.update_with(conn, &account)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("account update was not committed"));
        }

        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Update,
                LogSeverity::Info,
                MODULE,
                "GLAccount",
            )
            .with_entity(&account.id, "GlAccount", &account.account_number)
            .with_before(existing.to_row())
            .with_after(account.to_row()),
        );

        Ok(account)
    }

    /// Toggle between Active and Inactive; the Deleted state is only
    /// reachable through [`delete_gl_account`](Self::delete_gl_account).
    pub fn update_gl_account_status(
        &self,
        account_id: &str,
        new_status: EntityStatus,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.UpdateGLAccount",
            "You do not have permission to change GL account status.",
        )?;

        if !matches!(new_status, EntityStatus::Active | EntityStatus::Inactive) {
            return Err(ServiceError::invalid_input(format!(
                "GL account status may only move between Active and Inactive, got {new_status}"
            )));
        }

        let existing = self
            .accounts
            .find_by_id(account_id)?
            .ok_or_else(|| ServiceError::not_found(format!("GL account '{account_id}' not found")))?;

        let mut account = existing.clone();
        account.status = new_status;
        account.updated_at = Some(Utc::now());
        account.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "update_gl_account_status", |conn| {
                self.accounts.update_with(conn, &account)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("status update was not committed"));
        }

        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::StatusChange,
                LogSeverity::Info,
                MODULE,
                "GLAccount",
            )
            .with_entity(account_id, "GlAccount", &account.account_number)
            .with_before(existing.to_row())
            .with_after(account.to_row()),
        );

        Ok(())
    }

    /// Soft-delete an account. Rejected while a balance row exists or any
    /// posted detail references the account.
    pub fn delete_gl_account(
        &self,
        account_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.DeleteGLAccount",
            "You do not have permission to delete GL accounts.",
        )?;

        let existing = self
            .accounts
            .find_by_id(account_id)?
            .ok_or_else(|| ServiceError::not_found(format!("GL account '{account_id}' not found")))?;

        if balance_repo::exists_for_account(&self.balances, account_id)? {
            return Err(ServiceError::invalid_input(format!(
                "account '{}' has a balance and cannot be deleted",
                existing.account_number
            )));
        }
        if journal_repo::account_has_posted_activity(&self.entries, account_id)? {
            return Err(ServiceError::invalid_input(format!(
                "account '{}' has posted activity and cannot be deleted",
                existing.account_number
            )));
        }

        let mut account = existing.clone();
        account.status = EntityStatus::Deleted;
        account.updated_at = Some(Utc::now());
        account.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "delete_gl_account", |conn| {
                self.accounts.update_with(conn, &account)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("account delete was not committed"));
        }

        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Delete,
                LogSeverity::Warning,
                MODULE,
                "GLAccount",
            )
            .with_entity(account_id, "GlAccount", &existing.account_number)
            .with_before(existing.to_row()),
        );

        Ok(())
    }

    pub fn get_gl_account_by_id(
        &self,
        account_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<GlAccount>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.GLAccounts.View",
            "You do not have permission to view GL accounts.",
        )?;
        let account = self.accounts.find_by_id(account_id)?;
        Ok(account.filter(|a| a.status != EntityStatus::Deleted))
    }

    pub fn get_gl_account_by_number(
        &self,
        account_number: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<GlAccount>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.GLAccounts.View",
            "You do not have permission to view GL accounts.",
        )?;
        let account = account_repo::find_by_number(&self.accounts, account_number)?;
        Ok(account.filter(|a| a.status != EntityStatus::Deleted))
    }

    pub fn list_gl_accounts(
        &self,
        filter: &Params,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<GlAccount>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.GLAccounts.View",
            "You do not have permission to view GL accounts.",
        )?;
        account_repo::list(&self.accounts, filter)
    }

    pub fn get_account_balance(
        &self,
        account_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<GlAccountBalance>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.GLAccounts.View",
            "You do not have permission to view GL account balances.",
        )?;
        balance_repo::find_by_account(&self.balances, account_id)
    }

    // ---- Journal entries ---------------------------------------------------

    pub fn create_journal_entry(
        &self,
        header: NewJournalEntry,
        detail_inputs: Vec<NewJournalEntryDetail>,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<JournalEntry> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.CreateJournalEntry",
            "You do not have permission to create journal entries.",
        )?;

        // Validation order is part of the contract: number, then header
        // shape, then per-line checks, then the balance equation.
        if header.journal_number.is_empty() {
            return Err(invalid(JournalValidationError::EmptyJournalNumber));
        }
        if journal_repo::find_by_number(&self.entries, &header.journal_number)?.is_some() {
            return Err(ServiceError::invalid_input(format!(
                "journal number '{}' already exists",
                header.journal_number
            )));
        }
        if header.description.is_empty() {
            return Err(invalid(JournalValidationError::EmptyDescription));
        }
        if detail_inputs.is_empty() {
            return Err(invalid(JournalValidationError::NoDetails));
        }
        for (index, detail) in detail_inputs.iter().enumerate() {
            self.accounts
                .find_by_id(&detail.gl_account_id)?
                .filter(|account| account.status != EntityStatus::Deleted)
                .ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "line {index}: GL account '{}' does not exist",
                        detail.gl_account_id
                    ))
                })?;
            validate_detail(detail, index).map_err(invalid)?;
        }
        validate_balanced(&detail_inputs).map_err(invalid)?;

        let now = Utc::now();
        let total_debit: f64 = detail_inputs.iter().map(|d| d.debit_amount).sum();
        let total_credit: f64 = detail_inputs.iter().map(|d| d.credit_amount).sum();

        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            journal_number: header.journal_number,
            description: header.description,
            entry_date: header.entry_date,
            posting_date: None,
            reference: header.reference,
            total_debit,
            total_credit,
            posted_by_user_id: None,
            is_posted: false,
            status: EntityStatus::Active,
            created_at: now,
            created_by: user_id.to_string(),
            updated_at: None,
            updated_by: None,
        };
        let details: Vec<JournalEntryDetail> = detail_inputs
            .into_iter()
            .map(|input| JournalEntryDetail {
                id: Uuid::new_v4().to_string(),
                journal_entry_id: entry.id.clone(),
                gl_account_id: input.gl_account_id,
                debit_amount: input.debit_amount,
                credit_amount: input.credit_amount,
                notes: input.notes,
                status: EntityStatus::Active,
                created_at: now,
                created_by: user_id.to_string(),
                updated_at: None,
                updated_by: None,
            })
            .collect();

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "create_journal_entry", |conn| {
                self.entries.create_with(conn, &entry)?;
                for detail in &details {
                    self.details.create_with(conn, detail)?;
                }
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("journal entry create was not committed"));
        }

        self.ctx.publish(DomainEvent::new(
            EventKind::JournalEntryCreated,
            json!({
                "journal_entry_id": entry.id,
                "journal_number": entry.journal_number,
                "total_debit": entry.total_debit,
                "total_credit": entry.total_credit,
                "lines": details.len(),
            }),
        ));
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Create,
                LogSeverity::Info,
                MODULE,
                "JournalEntry",
            )
            .with_entity(&entry.id, "JournalEntry", &entry.journal_number)
            .with_after(entry.to_row()),
        );

        tracing::info!(
            journal_number = %entry.journal_number,
            lines = details.len(),
            "journal entry created"
        );
        Ok(entry)
    }

    /// Apply a journal entry to account balances and stamp it posted.
    ///
    /// Posting an already-posted entry is a success no-op. An entry whose
    /// persisted details no longer balance is *OperationFailed* and nothing
    /// changes.
    pub fn post_journal_entry(
        &self,
        journal_entry_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.PostJournalEntry",
            "You do not have permission to post journal entries.",
        )?;

        let existing = self
            .entries
            .find_by_id(journal_entry_id)?
            .ok_or_else(|| {
                ServiceError::not_found(format!("journal entry '{journal_entry_id}' not found"))
            })?;
        if existing.is_posted {
            tracing::info!(journal_entry_id, "entry already posted; nothing to do");
            return Ok(());
        }

        let details = journal_repo::details_for_entry(&self.details, journal_entry_id)?;
        if details.is_empty() {
            return Err(ServiceError::operation_failed(format!(
                "journal entry '{}' has no details and cannot be posted",
                existing.journal_number
            )));
        }
        if !details_are_balanced(&details) {
            return Err(ServiceError::operation_failed(format!(
                "journal entry '{}' is unbalanced and cannot be posted",
                existing.journal_number
            )));
        }

        let now = Utc::now();
        let mut entry = existing.clone();
        entry.is_posted = true;
        entry.posting_date = Some(now);
        entry.posted_by_user_id = Some(user_id.to_string());
        entry.updated_at = Some(now);
        entry.updated_by = Some(user_id.to_string());

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "post_journal_entry", |conn| {
                for detail in &details {
                    self.apply_detail_to_balance(conn, detail, user_id)?;
                }
                self.entries.update_with(conn, &entry)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("posting was not committed"));
        }

        self.ctx.publish(DomainEvent::new(
            EventKind::JournalEntryPosted,
            json!({
                "journal_entry_id": entry.id,
                "journal_number": entry.journal_number,
                "posted_by_user_id": user_id,
                "total_debit": entry.total_debit,
                "total_credit": entry.total_credit,
            }),
        ));
        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Post,
                LogSeverity::Info,
                MODULE,
                "JournalEntryPosting",
            )
            .with_entity(&entry.id, "JournalEntry", &entry.journal_number)
            .with_before(existing.to_row())
            .with_after(entry.to_row()),
        );

        tracing::info!(journal_number = %entry.journal_number, "journal entry posted");
        Ok(())
    }

    /// Hard-delete an unposted entry and its details. Posted entries are
    /// immutable; undoing one requires an explicit reversal entry.
    pub fn delete_journal_entry(
        &self,
        journal_entry_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<()> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.DeleteJournalEntry",
            "You do not have permission to delete journal entries.",
        )?;

        let existing = self
            .entries
            .find_by_id(journal_entry_id)?
            .ok_or_else(|| {
                ServiceError::not_found(format!("journal entry '{journal_entry_id}' not found"))
            })?;
        if existing.is_posted {
            return Err(ServiceError::invalid_input(format!(
                "journal entry '{}' is posted and cannot be deleted",
                existing.journal_number
            )));
        }

        let committed = self
            .ctx
            .execute_transaction(SERVICE, "delete_journal_entry", |conn| {
                journal_repo::remove_details_for_entry_with(&self.details, conn, journal_entry_id)?;
                self.entries.remove_with(conn, journal_entry_id)?;
                Ok(true)
            })?;
        if !committed {
            return Err(ServiceError::operation_failed("journal entry delete was not committed"));
        }

        self.ctx.record_audit(
            AuditEntry::new(
                user_id,
                self.ctx.user_name(user_id),
                AuditActionType::Delete,
                LogSeverity::Warning,
                MODULE,
                "JournalEntry",
            )
            .with_entity(journal_entry_id, "JournalEntry", &existing.journal_number)
            .with_before(existing.to_row()),
        );

        Ok(())
    }

    pub fn get_journal_entry(
        &self,
        journal_entry_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<JournalEntry>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.JournalEntries.View",
            "You do not have permission to view journal entries.",
        )?;
        self.entries.find_by_id(journal_entry_id)
    }

    pub fn get_journal_entry_by_number(
        &self,
        journal_number: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Option<JournalEntry>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.JournalEntries.View",
            "You do not have permission to view journal entries.",
        )?;
        journal_repo::find_by_number(&self.entries, journal_number)
    }

    pub fn list_journal_entries(
        &self,
        filter: &Params,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<JournalEntry>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.JournalEntries.View",
            "You do not have permission to view journal entries.",
        )?;
        self.entries.find(filter)
    }

    pub fn get_journal_entry_details(
        &self,
        journal_entry_id: &str,
        user_id: &str,
        role_ids: &[String],
    ) -> ServiceResult<Vec<JournalEntryDetail>> {
        self.ctx.check_permission(
            user_id,
            role_ids,
            "Finance.JournalEntries.View",
            "You do not have permission to view journal entry details.",
        )?;
        journal_repo::details_for_entry(&self.details, journal_entry_id)
    }

    /// Add one detail's amounts to its account balance, creating the balance
    /// row on first touch.
    fn apply_detail_to_balance(
        &self,
        conn: &mut dyn DbConnection,
        detail: &JournalEntryDetail,
        user_id: &str,
    ) -> ServiceResult<()> {
        let now = Utc::now();
        match balance_repo::find_by_account_with(&self.balances, conn, &detail.gl_account_id)? {
            Some(mut balance) => {
                balance.current_debit_balance += detail.debit_amount;
                balance.current_credit_balance += detail.credit_amount;
                balance.last_posted_date = now;
                balance.updated_at = Some(now);
                balance.updated_by = Some(user_id.to_string());
                self.balances.update_with(conn, &balance)
            }
            None => {
                let balance = GlAccountBalance {
                    id: Uuid::new_v4().to_string(),
                    gl_account_id: detail.gl_account_id.clone(),
                    current_debit_balance: detail.debit_amount,
                    current_credit_balance: detail.credit_amount,
                    currency: BALANCE_CURRENCY.to_string(),
                    last_posted_date: now,
                    status: EntityStatus::Active,
                    created_at: now,
                    created_by: user_id.to_string(),
                    updated_at: None,
                    updated_by: None,
                };
                self.balances.create_with(conn, &balance)
            }
        }
    }
}

fn invalid(error: JournalValidationError) -> ServiceError {
    ServiceError::invalid_input(error.to_string())
}

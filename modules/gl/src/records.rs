//! Ledger records and their row projections.

use chrono::{DateTime, Utc};
use persistence::row::{
    get_bool, get_f64, get_i64, get_opt_text, get_opt_timestamp, get_status, get_text,
    get_timestamp,
};
use persistence::{Record, Row};
use platform_contracts::{EntityStatus, ServiceResult};
use serde::{Deserialize, Serialize};

/// Classification of an account within the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlAccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
    Other,
}

impl GlAccountType {
    pub fn code(self) -> i64 {
        match self {
            GlAccountType::Asset => 0,
            GlAccountType::Liability => 1,
            GlAccountType::Equity => 2,
            GlAccountType::Revenue => 3,
            GlAccountType::Expense => 4,
            GlAccountType::Other => 5,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => GlAccountType::Asset,
            1 => GlAccountType::Liability,
            2 => GlAccountType::Equity,
            3 => GlAccountType::Revenue,
            4 => GlAccountType::Expense,
            _ => GlAccountType::Other,
        }
    }
}

/// The side on which an account customarily carries positive balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl NormalBalance {
    pub fn code(self) -> i64 {
        match self {
            NormalBalance::Debit => 0,
            NormalBalance::Credit => 1,
        }
    }

    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            NormalBalance::Credit
        } else {
            NormalBalance::Debit
        }
    }
}

/// One account in the chart of accounts. Accounts form a forest through
/// `parent_account_id`; an account can never be its own ancestor.
#[derive(Debug, Clone, PartialEq)]
pub struct GlAccount {
    pub id: String,
    pub account_number: String,
    pub account_name: String,
    pub account_type: GlAccountType,
    pub normal_balance: NormalBalance,
    pub parent_account_id: Option<String>,
    pub description: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Record for GlAccount {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("account_number".into(), self.account_number.clone().into());
        row.insert("account_name".into(), self.account_name.clone().into());
        row.insert("account_type".into(), self.account_type.code().into());
        row.insert("normal_balance".into(), self.normal_balance.code().into());
        row.insert(
            "parent_account_id".into(),
            self.parent_account_id.clone().into(),
        );
        row.insert("description".into(), self.description.clone().into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            account_number: get_text(row, "account_number")?,
            account_name: get_text(row, "account_name")?,
            account_type: GlAccountType::from_code(get_i64(row, "account_type")?),
            normal_balance: NormalBalance::from_code(get_i64(row, "normal_balance")?),
            parent_account_id: get_opt_text(row, "parent_account_id"),
            description: get_opt_text(row, "description"),
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

/// Running totals per account. Created lazily on first posting; updated only
/// by the posting routine. Both totals are non-negative and only grow.
#[derive(Debug, Clone, PartialEq)]
pub struct GlAccountBalance {
    pub id: String,
    pub gl_account_id: String,
    pub current_debit_balance: f64,
    pub current_credit_balance: f64,
    pub currency: String,
    pub last_posted_date: DateTime<Utc>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl GlAccountBalance {
    /// Net position adjusted for nothing; debit minus credit.
    pub fn net(&self) -> f64 {
        self.current_debit_balance - self.current_credit_balance
    }
}

impl Record for GlAccountBalance {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("gl_account_id".into(), self.gl_account_id.clone().into());
        row.insert(
            "current_debit_balance".into(),
            self.current_debit_balance.into(),
        );
        row.insert(
            "current_credit_balance".into(),
            self.current_credit_balance.into(),
        );
        row.insert("currency".into(), self.currency.clone().into());
        row.insert("last_posted_date".into(), self.last_posted_date.into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            gl_account_id: get_text(row, "gl_account_id")?,
            current_debit_balance: get_f64(row, "current_debit_balance")?,
            current_credit_balance: get_f64(row, "current_credit_balance")?,
            currency: get_text(row, "currency")?,
            last_posted_date: get_timestamp(row, "last_posted_date")?,
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

/// Journal entry header. `is_posted`, `posting_date`, and `posted_by_user_id`
/// move together: all unset until posting, all set after, never back.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub id: String,
    pub journal_number: String,
    pub description: String,
    pub entry_date: DateTime<Utc>,
    pub posting_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub posted_by_user_id: Option<String>,
    pub is_posted: bool,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Record for JournalEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert("journal_number".into(), self.journal_number.clone().into());
        row.insert("description".into(), self.description.clone().into());
        row.insert("entry_date".into(), self.entry_date.into());
        row.insert("posting_date".into(), self.posting_date.into());
        row.insert("reference".into(), self.reference.clone().into());
        row.insert("total_debit".into(), self.total_debit.into());
        row.insert("total_credit".into(), self.total_credit.into());
        row.insert(
            "posted_by_user_id".into(),
            self.posted_by_user_id.clone().into(),
        );
        row.insert("is_posted".into(), self.is_posted.into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            journal_number: get_text(row, "journal_number")?,
            description: get_text(row, "description")?,
            entry_date: get_timestamp(row, "entry_date")?,
            posting_date: get_opt_timestamp(row, "posting_date"),
            reference: get_opt_text(row, "reference"),
            total_debit: get_f64(row, "total_debit")?,
            total_credit: get_f64(row, "total_credit")?,
            posted_by_user_id: get_opt_text(row, "posted_by_user_id"),
            is_posted: get_bool(row, "is_posted")?,
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

/// One line of a journal entry. Exactly one of debit/credit is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntryDetail {
    pub id: String,
    pub journal_entry_id: String,
    pub gl_account_id: String,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub notes: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Record for JournalEntryDetail {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), self.id.clone().into());
        row.insert(
            "journal_entry_id".into(),
            self.journal_entry_id.clone().into(),
        );
        row.insert("gl_account_id".into(), self.gl_account_id.clone().into());
        row.insert("debit_amount".into(), self.debit_amount.into());
        row.insert("credit_amount".into(), self.credit_amount.into());
        row.insert("notes".into(), self.notes.clone().into());
        row.insert("status".into(), self.status.code().into());
        row.insert("created_at".into(), self.created_at.into());
        row.insert("created_by".into(), self.created_by.clone().into());
        row.insert("updated_at".into(), self.updated_at.into());
        row.insert("updated_by".into(), self.updated_by.clone().into());
        row
    }

    fn from_row(row: &Row) -> ServiceResult<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            journal_entry_id: get_text(row, "journal_entry_id")?,
            gl_account_id: get_text(row, "gl_account_id")?,
            debit_amount: get_f64(row, "debit_amount")?,
            credit_amount: get_f64(row, "credit_amount")?,
            notes: get_opt_text(row, "notes"),
            status: get_status(row),
            created_at: get_timestamp(row, "created_at")?,
            created_by: get_text(row, "created_by")?,
            updated_at: get_opt_timestamp(row, "updated_at"),
            updated_by: get_opt_text(row, "updated_by"),
        })
    }
}

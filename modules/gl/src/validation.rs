//! Pure validation over journal entry inputs.
//!
//! Account existence is checked by the service (it needs the repository);
//! everything below is shape and arithmetic.

use thiserror::Error;

use crate::records::JournalEntryDetail;
use crate::services::ledger_service::NewJournalEntryDetail;

/// Monetary tolerance for the balanced-entry invariant.
pub const BALANCE_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum JournalValidationError {
    #[error("journal number must not be empty")]
    EmptyJournalNumber,

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("a journal entry requires at least one detail line")]
    NoDetails,

    #[error("line {0}: debit must be non-negative, got {1}")]
    NegativeDebit(usize, f64),

    #[error("line {0}: credit must be non-negative, got {1}")]
    NegativeCredit(usize, f64),

    #[error("line {0}: exactly one of debit and credit may be positive")]
    BothSidesSet(usize),

    #[error("line {0}: gl_account_id must not be empty")]
    EmptyAccountId(usize),

    #[error("total debits ({0}) must equal total credits ({1})")]
    Unbalanced(f64, f64),
}

/// Validate the shape of one detail line.
pub fn validate_detail(detail: &NewJournalEntryDetail, index: usize) -> Result<(), JournalValidationError> {
    if detail.gl_account_id.is_empty() {
        return Err(JournalValidationError::EmptyAccountId(index));
    }
    if detail.debit_amount < 0.0 {
        return Err(JournalValidationError::NegativeDebit(index, detail.debit_amount));
    }
    if detail.credit_amount < 0.0 {
        return Err(JournalValidationError::NegativeCredit(index, detail.credit_amount));
    }
    if detail.debit_amount * detail.credit_amount != 0.0 {
        return Err(JournalValidationError::BothSidesSet(index));
    }
    Ok(())
}

/// Validate that debits equal credits within [`BALANCE_TOLERANCE`].
pub fn validate_balanced(details: &[NewJournalEntryDetail]) -> Result<(), JournalValidationError> {
    let total_debit: f64 = details.iter().map(|d| d.debit_amount).sum();
    let total_credit: f64 = details.iter().map(|d| d.credit_amount).sum();
    if (total_debit - total_credit).abs() > BALANCE_TOLERANCE {
        return Err(JournalValidationError::Unbalanced(total_debit, total_credit));
    }
    Ok(())
}

/// Balance re-check over persisted details, used at posting time to catch
/// stale or tampered entries.
pub fn details_are_balanced(details: &[JournalEntryDetail]) -> bool {
    let total_debit: f64 = details.iter().map(|d| d.debit_amount).sum();
    let total_credit: f64 = details.iter().map(|d| d.credit_amount).sum();
    (total_debit - total_credit).abs() <= BALANCE_TOLERANCE
}

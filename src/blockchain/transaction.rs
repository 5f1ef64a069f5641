use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tax percentage applied when the caller does not supply one
pub const DEFAULT_TAX_PERCENT: f64 = 1.0;

/// Errors that can occur while constructing a transaction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    #[error("Invalid amount: {0} (must be finite and non-negative)")]
    InvalidAmount(f64),

    #[error("Invalid tax rate: {0}% (must be finite and non-negative)")]
    InvalidTaxRate(f64),
}

/// A transfer of value between two parties.
///
/// The tax is derived once at construction and never recomputed. The field
/// order below is the order used in the canonical JSON encoding, so it must
/// not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: Uuid,

    /// Timestamp when the transaction was created
    pub timestamp: DateTime<Utc>,

    /// Sender identifier
    pub sender: String,

    /// Receiver identifier
    pub receiver: String,

    /// Amount being transferred
    pub amount: f64,

    /// Tax charged on the amount
    pub tax: f64,
}

impl Transaction {
    /// Creates a transaction stamped with the current time and the default 1% tax
    ///
    /// # Arguments
    ///
    /// * `sender` - The sender identifier
    /// * `receiver` - The receiver identifier
    /// * `amount` - The amount to transfer
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
    ) -> Result<Self, TransactionError> {
        Self::with_tax(Utc::now(), sender, receiver, amount, DEFAULT_TAX_PERCENT)
    }

    /// Creates a transaction with a caller-supplied timestamp and tax percentage
    ///
    /// # Arguments
    ///
    /// * `timestamp` - When the transaction was created
    /// * `sender` - The sender identifier
    /// * `receiver` - The receiver identifier
    /// * `amount` - The amount to transfer
    /// * `tax_percent` - Tax as a percentage of `amount` (1.0 means 1%)
    pub fn with_tax(
        timestamp: DateTime<Utc>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        tax_percent: f64,
    ) -> Result<Self, TransactionError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TransactionError::InvalidAmount(amount));
        }
        if !tax_percent.is_finite() || tax_percent < 0.0 {
            return Err(TransactionError::InvalidTaxRate(tax_percent));
        }

        Ok(Transaction {
            id: Uuid::new_v4(),
            timestamp,
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            tax: amount * (tax_percent / 100.0),
        })
    }

    /// Amount plus tax
    pub fn total_amount(&self) -> f64 {
        self.amount + self.tax
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_transaction_default_tax() {
        let tx = Transaction::new("Saul", "Bush", 10.0).unwrap();

        assert_eq!(tx.sender, "Saul");
        assert_eq!(tx.receiver, "Bush");
        assert_eq!(tx.amount, 10.0);
        assert_eq!(tx.tax, 0.1);
        assert!(!tx.id.is_nil());
    }

    #[test]
    fn test_custom_tax() {
        let at = Utc.with_ymd_and_hms(2025, 10, 23, 15, 0, 56).unwrap();
        let tx = Transaction::with_tax(at, "a", "b", 200.0, 5.0).unwrap();

        assert_eq!(tx.timestamp, at);
        assert_eq!(tx.tax, 10.0);
        assert_eq!(tx.total_amount(), 210.0);
    }

    #[test]
    fn test_zero_tax_and_zero_amount() {
        let at = Utc::now();
        assert_eq!(Transaction::with_tax(at, "a", "b", 42.0, 0.0).unwrap().tax, 0.0);
        assert_eq!(Transaction::with_tax(at, "a", "b", 0.0, 3.0).unwrap().tax, 0.0);
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        assert_eq!(
            Transaction::new("a", "b", -1.0),
            Err(TransactionError::InvalidAmount(-1.0))
        );
        assert!(Transaction::new("a", "b", f64::NAN).is_err());
        assert!(Transaction::new("a", "b", f64::INFINITY).is_err());
        assert_eq!(
            Transaction::with_tax(Utc::now(), "a", "b", 1.0, -2.0),
            Err(TransactionError::InvalidTaxRate(-2.0))
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Transaction::new("a", "b", 1.0).unwrap();
        let b = Transaction::new("a", "b", 1.0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_json_field_order() {
        let at = Utc.with_ymd_and_hms(2025, 10, 23, 15, 0, 56).unwrap();
        let tx = Transaction::with_tax(at, "Saul", "Bush", 10.0, 1.0).unwrap();
        let json = serde_json::to_string(&tx).unwrap();

        let expected = format!(
            "{{\"id\":\"{}\",\"timestamp\":\"2025-10-23T15:00:56Z\",\"sender\":\"Saul\",\"receiver\":\"Bush\",\"amount\":10.0,\"tax\":0.1}}",
            tx.id
        );
        assert_eq!(json, expected);
    }
}

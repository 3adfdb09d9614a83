//! Boundary to the authoritative remote canvas store.
//!
//! The engine only talks to the store through [`RemoteStore`]. Transport,
//! retries and authentication are properties of the implementation.

mod memory;
pub use memory::*;

use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellPos, ColorIndex, CreditPlan, TokenUnits};

/// Signed-in identity, opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(String);

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the payment-linking service, handed to the payment flow as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkerRef(String);

impl LinkerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LinkerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub type TransactionId = u64;

/// Failure of a whole remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Why the store refused to commit a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitErrorKind {
    GenericError { message: String },
    /// The payment link is not connected.
    Unproxied,
    /// The payment link is busy with another request.
    Locked,
    InsufficientBalance { balance: u128 },
    InsufficientAllowance { allowance: u128 },
}

impl CommitErrorKind {
    /// Human readable explanation, amounts rendered with `units`.
    pub fn describe(&self, units: &TokenUnits) -> String {
        match self {
            CommitErrorKind::GenericError { message } => message.clone(),
            CommitErrorKind::Unproxied => "You are not connected to your payment link".to_string(),
            CommitErrorKind::Locked => "Please wait, your payment link is busy".to_string(),
            CommitErrorKind::InsufficientBalance { balance } => {
                format!("Your payment link only has {}", units.display(*balance))
            }
            CommitErrorKind::InsufficientAllowance { allowance } => {
                format!("Your payment link only allows spending {}", units.display(*allowance))
            }
        }
    }
}

impl Display for CommitErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitErrorKind::GenericError { message } => write!(f, "{message}"),
            CommitErrorKind::Unproxied => write!(f, "payment link not connected"),
            CommitErrorKind::Locked => write!(f, "payment link busy"),
            CommitErrorKind::InsufficientBalance { balance } => write!(f, "insufficient balance ({balance})"),
            CommitErrorKind::InsufficientAllowance { allowance } => write!(f, "insufficient allowance ({allowance})"),
        }
    }
}

/// Per-item result of a commit, aligned with the submitted items.
pub type CommitResult = std::result::Result<TransactionId, CommitErrorKind>;

/// One cell of a commit batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitItem {
    pub x: u32,
    pub y: u32,
    pub color: ColorIndex,
    /// Optional idempotency fields.
    pub memo: Option<Vec<u8>>,
    pub created_at: Option<u64>,
}

impl CommitItem {
    pub fn pos(&self) -> CellPos {
        CellPos::new(self.x, self.y)
    }
}

/// Operations of the authoritative canvas store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn dimensions(&self) -> Result<(u32, u32), RemoteError>;

    async fn credit_plans(&self) -> Result<Vec<CreditPlan>, RemoteError>;

    async fn payment_linker(&self) -> Result<LinkerRef, RemoteError>;

    async fn credits_of(&self, account: &Account) -> Result<u64, RemoteError>;

    /// Reads `count` cells starting at the linear cursor `(x, y)` of the
    /// row-major canvas. Reads wrap across row ends.
    async fn cells_from(&self, x: u32, y: u32, count: usize) -> Result<Vec<ColorIndex>, RemoteError>;

    /// Commits `items` on behalf of `account`. One result per item, same order.
    async fn commit_cells(&self, account: &Account, items: &[CommitItem]) -> Result<Vec<CommitResult>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_renders_token_amounts() {
        let units = TokenUnits::new("ICP", 8);
        assert_eq!(
            CommitErrorKind::InsufficientBalance { balance: 50_000_000 }.describe(&units),
            "Your payment link only has 0.50000000 ICP"
        );
        assert_eq!(
            CommitErrorKind::GenericError {
                message: "pixel locked".to_string()
            }
            .describe(&units),
            "pixel locked"
        );
        assert_eq!(CommitErrorKind::Locked.to_string(), "payment link busy");
    }
}

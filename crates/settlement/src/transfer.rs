//! Transfer/deposit instruction rendering and the settlement run record.
//!
//! Pure string formatting, kept apart from the ledger-mutating settlement
//! step. Output is chat-style: one mention + integer amount per line,
//! chunked for the downstream message-size limit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lootpool_core::{CharacterId, Entity, Money, TransferLogId};

/// Hard limit of the downstream messaging collaborator.
pub const MESSAGE_CHARACTER_LIMIT: usize = 1500;

const CONTINUATION_MARKER: &str = "...transfer list continued";

/// Render "give" instructions, one per participant, excluding the seller.
///
/// When the accumulated text would pass [`MESSAGE_CHARACTER_LIMIT`], a new
/// chunk is started with a continuation marker; entries are never truncated
/// or dropped, and each participant appears exactly once across all chunks.
pub fn render_transfer_command(totals: &[(String, Money)], exclude: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (name, amount) in totals {
        if name == exclude {
            continue;
        }
        let line = format!("give @{name} {amount}");

        if !current.is_empty() && current.len() + 1 + line.len() > MESSAGE_CHARACTER_LIMIT {
            chunks.push(std::mem::take(&mut current));
            current.push_str(CONTINUATION_MARKER);
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Render the seller's deposit instruction.
///
/// A seller converting their own share to pool credit deposits it (plus the
/// rounding leftover) along with everyone else's shares; a seller taking
/// cash deposits only what is owed to others.
pub fn render_deposit_command(
    others_share: Money,
    own_share: Money,
    keep_own_share_as_credit: bool,
    leftover: Money,
) -> String {
    if keep_own_share_as_credit {
        let total = others_share + own_share + leftover;
        format!(
            "deposit {total}\n(own share {own_share} and leftover {leftover} converted to credit)"
        )
    } else {
        format!(
            "deposit {others_share}\n(own share {own_share} and leftover {leftover} taken in cash)"
        )
    }
}

/// Immutable record of one settlement run.
///
/// `all_done` is a user-facing checklist marker with no effect on balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLog {
    id: TransferLogId,
    seller: CharacterId,
    total_amount: Money,
    item_count: usize,
    deposit_command: String,
    transfer_chunks: Vec<String>,
    all_done: bool,
    created_at: DateTime<Utc>,
}

impl TransferLog {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TransferLogId,
        seller: CharacterId,
        total_amount: Money,
        item_count: usize,
        deposit_command: String,
        transfer_chunks: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            seller,
            total_amount,
            item_count,
            deposit_command,
            transfer_chunks,
            all_done: false,
            created_at,
        }
    }

    pub fn id_typed(&self) -> TransferLogId {
        self.id
    }

    pub fn seller(&self) -> CharacterId {
        self.seller
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn deposit_command(&self) -> &str {
        &self.deposit_command
    }

    pub fn transfer_chunks(&self) -> &[String] {
        &self.transfer_chunks
    }

    pub fn all_done(&self) -> bool {
        self.all_done
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Tick the checklist. Balances are untouched.
    pub fn marked_done(&self) -> Self {
        Self {
            all_done: true,
            ..self.clone()
        }
    }
}

impl Entity for TransferLog {
    type Id = TransferLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

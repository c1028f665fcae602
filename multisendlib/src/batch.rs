// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::amount::{format_amount, NATIVE_DECIMALS};
use crate::common::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Total transfer amount overflows 256 bits")]
    TotalOverflow,
}

/// A single queued transfer. Amounts are fixed in base units at insertion time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEntry {
    pub recipient: Address,
    pub amount: Amount,
}

/// All queued transfers of one token, in insertion order.
///
/// The decimals hint is used for display formatting only, never for on-chain
/// arithmetic. The hint supplied when the group is created wins for its
/// lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGroup {
    pub token: Address,
    pub decimals: u8,
    pub entries: Vec<TransferEntry>,
}

impl TokenGroup {
    /// Sum of all queued amounts for this token.
    pub fn required_total(&self) -> Amount {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

/// The queued state of a batch: native transfers plus per-token groups.
///
/// Groups are kept in creation order because submission walks them in that
/// order. Entries are only ever appended or cleared, never mutated in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
    native: Vec<TransferEntry>,
    tokens: Vec<TokenGroup>,
}

/// Pure aggregate view over a [`BatchState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub native_transfers: usize,
    pub token_transfers: usize,
    pub distinct_tokens: usize,
    pub unique_recipients: usize,
    pub total_transfers: usize,
    /// Total queued native value in decimal display form.
    pub total_native_value: String,
}

impl BatchState {
    /// Append a native transfer. Rejects entries that would push the total
    /// native value past 256 bits, so [`BatchState::native_total`] is
    /// infallible.
    pub fn push_native(&mut self, entry: TransferEntry) -> Result<(), Error> {
        self.native_total()
            .checked_add(entry.amount)
            .ok_or(Error::TotalOverflow)?;
        self.native.push(entry);
        Ok(())
    }

    /// Append a token transfer, creating the token's group on first use.
    pub fn push_token(
        &mut self,
        token: Address,
        decimals: u8,
        entry: TransferEntry,
    ) -> Result<(), Error> {
        if let Some(group) = self.tokens.iter_mut().find(|group| group.token == token) {
            group
                .required_total()
                .checked_add(entry.amount)
                .ok_or(Error::TotalOverflow)?;
            group.entries.push(entry);
        } else {
            self.tokens.push(TokenGroup {
                token,
                decimals,
                entries: vec![entry],
            });
        }
        Ok(())
    }

    /// Drop all queued entries. Idempotent.
    pub fn clear(&mut self) {
        self.native.clear();
        self.tokens.clear();
    }

    pub fn native_entries(&self) -> &[TransferEntry] {
        &self.native
    }

    pub fn token_groups(&self) -> &[TokenGroup] {
        &self.tokens
    }

    pub fn group(&self, token: &Address) -> Option<&TokenGroup> {
        self.tokens.iter().find(|group| &group.token == token)
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.tokens.is_empty()
    }

    /// Sum of all queued native amounts. Never overflows, see
    /// [`BatchState::push_native`].
    pub fn native_total(&self) -> Amount {
        self.native.iter().map(|entry| entry.amount).sum()
    }

    /// Distinct recipients across native and token entries combined.
    pub fn unique_recipient_count(&self) -> usize {
        let mut recipients: HashSet<Address> =
            self.native.iter().map(|entry| entry.recipient).collect();
        for group in &self.tokens {
            recipients.extend(group.entries.iter().map(|entry| entry.recipient));
        }
        recipients.len()
    }

    pub fn status(&self) -> BatchStatus {
        let native_transfers = self.native.len();
        let token_transfers = self.tokens.iter().map(|group| group.entries.len()).sum();
        BatchStatus {
            native_transfers,
            token_transfers,
            distinct_tokens: self.tokens.len(),
            unique_recipients: self.unique_recipient_count(),
            total_transfers: native_transfers + token_transfers,
            total_native_value: format_amount(self.native_total(), NATIVE_DECIMALS),
        }
    }
}

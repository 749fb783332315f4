//! Read-only access to upstream accounts.

use crate::core::account::{Account, Platform};
use std::sync::Arc;

/// Source of accounts for dispatch.
pub trait AccountStore: Send + Sync {
    /// An account able to serve `platform`, if any.
    fn select(&self, platform: Platform) -> Option<Arc<Account>>;
}

/// Accounts loaded once from configuration.
///
/// Selection is first-match in configuration order.
#[derive(Debug, Default)]
pub struct StaticAccountStore {
    accounts: Vec<Arc<Account>>,
}

impl StaticAccountStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Log loaded accounts at startup.
    pub fn log_accounts(&self) {
        for account in &self.accounts {
            tracing::info!(
                account_id = account.id,
                account_name = %account.name,
                platform = %account.platform,
                account_type = account.account_type.as_str(),
                codex_cli_only = account.is_codex_cli_only_enabled(),
                "Loaded upstream account"
            );
        }
    }
}

impl AccountStore for StaticAccountStore {
    fn select(&self, platform: Platform) -> Option<Arc<Account>> {
        self.accounts
            .iter()
            .find(|account| account.platform == platform)
            .cloned()
    }
}

//! Alias resolution for candidate accounts.
//!
//! Three-tier fallback, first match wins: the account's own single listed
//! alias, then the externally supplied static table, then the raw account
//! number. Every candidate therefore resolves to some name even when
//! cross-account introspection fails or is unavailable.

use crate::descriptors::AliasTable;

/// Resolves display names for candidate accounts.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    table: AliasTable,
}

impl AliasResolver {
    pub fn new(table: AliasTable) -> Self {
        Self { table }
    }

    /// Resolves an alias for the account.
    ///
    /// `listed_aliases` is the result of the account's own alias-listing
    /// capability, or `None` when no role was assumed (third-party
    /// accounts) or the listing failed. It is only used when exactly one
    /// alias was listed.
    pub fn resolve(&self, account_number: &str, listed_aliases: Option<&[String]>) -> String {
        if let Some(aliases) = listed_aliases
            && aliases.len() == 1
        {
            return aliases[0].clone();
        }

        if let Some(alias) = self.table.get(account_number) {
            return alias.clone();
        }

        account_number.to_string()
    }
}

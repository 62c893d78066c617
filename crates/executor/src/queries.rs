//! The query executor.
//!
//! Read-only visitor over the query sum type. Every query fetches the
//! creator's effective permissions first, then applies the shared access rule:
//! at least one of `All*`, `Domain*` (when the target domain is the
//! creator's own), or `My*` (when the target is the creator) must be held.
//!
//! Errors carry the kind, a detail string, a numeric subcode, and the hash of
//! the offending query.

use crate::error::{QueryError, QueryErrorType};
use crate::kv::StateCommon;
use crate::store::{StateError, StateTransaction};
use crate::{
    key_account_asset_size, key_account_role, key_permissions, key_quorum, key_role, key_signatory,
};
use accord_types::{parse_two_part, Amount, Hash, RolePermission, RolePermissionSet};
use serde_json::{Map, Value};
use std::fmt;

/// Pagination for [`Query::GetAccountAssets`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetPagination {
    /// Asset id to start from; the scan begins at this key within the prefix.
    pub first_asset_id: Option<String>,
    /// Maximum number of entries returned.
    pub page_size: Option<usize>,
}

/// The query alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    GetAccount {
        account_id: String,
    },
    GetSignatories {
        account_id: String,
    },
    GetAccountAssets {
        account_id: String,
        pagination: Option<AssetPagination>,
    },
    GetRolePermissions {
        role_id: String,
    },
    // The remaining queries are served by other subsystems (block store,
    // pending transaction cache) and answer `NotSupported` here.
    GetAccountDetail {
        account_id: String,
    },
    GetRoles,
    GetAssetInfo {
        asset_id: String,
    },
    GetPeers,
    GetBlock {
        height: u64,
    },
    GetTransactions {
        tx_hashes: Vec<String>,
    },
    GetAccountTransactions {
        account_id: String,
    },
    GetAccountAssetTransactions {
        account_id: String,
        asset_id: String,
    },
    GetPendingTransactions,
    GetEngineReceipts {
        tx_hash: String,
    },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::GetAccount { .. } => "GetAccount",
            Query::GetSignatories { .. } => "GetSignatories",
            Query::GetAccountAssets { .. } => "GetAccountAssets",
            Query::GetRolePermissions { .. } => "GetRolePermissions",
            Query::GetAccountDetail { .. } => "GetAccountDetail",
            Query::GetRoles => "GetRoles",
            Query::GetAssetInfo { .. } => "GetAssetInfo",
            Query::GetPeers => "GetPeers",
            Query::GetBlock { .. } => "GetBlock",
            Query::GetTransactions { .. } => "GetTransactions",
            Query::GetAccountTransactions { .. } => "GetAccountTransactions",
            Query::GetAccountAssetTransactions { .. } => "GetAccountAssetTransactions",
            Query::GetPendingTransactions => "GetPendingTransactions",
            Query::GetEngineReceipts { .. } => "GetEngineReceipts",
        }
    }
}

/// One balance row in an assets page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAsset {
    pub account_id: String,
    pub asset_id: String,
    pub balance: Amount,
}

/// Typed success payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    Account {
        account_id: String,
        domain_id: String,
        quorum: u64,
        /// JSON object keyed by writer account id.
        detail: String,
        roles: Vec<String>,
    },
    Signatories(Vec<String>),
    AccountAssets {
        assets: Vec<AccountAsset>,
        /// Total entry count from `account_asset_size`, independent of paging.
        total_count: u64,
        /// Set when the scan stopped on a further key under the same prefix.
        next_asset_id: Option<String>,
    },
    RolePermissions(RolePermissionSet),
}

/// Result of executing one query.
pub type QueryResult = Result<QueryResponse, QueryError>;

/// Executes queries against one state transaction.
pub struct QueryExecutor<'t, T: StateTransaction> {
    common: StateCommon<'t, T>,
}

impl<'t, T: StateTransaction> QueryExecutor<'t, T> {
    pub fn new(tx: &'t mut T) -> Self {
        Self {
            common: StateCommon::new(tx),
        }
    }

    /// Execute one query on behalf of `creator_account_id`.
    pub fn execute(
        &mut self,
        query: &Query,
        creator_account_id: &str,
        query_hash: &Hash,
    ) -> QueryResult {
        let name = query.name();
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| Self::failed(name, e.to_string(), 1, query_hash))?;

        if !self
            .common
            .get(key_permissions!(creator_domain, creator_name))
            .map_err(|e| Self::failed(name, e.to_string(), 1, query_hash))?
        {
            return Err(Self::failed(name, "creator permissions not found", 1, query_hash));
        }
        let creator_permissions = RolePermissionSet::from_bitstring(self.common.value())
            .map_err(|e| Self::failed(name, e.to_string(), 1, query_hash))?;

        match query {
            Query::GetAccount { account_id } => self.get_account(
                account_id,
                creator_account_id,
                creator_domain,
                &creator_permissions,
                query_hash,
            ),
            Query::GetSignatories { account_id } => self.get_signatories(
                account_id,
                creator_account_id,
                creator_domain,
                &creator_permissions,
                query_hash,
            ),
            Query::GetAccountAssets {
                account_id,
                pagination,
            } => self.get_account_assets(
                account_id,
                pagination.as_ref(),
                creator_account_id,
                creator_domain,
                &creator_permissions,
                query_hash,
            ),
            Query::GetRolePermissions { role_id } => {
                self.get_role_permissions(role_id, &creator_permissions, query_hash)
            }
            _ => Err(QueryError::new(
                QueryErrorType::NotSupported,
                name,
                0,
                *query_hash,
            )),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn failed(
        name: &'static str,
        detail: impl fmt::Display,
        code: u32,
        query_hash: &Hash,
    ) -> QueryError {
        QueryError::new(
            QueryErrorType::StatefulFailed,
            format!("{name}: {detail}"),
            code,
            *query_hash,
        )
    }

    fn state_err(name: &'static str, error: StateError, query_hash: &Hash) -> QueryError {
        Self::failed(name, error, 1, query_hash)
    }

    /// The shared access rule for account-scoped queries.
    #[allow(clippy::too_many_arguments)]
    fn require_any(
        creator_permissions: &RolePermissionSet,
        all: RolePermission,
        domain: RolePermission,
        my: RolePermission,
        same_domain: bool,
        is_self: bool,
        name: &'static str,
        query_hash: &Hash,
    ) -> Result<(), QueryError> {
        let allowed = creator_permissions.is_set(all)
            || (same_domain && creator_permissions.is_set(domain))
            || (is_self && creator_permissions.is_set(my));
        if allowed {
            Ok(())
        } else {
            Err(Self::failed(name, "access denied", 2, query_hash))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    fn get_account(
        &mut self,
        account_id: &str,
        creator_account_id: &str,
        creator_domain: &str,
        creator_permissions: &RolePermissionSet,
        query_hash: &Hash,
    ) -> QueryResult {
        let name = "GetAccount";
        let (account_name, domain_id) = parse_two_part(account_id)
            .map_err(|e| Self::failed(name, e, 1, query_hash))?;

        Self::require_any(
            creator_permissions,
            RolePermission::GetAllAccounts,
            RolePermission::GetDomainAccounts,
            RolePermission::GetMyAccount,
            domain_id == creator_domain,
            account_id == creator_account_id,
            name,
            query_hash,
        )?;

        let found = self
            .common
            .get(key_quorum!(domain_id, account_name))
            .map_err(|e| Self::state_err(name, e, query_hash))?;
        if !found {
            return Err(QueryError::new(
                QueryErrorType::NoAccount,
                format!("{name}: no account {account_id}"),
                0,
                *query_hash,
            ));
        }
        let quorum = self
            .common
            .decode_u64()
            .map_err(|e| Self::state_err(name, e, query_hash))?;

        let mut roles = Vec::new();
        {
            let mut scan = self
                .common
                .seek(key_account_role!(domain_id, account_name, ""))
                .map_err(|e| Self::state_err(name, e, query_hash))?;
            while scan.valid() {
                roles.push(scan.suffix().to_owned());
                scan.advance();
            }
            scan.status()
                .map_err(|e| Self::state_err(name, e, query_hash))?;
        }

        // Detail entries are keyed writer_domain/writer_account/key; fold them
        // into {"writer@domain": {key: value}}.
        let mut detail = Map::new();
        {
            let mut scan = self
                .common
                .seek(format_args!("account_detail/{domain_id}/{account_name}/"))
                .map_err(|e| Self::state_err(name, e, query_hash))?;
            while scan.valid() {
                let mut parts = scan.suffix().splitn(3, '/');
                if let (Some(writer_domain), Some(writer_account), Some(key)) =
                    (parts.next(), parts.next(), parts.next())
                {
                    let writer = format!("{writer_account}@{writer_domain}");
                    if let Some(entries) = detail
                        .entry(writer)
                        .or_insert_with(|| Value::Object(Map::new()))
                        .as_object_mut()
                    {
                        entries.insert(key.to_owned(), Value::String(scan.value().to_owned()));
                    }
                }
                scan.advance();
            }
            scan.status()
                .map_err(|e| Self::state_err(name, e, query_hash))?;
        }

        Ok(QueryResponse::Account {
            account_id: account_id.to_owned(),
            domain_id: domain_id.to_owned(),
            quorum,
            detail: Value::Object(detail).to_string(),
            roles,
        })
    }

    fn get_signatories(
        &mut self,
        account_id: &str,
        creator_account_id: &str,
        creator_domain: &str,
        creator_permissions: &RolePermissionSet,
        query_hash: &Hash,
    ) -> QueryResult {
        let name = "GetSignatories";
        let (account_name, domain_id) = parse_two_part(account_id)
            .map_err(|e| Self::failed(name, e, 1, query_hash))?;

        Self::require_any(
            creator_permissions,
            RolePermission::GetAllSignatories,
            RolePermission::GetDomainSignatories,
            RolePermission::GetMySignatories,
            domain_id == creator_domain,
            account_id == creator_account_id,
            name,
            query_hash,
        )?;

        let mut signatories = Vec::new();
        let mut scan = self
            .common
            .seek(key_signatory!(domain_id, account_name, ""))
            .map_err(|e| Self::state_err(name, e, query_hash))?;
        while scan.valid() {
            signatories.push(scan.suffix().to_owned());
            scan.advance();
        }
        scan.status()
            .map_err(|e| Self::state_err(name, e, query_hash))?;
        drop(scan);

        if signatories.is_empty() {
            return Err(QueryError::new(
                QueryErrorType::NoSignatories,
                format!("{name}: no signatories for {account_id}"),
                0,
                *query_hash,
            ));
        }

        Ok(QueryResponse::Signatories(signatories))
    }

    fn get_account_assets(
        &mut self,
        account_id: &str,
        pagination: Option<&AssetPagination>,
        creator_account_id: &str,
        creator_domain: &str,
        creator_permissions: &RolePermissionSet,
        query_hash: &Hash,
    ) -> QueryResult {
        let name = "GetAccountAssets";
        let (account_name, domain_id) = parse_two_part(account_id)
            .map_err(|e| Self::failed(name, e, 1, query_hash))?;

        Self::require_any(
            creator_permissions,
            RolePermission::GetAllAccountAssets,
            RolePermission::GetDomainAccountAssets,
            RolePermission::GetMyAccountAssets,
            domain_id == creator_domain,
            account_id == creator_account_id,
            name,
            query_hash,
        )?;

        let mut total_count = 0;
        if self
            .common
            .get(key_account_asset_size!(domain_id, account_name))
            .map_err(|e| Self::state_err(name, e, query_hash))?
        {
            total_count = self
                .common
                .decode_u64()
                .map_err(|e| Self::state_err(name, e, query_hash))?;
        }

        let first_asset_id = pagination.and_then(|p| p.first_asset_id.as_deref());
        let page_size = pagination.and_then(|p| p.page_size);

        let mut assets = Vec::new();
        let mut next_asset_id = None;
        {
            let mut scan = self
                .common
                .seek_from(
                    format_args!("account_asset/{domain_id}/{account_name}/"),
                    first_asset_id.unwrap_or(""),
                )
                .map_err(|e| Self::state_err(name, e, query_hash))?;
            while scan.valid() && page_size.map_or(true, |size| assets.len() < size) {
                let balance = scan
                    .value()
                    .parse::<Amount>()
                    .map_err(|e| Self::failed(name, e, 1, query_hash))?;
                assets.push(AccountAsset {
                    account_id: account_id.to_owned(),
                    asset_id: scan.suffix().to_owned(),
                    balance,
                });
                scan.advance();
            }
            if pagination.is_some() && scan.valid() {
                next_asset_id = Some(scan.suffix().to_owned());
            }
            scan.status()
                .map_err(|e| Self::state_err(name, e, query_hash))?;
        }

        if assets.is_empty() && first_asset_id.is_some() {
            return Err(Self::failed(name, "first asset id not found", 4, query_hash));
        }

        Ok(QueryResponse::AccountAssets {
            assets,
            total_count,
            next_asset_id,
        })
    }

    fn get_role_permissions(
        &mut self,
        role_id: &str,
        creator_permissions: &RolePermissionSet,
        query_hash: &Hash,
    ) -> QueryResult {
        let name = "GetRolePermissions";
        if !creator_permissions.is_set(RolePermission::GetRoles) {
            return Err(Self::failed(name, "access denied", 2, query_hash));
        }

        let found = self
            .common
            .get(key_role!(role_id))
            .map_err(|e| Self::state_err(name, e, query_hash))?;
        if !found {
            return Err(QueryError::new(
                QueryErrorType::NoRoles,
                format!("{name}: no role {role_id}"),
                0,
                *query_hash,
            ));
        }
        let permissions = RolePermissionSet::from_bitstring(self.common.value())
            .map_err(|e| Self::failed(name, e, 1, query_hash))?;

        Ok(QueryResponse::RolePermissions(permissions))
    }
}

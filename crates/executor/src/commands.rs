//! The command executor.
//!
//! Commands are a closed sum type; execution is a visitor over it, scoped to
//! one state transaction. Every command follows the same contract:
//!
//! 1. Split the creator id into `(name, domain)`.
//! 2. When validation is enabled, fetch the creator's effective permissions.
//! 3. Evaluate preconditions; any failure returns a typed [`CommandError`]
//!    and the caller rolls the transaction back.
//! 4. Apply the mutation.
//!
//! Error codes are wire-stable: `1` duplicate/KV failure, `2` insufficient
//! permission, `3..=8` command-specific, `100` not implemented.

use crate::error::{CommandError, CommandResult, NOT_IMPLEMENTED};
use crate::kv::{PrefixScan, StateCommon, MAX_DESCRIPTION_SIZE_KEY};
use crate::store::{StateError, StateTransaction};
use crate::{
    key_account_asset, key_account_asset_size, key_account_detail, key_account_role, key_asset,
    key_domain, key_granted, key_peer, key_permissions, key_quorum, key_role, key_setting,
    key_signatory,
};
use accord_types::{
    parse_two_part, permission_for, Amount, GrantablePermission, GrantablePermissionSet,
    RolePermission, RolePermissionSet,
};
use std::fmt;

/// The command alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddAssetQuantity {
        asset_id: String,
        amount: Amount,
    },
    AddPeer {
        address: String,
        public_key: String,
    },
    AddSignatory {
        account_id: String,
        public_key: String,
    },
    AppendRole {
        account_id: String,
        role_name: String,
    },
    CallEngine {
        caller: String,
        callee: Option<String>,
        input: String,
    },
    CompareAndSetAccountDetail {
        account_id: String,
        key: String,
        value: String,
        old_value: Option<String>,
        check_empty: bool,
    },
    CreateAccount {
        account_name: String,
        domain_id: String,
        public_key: String,
    },
    CreateAsset {
        asset_name: String,
        domain_id: String,
        precision: u8,
    },
    CreateDomain {
        domain_id: String,
        default_role: String,
    },
    CreateRole {
        role_name: String,
        permissions: RolePermissionSet,
    },
    DetachRole {
        account_id: String,
        role_name: String,
    },
    GrantPermission {
        account_id: String,
        permission: GrantablePermission,
    },
    RemovePeer {
        public_key: String,
    },
    RemoveSignatory {
        account_id: String,
        public_key: String,
    },
    RevokePermission {
        account_id: String,
        permission: GrantablePermission,
    },
    SetAccountDetail {
        account_id: String,
        key: String,
        value: String,
    },
    SetQuorum {
        account_id: String,
        quorum: u64,
    },
    SetSettingValue {
        key: String,
        value: String,
    },
    SubtractAssetQuantity {
        asset_id: String,
        amount: Amount,
    },
    TransferAsset {
        src_account_id: String,
        dest_account_id: String,
        asset_id: String,
        description: String,
        amount: Amount,
    },
}

impl Command {
    /// Command name carried in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddAssetQuantity { .. } => "AddAssetQuantity",
            Command::AddPeer { .. } => "AddPeer",
            Command::AddSignatory { .. } => "AddSignatory",
            Command::AppendRole { .. } => "AppendRole",
            Command::CallEngine { .. } => "CallEngine",
            Command::CompareAndSetAccountDetail { .. } => "CompareAndSetAccountDetail",
            Command::CreateAccount { .. } => "CreateAccount",
            Command::CreateAsset { .. } => "CreateAsset",
            Command::CreateDomain { .. } => "CreateDomain",
            Command::CreateRole { .. } => "CreateRole",
            Command::DetachRole { .. } => "DetachRole",
            Command::GrantPermission { .. } => "GrantPermission",
            Command::RemovePeer { .. } => "RemovePeer",
            Command::RemoveSignatory { .. } => "RemoveSignatory",
            Command::RevokePermission { .. } => "RevokePermission",
            Command::SetAccountDetail { .. } => "SetAccountDetail",
            Command::SetQuorum { .. } => "SetQuorum",
            Command::SetSettingValue { .. } => "SetSettingValue",
            Command::SubtractAssetQuantity { .. } => "SubtractAssetQuantity",
            Command::TransferAsset { .. } => "TransferAsset",
        }
    }
}

fn parse_role_bits(value: &str, name: &'static str) -> Result<RolePermissionSet, CommandError> {
    RolePermissionSet::from_bitstring(value).map_err(|e| CommandError::new(name, 1, e.to_string()))
}

fn parse_grantable_bits(
    value: &str,
    name: &'static str,
) -> Result<GrantablePermissionSet, CommandError> {
    GrantablePermissionSet::from_bitstring(value)
        .map_err(|e| CommandError::new(name, 1, e.to_string()))
}

fn parse_amount(value: &str, name: &'static str) -> Result<Amount, CommandError> {
    value
        .parse()
        .map_err(|e: accord_types::AmountError| CommandError::new(name, 1, e.to_string()))
}

/// Executes commands against one state transaction.
///
/// Owns the [`StateCommon`] façade for the transaction's lifetime; the caller
/// commits or rolls back afterwards.
pub struct CommandExecutor<'t, T: StateTransaction> {
    common: StateCommon<'t, T>,
}

impl<'t, T: StateTransaction> CommandExecutor<'t, T> {
    pub fn new(tx: &'t mut T) -> Self {
        Self {
            common: StateCommon::new(tx),
        }
    }

    /// Execute one command on behalf of `creator_account_id`.
    ///
    /// With `do_validation` disabled the permission and duplicate checks are
    /// skipped; this is the bootstrap path for genesis blocks.
    pub fn execute(
        &mut self,
        command: &Command,
        creator_account_id: &str,
        do_validation: bool,
    ) -> CommandResult {
        let name = command.name();
        let mut creator_permissions = RolePermissionSet::new();

        if do_validation {
            let (creator_name, creator_domain) = parse_two_part(creator_account_id)
                .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
            if !self
                .common
                .get(key_permissions!(creator_domain, creator_name))
                .map_err(|e| CommandError::new(name, 1, e.to_string()))?
            {
                return Err(CommandError::new(name, 1, "creator permissions not found"));
            }
            creator_permissions = parse_role_bits(self.common.value(), name)?;
        }

        match command {
            Command::AddAssetQuantity { asset_id, amount } => self.add_asset_quantity(
                asset_id,
                amount,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::AddPeer {
                address,
                public_key,
            } => self.add_peer(address, public_key, do_validation, &creator_permissions),
            Command::AddSignatory {
                account_id,
                public_key,
            } => self.add_signatory(
                account_id,
                public_key,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::AppendRole {
                account_id,
                role_name,
            } => self.append_role(
                account_id,
                role_name,
                do_validation,
                &creator_permissions,
            ),
            Command::CallEngine { .. } => Err(CommandError::new(name, NOT_IMPLEMENTED, "")),
            Command::CompareAndSetAccountDetail {
                account_id,
                key,
                value,
                old_value,
                check_empty,
            } => self.compare_and_set_account_detail(
                account_id,
                key,
                value,
                old_value.as_deref(),
                *check_empty,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::CreateAccount {
                account_name,
                domain_id,
                public_key,
            } => self.create_account(
                account_name,
                domain_id,
                public_key,
                do_validation,
                &creator_permissions,
            ),
            Command::CreateAsset {
                asset_name,
                domain_id,
                precision,
            } => self.create_asset(
                asset_name,
                domain_id,
                *precision,
                do_validation,
                &creator_permissions,
            ),
            Command::CreateDomain {
                domain_id,
                default_role,
            } => self.create_domain(domain_id, default_role, do_validation, &creator_permissions),
            Command::CreateRole {
                role_name,
                permissions,
            } => self.create_role(role_name, permissions, do_validation, &creator_permissions),
            Command::DetachRole {
                account_id,
                role_name,
            } => self.detach_role(account_id, role_name, do_validation, &creator_permissions),
            Command::GrantPermission {
                account_id,
                permission,
            } => self.grant_permission(
                account_id,
                *permission,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::RemovePeer { public_key } => {
                self.remove_peer(public_key, do_validation, &creator_permissions)
            }
            Command::RemoveSignatory {
                account_id,
                public_key,
            } => self.remove_signatory(
                account_id,
                public_key,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::RevokePermission {
                account_id,
                permission,
            } => self.revoke_permission(account_id, *permission, creator_account_id),
            Command::SetAccountDetail {
                account_id,
                key,
                value,
            } => self.set_account_detail(
                account_id,
                key,
                value,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::SetQuorum { account_id, quorum } => self.set_quorum(
                account_id,
                *quorum,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::SetSettingValue { key, value } => self.set_setting_value(key, value),
            Command::SubtractAssetQuantity { asset_id, amount } => self.subtract_asset_quantity(
                asset_id,
                amount,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
            Command::TransferAsset {
                src_account_id,
                dest_account_id,
                asset_id,
                description,
                amount,
            } => self.transfer_asset(
                src_account_id,
                dest_account_id,
                asset_id,
                description,
                amount,
                creator_account_id,
                do_validation,
                &creator_permissions,
            ),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shared precondition helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn state_err(name: &'static str, error: StateError) -> CommandError {
        CommandError::new(name, 1, error.to_string())
    }

    /// The key must exist; absence maps to `code`.
    fn get_required(
        &mut self,
        key: fmt::Arguments<'_>,
        name: &'static str,
        code: u32,
    ) -> CommandResult {
        match self.common.get(key) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CommandError::new(name, code, "not found")),
            Err(e) => Err(Self::state_err(name, e)),
        }
    }

    /// The key must be absent; presence maps to `code`.
    fn expect_absent(
        &mut self,
        key: fmt::Arguments<'_>,
        name: &'static str,
        code: u32,
    ) -> CommandResult {
        match self.common.get(key) {
            Ok(false) => Ok(()),
            Ok(true) => Err(CommandError::new(name, code, "already exists")),
            Err(e) => Err(Self::state_err(name, e)),
        }
    }

    fn get_optional(
        &mut self,
        key: fmt::Arguments<'_>,
        name: &'static str,
    ) -> Result<bool, CommandError> {
        self.common.get(key).map_err(|e| Self::state_err(name, e))
    }

    fn put(&mut self, key: fmt::Arguments<'_>, name: &'static str) -> CommandResult {
        self.common.put(key).map_err(|e| Self::state_err(name, e))
    }

    fn del(&mut self, key: fmt::Arguments<'_>, name: &'static str) -> CommandResult {
        self.common.del(key).map_err(|e| Self::state_err(name, e))
    }

    fn decode_u64(&self, name: &'static str) -> Result<u64, CommandError> {
        self.common
            .decode_u64()
            .map_err(|e| Self::state_err(name, e))
    }

    fn require(
        permissions: &RolePermissionSet,
        permission: RolePermission,
        name: &'static str,
    ) -> CommandResult {
        if permissions.is_set(permission) {
            Ok(())
        } else {
            Err(CommandError::new(name, 2, ""))
        }
    }

    fn require_subset(
        role_permissions: &RolePermissionSet,
        creator_permissions: &RolePermissionSet,
        name: &'static str,
    ) -> CommandResult {
        if role_permissions.is_subset_of(creator_permissions) {
            Ok(())
        } else {
            Err(CommandError::new(name, 2, ""))
        }
    }

    /// `all` permission, or `domain` permission when the target domain is the
    /// creator's own.
    fn require_any(
        permissions: &RolePermissionSet,
        all: RolePermission,
        domain: RolePermission,
        same_domain: bool,
        name: &'static str,
    ) -> CommandResult {
        if permissions.is_set(all) || (same_domain && permissions.is_set(domain)) {
            Ok(())
        } else {
            Err(CommandError::new(name, 2, ""))
        }
    }

    /// Grantable permissions `grantee` holds over `owner`; empty when never granted.
    fn granted_permissions(
        &mut self,
        grantee: (&str, &str),
        owner: (&str, &str),
        name: &'static str,
    ) -> Result<GrantablePermissionSet, CommandError> {
        let (grantee_name, grantee_domain) = grantee;
        let (owner_name, owner_domain) = owner;
        if self.get_optional(
            key_granted!(grantee_domain, grantee_name, owner_domain, owner_name),
            name,
        )? {
            parse_grantable_bits(self.common.value(), name)
        } else {
            Ok(GrantablePermissionSet::new())
        }
    }

    /// Role permission, or a grantable capability over `owner`, or `Root`.
    fn require_role_or_grantable(
        &mut self,
        creator_permissions: &RolePermissionSet,
        role: RolePermission,
        grantable: GrantablePermission,
        grantee: (&str, &str),
        owner: (&str, &str),
        name: &'static str,
    ) -> CommandResult {
        if creator_permissions.is_set(role) {
            return Ok(());
        }
        let granted = self.granted_permissions(grantee, owner, name)?;
        if granted.is_set(grantable) {
            Ok(())
        } else {
            Err(CommandError::new(name, 2, ""))
        }
    }

    fn count_prefix(scan: &mut PrefixScan<T::Iter<'_>>) -> Result<u64, StateError> {
        let mut count = 0;
        while scan.valid() {
            count += 1;
            scan.advance();
        }
        scan.status()?;
        Ok(count)
    }

    fn count_signatories(
        &mut self,
        domain_id: &str,
        account_name: &str,
        name: &'static str,
    ) -> Result<u64, CommandError> {
        let mut scan = self
            .common
            .seek(key_signatory!(domain_id, account_name, ""))
            .map_err(|e| Self::state_err(name, e))?;
        Self::count_prefix(&mut scan).map_err(|e| Self::state_err(name, e))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Role and domain management
    // ═══════════════════════════════════════════════════════════════════════

    fn create_role(
        &mut self,
        role_name: &str,
        permissions: &RolePermissionSet,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "CreateRole";
        let mut role_permissions = *permissions;
        if role_permissions.is_set(RolePermission::Root) {
            role_permissions.set_all();
        }

        if do_validation {
            Self::require(creator_permissions, RolePermission::CreateRole, name)?;
            Self::require_subset(&role_permissions, creator_permissions, name)?;
            self.expect_absent(key_role!(role_name), name, 3)?;
        }

        self.common.set_value(&role_permissions.to_bitstring());
        self.put(key_role!(role_name), name)
    }

    fn create_domain(
        &mut self,
        domain_id: &str,
        default_role: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "CreateDomain";
        if do_validation {
            Self::require(creator_permissions, RolePermission::CreateDomain, name)?;
            self.expect_absent(key_domain!(domain_id), name, 3)?;
            self.get_required(key_role!(default_role), name, 4)?;
        }

        self.common.set_value(default_role);
        self.put(key_domain!(domain_id), name)
    }

    fn append_role(
        &mut self,
        account_id: &str,
        role_name: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "AppendRole";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            Self::require(creator_permissions, RolePermission::AppendRole, name)?;
        }

        self.get_required(key_permissions!(domain_id, account_name), name, 3)?;
        let mut account_permissions = parse_role_bits(self.common.value(), name)?;

        self.get_required(key_role!(role_name), name, 4)?;
        let role_permissions = parse_role_bits(self.common.value(), name)?;

        if do_validation {
            self.expect_absent(
                key_account_role!(domain_id, account_name, role_name),
                name,
                1,
            )?;
            Self::require_subset(&role_permissions, creator_permissions, name)?;
        }

        account_permissions |= role_permissions;
        self.common.set_value(&account_permissions.to_bitstring());
        self.put(key_permissions!(domain_id, account_name), name)?;

        // The link stores the role's own bitstring so DetachRole can rebuild
        // the effective set from one prefix scan.
        self.common.set_value(&role_permissions.to_bitstring());
        self.put(key_account_role!(domain_id, account_name, role_name), name)
    }

    fn detach_role(
        &mut self,
        account_id: &str,
        role_name: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "DetachRole";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            Self::require(creator_permissions, RolePermission::DetachRole, name)?;
        }

        self.get_required(key_permissions!(domain_id, account_name), name, 3)?;
        self.get_required(key_role!(role_name), name, 5)?;

        if do_validation {
            self.get_required(
                key_account_role!(domain_id, account_name, role_name),
                name,
                4,
            )?;
        }

        self.del(key_account_role!(domain_id, account_name, role_name), name)?;

        let mut account_permissions = RolePermissionSet::new();
        {
            let mut scan = self
                .common
                .seek(key_account_role!(domain_id, account_name, ""))
                .map_err(|e| Self::state_err(name, e))?;
            while scan.valid() {
                account_permissions |= parse_role_bits(scan.value(), name)?;
                scan.advance();
            }
            scan.status().map_err(|e| Self::state_err(name, e))?;
        }

        self.common.set_value(&account_permissions.to_bitstring());
        self.put(key_permissions!(domain_id, account_name), name)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accounts, signatories, quorum
    // ═══════════════════════════════════════════════════════════════════════

    fn create_account(
        &mut self,
        account_name: &str,
        domain_id: &str,
        public_key: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "CreateAccount";
        let pubkey = public_key.to_lowercase();

        if do_validation {
            Self::require(creator_permissions, RolePermission::CreateAccount, name)?;
        }

        self.get_required(key_domain!(domain_id), name, 3)?;
        let default_role = self.common.value().to_owned();

        self.get_required(key_role!(&default_role), name, 1)?;
        let role_permissions = parse_role_bits(self.common.value(), name)?;

        if do_validation {
            Self::require_subset(&role_permissions, creator_permissions, name)?;
            self.expect_absent(key_quorum!(domain_id, account_name), name, 4)?;
        }

        self.common.set_value(&role_permissions.to_bitstring());
        self.put(key_account_role!(domain_id, account_name, &default_role), name)?;
        self.put(key_permissions!(domain_id, account_name), name)?;

        self.common.set_value("");
        self.put(key_signatory!(domain_id, account_name, pubkey), name)?;

        self.common.encode_u64(1);
        self.put(key_quorum!(domain_id, account_name), name)
    }

    fn add_signatory(
        &mut self,
        account_id: &str,
        public_key: &str,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "AddSignatory";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let pubkey = public_key.to_lowercase();

        if do_validation {
            if account_id == creator_account_id {
                Self::require(creator_permissions, RolePermission::AddSignatory, name)?;
            } else {
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::Root,
                    GrantablePermission::AddMySignatory,
                    (creator_name, creator_domain),
                    (account_name, domain_id),
                    name,
                )?;
            }
            self.get_required(key_quorum!(domain_id, account_name), name, 3)?;
        }

        self.expect_absent(key_signatory!(domain_id, account_name, pubkey), name, 4)?;

        self.common.set_value("");
        self.put(key_signatory!(domain_id, account_name, pubkey), name)
    }

    fn remove_signatory(
        &mut self,
        account_id: &str,
        public_key: &str,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "RemoveSignatory";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let pubkey = public_key.to_lowercase();

        if do_validation {
            if account_id == creator_account_id {
                Self::require(creator_permissions, RolePermission::RemoveSignatory, name)?;
            } else {
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::Root,
                    GrantablePermission::RemoveMySignatory,
                    (creator_name, creator_domain),
                    (account_name, domain_id),
                    name,
                )?;
            }
        }

        self.get_required(key_quorum!(domain_id, account_name), name, 3)?;
        let quorum = self.decode_u64(name)?;

        self.get_required(key_signatory!(domain_id, account_name, pubkey), name, 4)?;

        let signatories = self.count_signatories(domain_id, account_name, name)?;
        if signatories.saturating_sub(1) < quorum {
            return Err(CommandError::new(
                name,
                5,
                "removal would break the quorum",
            ));
        }

        self.del(key_signatory!(domain_id, account_name, pubkey), name)
    }

    fn set_quorum(
        &mut self,
        account_id: &str,
        quorum: u64,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "SetQuorum";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            if account_id == creator_account_id {
                Self::require(creator_permissions, RolePermission::SetQuorum, name)?;
            } else {
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::Root,
                    GrantablePermission::SetMyQuorum,
                    (creator_name, creator_domain),
                    (account_name, domain_id),
                    name,
                )?;
            }
        }

        self.get_required(key_quorum!(domain_id, account_name), name, 3)?;

        let signatories = self.count_signatories(domain_id, account_name, name)?;
        if quorum < 1 || quorum > signatories {
            return Err(CommandError::new(name, 4, "quorum out of range"));
        }

        self.common.encode_u64(quorum);
        self.put(key_quorum!(domain_id, account_name), name)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Grantable permissions
    // ═══════════════════════════════════════════════════════════════════════

    fn grant_permission(
        &mut self,
        account_id: &str,
        permission: GrantablePermission,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "GrantPermission";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            Self::require(creator_permissions, permission_for(permission), name)?;
            self.get_required(key_quorum!(domain_id, account_name), name, 3)?;
        }

        let mut granted = self.granted_permissions(
            (account_name, domain_id),
            (creator_name, creator_domain),
            name,
        )?;
        if granted.is_set(permission) {
            return Err(CommandError::new(name, 1, "already granted"));
        }
        granted.set(permission);

        self.common.set_value(&granted.to_bitstring());
        self.put(
            key_granted!(domain_id, account_name, creator_domain, creator_name),
            name,
        )
    }

    fn revoke_permission(
        &mut self,
        account_id: &str,
        permission: GrantablePermission,
        creator_account_id: &str,
    ) -> CommandResult {
        let name = "RevokePermission";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        let mut granted = self.granted_permissions(
            (account_name, domain_id),
            (creator_name, creator_domain),
            name,
        )?;
        if !granted.is_set(permission) {
            return Err(CommandError::new(name, 1, "not granted"));
        }
        granted.unset(permission);

        if granted.is_empty() {
            self.del(
                key_granted!(domain_id, account_name, creator_domain, creator_name),
                name,
            )
        } else {
            self.common.set_value(&granted.to_bitstring());
            self.put(
                key_granted!(domain_id, account_name, creator_domain, creator_name),
                name,
            )
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Account detail
    // ═══════════════════════════════════════════════════════════════════════

    #[allow(clippy::too_many_arguments)]
    fn set_account_detail(
        &mut self,
        account_id: &str,
        key: &str,
        value: &str,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "SetAccountDetail";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            if account_id != creator_account_id {
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::SetDetail,
                    GrantablePermission::SetMyAccountDetail,
                    (creator_name, creator_domain),
                    (account_name, domain_id),
                    name,
                )?;
            }
            self.get_required(key_quorum!(domain_id, account_name), name, 3)?;
        }

        self.common.set_value(value);
        self.put(
            key_account_detail!(domain_id, account_name, creator_domain, creator_name, key),
            name,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn compare_and_set_account_detail(
        &mut self,
        account_id: &str,
        key: &str,
        value: &str,
        old_value: Option<&str>,
        check_empty: bool,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "CompareAndSetAccountDetail";
        let (account_name, domain_id) =
            parse_two_part(account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            if account_id != creator_account_id {
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::SetDetail,
                    GrantablePermission::SetMyAccountDetail,
                    (creator_name, creator_domain),
                    (account_name, domain_id),
                    name,
                )?;
            }
            self.get_required(key_quorum!(domain_id, account_name), name, 3)?;
        }

        let current = if self.get_optional(
            key_account_detail!(domain_id, account_name, creator_domain, creator_name, key),
            name,
        )? {
            Some(self.common.value().to_owned())
        } else {
            None
        };

        let matches = match (old_value, current.as_deref()) {
            (Some(expected), Some(current)) => expected == current,
            (Some(_), None) => false,
            (None, Some(_)) => !check_empty,
            (None, None) => true,
        };
        if !matches {
            return Err(CommandError::new(name, 4, "current value mismatch"));
        }

        self.common.set_value(value);
        self.put(
            key_account_detail!(domain_id, account_name, creator_domain, creator_name, key),
            name,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Assets
    // ═══════════════════════════════════════════════════════════════════════

    fn create_asset(
        &mut self,
        asset_name: &str,
        domain_id: &str,
        precision: u8,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "CreateAsset";
        if do_validation {
            Self::require(creator_permissions, RolePermission::CreateAsset, name)?;
            self.expect_absent(key_asset!(domain_id, asset_name), name, 3)?;
            self.get_required(key_domain!(domain_id), name, 4)?;
        }

        self.common.encode_u64(u64::from(precision));
        self.put(key_asset!(domain_id, asset_name), name)
    }

    fn add_asset_quantity(
        &mut self,
        asset_id: &str,
        amount: &Amount,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "AddAssetQuantity";
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (asset_name, domain_id) =
            parse_two_part(asset_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            Self::require_any(
                creator_permissions,
                RolePermission::AddAssetQty,
                RolePermission::AddDomainAssetQty,
                domain_id == creator_domain,
                name,
            )?;
        }

        self.get_required(key_asset!(domain_id, asset_name), name, 3)?;
        let precision = u8::try_from(self.decode_u64(name)?)
            .map_err(|_| CommandError::new(name, 1, "asset precision out of range"))?;

        let mut account_asset_size = 0;
        if self.get_optional(key_account_asset_size!(creator_domain, creator_name), name)? {
            account_asset_size = self.decode_u64(name)?;
        }

        let mut balance = Amount::zero(precision);
        if self.get_optional(
            key_account_asset!(creator_domain, creator_name, asset_id),
            name,
        )? {
            balance = parse_amount(self.common.value(), name)?;
        } else {
            account_asset_size += 1;
        }

        let balance = balance
            .checked_add(amount)
            .map_err(|_| CommandError::new(name, 4, ""))?;

        self.common.set_value(&balance.to_string());
        self.put(key_account_asset!(creator_domain, creator_name, asset_id), name)?;

        self.common.encode_u64(account_asset_size);
        self.put(key_account_asset_size!(creator_domain, creator_name), name)
    }

    fn subtract_asset_quantity(
        &mut self,
        asset_id: &str,
        amount: &Amount,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "SubtractAssetQuantity";
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (asset_name, domain_id) =
            parse_two_part(asset_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            Self::require_any(
                creator_permissions,
                RolePermission::SubtractAssetQty,
                RolePermission::SubtractDomainAssetQty,
                domain_id == creator_domain,
                name,
            )?;
        }

        self.get_required(key_asset!(domain_id, asset_name), name, 3)?;

        if !self.get_optional(
            key_account_asset!(creator_domain, creator_name, asset_id),
            name,
        )? {
            return Err(CommandError::new(name, 4, "no balance"));
        }
        let balance = parse_amount(self.common.value(), name)?;

        let balance = balance
            .checked_sub(amount)
            .map_err(|_| CommandError::new(name, 4, ""))?;

        self.common.set_value(&balance.to_string());
        self.put(key_account_asset!(creator_domain, creator_name, asset_id), name)
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_asset(
        &mut self,
        src_account_id: &str,
        dest_account_id: &str,
        asset_id: &str,
        description: &str,
        amount: &Amount,
        creator_account_id: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "TransferAsset";
        let (creator_name, creator_domain) = parse_two_part(creator_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (source_name, source_domain) =
            parse_two_part(src_account_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (dest_name, dest_domain) = parse_two_part(dest_account_id)
            .map_err(|e| CommandError::new(name, 1, e.to_string()))?;
        let (asset_name, domain_id) =
            parse_two_part(asset_id).map_err(|e| CommandError::new(name, 1, e.to_string()))?;

        if do_validation {
            self.get_required(key_quorum!(dest_domain, dest_name), name, 4)?;

            self.get_required(key_permissions!(dest_domain, dest_name), name, 1)?;
            let dest_permissions = parse_role_bits(self.common.value(), name)?;
            if !dest_permissions.is_set(RolePermission::Receive) {
                return Err(CommandError::new(name, 2, ""));
            }

            if src_account_id != creator_account_id {
                self.get_required(key_quorum!(source_domain, source_name), name, 3)?;
                self.require_role_or_grantable(
                    creator_permissions,
                    RolePermission::Root,
                    GrantablePermission::TransferMyAssets,
                    (creator_name, creator_domain),
                    (source_name, source_domain),
                    name,
                )?;
            } else {
                Self::require(creator_permissions, RolePermission::Transfer, name)?;
            }

            self.get_required(key_asset!(domain_id, asset_name), name, 5)?;

            if self.get_optional(key_setting!(MAX_DESCRIPTION_SIZE_KEY), name)? {
                let max_description_size = self.decode_u64(name)?;
                if description.len() as u64 > max_description_size {
                    return Err(CommandError::new(name, 8, "description too long"));
                }
            }
        }

        self.get_required(
            key_account_asset!(source_domain, source_name, asset_id),
            name,
            6,
        )?;
        let source_balance = parse_amount(self.common.value(), name)?;
        let source_balance = source_balance
            .checked_sub(amount)
            .map_err(|_| CommandError::new(name, 6, ""))?;

        let mut account_asset_size = 0;
        if self.get_optional(key_account_asset_size!(dest_domain, dest_name), name)? {
            account_asset_size = self.decode_u64(name)?;
        }

        let mut destination_balance = Amount::zero(source_balance.precision());
        if self.get_optional(key_account_asset!(dest_domain, dest_name, asset_id), name)? {
            destination_balance = parse_amount(self.common.value(), name)?;
        } else {
            account_asset_size += 1;
        }
        let destination_balance = destination_balance
            .checked_add(amount)
            .map_err(|_| CommandError::new(name, 7, ""))?;

        self.common.set_value(&source_balance.to_string());
        self.put(key_account_asset!(source_domain, source_name, asset_id), name)?;

        self.common.set_value(&destination_balance.to_string());
        self.put(key_account_asset!(dest_domain, dest_name, asset_id), name)?;

        self.common.encode_u64(account_asset_size);
        self.put(key_account_asset_size!(dest_domain, dest_name), name)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Peers and settings
    // ═══════════════════════════════════════════════════════════════════════

    fn add_peer(
        &mut self,
        address: &str,
        public_key: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "AddPeer";
        let pubkey = public_key.to_lowercase();

        if do_validation {
            Self::require(creator_permissions, RolePermission::AddPeer, name)?;
            self.expect_absent(key_peer!(pubkey), name, 3)?;
        }

        self.common.set_value(address);
        self.put(key_peer!(pubkey), name)
    }

    fn remove_peer(
        &mut self,
        public_key: &str,
        do_validation: bool,
        creator_permissions: &RolePermissionSet,
    ) -> CommandResult {
        let name = "RemovePeer";
        let pubkey = public_key.to_lowercase();

        if do_validation {
            Self::require(creator_permissions, RolePermission::RemovePeer, name)?;
        }

        self.get_required(key_peer!(pubkey), name, 3)?;

        let peers = {
            let mut scan = self
                .common
                .seek(key_peer!(""))
                .map_err(|e| Self::state_err(name, e))?;
            Self::count_prefix(&mut scan).map_err(|e| Self::state_err(name, e))?
        };
        if peers <= 1 {
            return Err(CommandError::new(name, 4, "cannot remove the last peer"));
        }

        self.del(key_peer!(pubkey), name)
    }

    fn set_setting_value(&mut self, key: &str, value: &str) -> CommandResult {
        let name = "SetSettingValue";
        self.common.set_value(value);
        self.put(key_setting!(key), name)
    }
}

//! Shared fixture for executor integration tests.
//!
//! Bootstraps a world state the way a genesis block would: roles and the
//! admin account are created with validation disabled, everything after that
//! goes through the validated path.
#![allow(dead_code)]

use accord_executor::{
    Command, CommandError, CommandExecutor, CommandResult, MemoryStore, Query, QueryExecutor,
    QueryResult,
};
use accord_types::{Hash, RolePermission, RolePermissionSet};
use std::sync::Arc;

pub const ADMIN_ID: &str = "admin@test";
pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLE: &str = "user";
pub const DOMAIN: &str = "test";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    /// A world with an `admin@test` account holding every permission.
    pub fn new() -> Self {
        let fixture = Fixture {
            store: MemoryStore::new(),
        };
        fixture.execute_unvalidated(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: ADMIN_ROLE.to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::Root]),
            },
        );
        fixture.execute_unvalidated(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: DEFAULT_ROLE.to_owned(),
                permissions: RolePermissionSet::new(),
            },
        );
        fixture.execute_unvalidated(
            ADMIN_ID,
            &Command::CreateDomain {
                domain_id: DOMAIN.to_owned(),
                default_role: DEFAULT_ROLE.to_owned(),
            },
        );
        fixture.execute_unvalidated(
            ADMIN_ID,
            &Command::CreateAccount {
                account_name: "admin".to_owned(),
                domain_id: DOMAIN.to_owned(),
                public_key: "adminpubkey".to_owned(),
            },
        );
        fixture.execute_unvalidated(
            ADMIN_ID,
            &Command::AppendRole {
                account_id: ADMIN_ID.to_owned(),
                role_name: ADMIN_ROLE.to_owned(),
            },
        );
        fixture
    }

    /// Execute with validation; commit on success, roll back on failure.
    pub fn execute_as(&self, creator: &str, command: &Command) -> CommandResult {
        self.run(creator, command, true)
    }

    /// Execute with validation disabled (the genesis path).
    pub fn execute_unvalidated(&self, creator: &str, command: &Command) {
        self.run(creator, command, false)
            .unwrap_or_else(|e| panic!("bootstrap command failed: {e}"));
    }

    fn run(&self, creator: &str, command: &Command, do_validation: bool) -> CommandResult {
        let mut tx = self.store.transaction();
        let result = CommandExecutor::new(&mut tx).execute(command, creator, do_validation);
        match &result {
            Ok(()) => tx.commit(),
            Err(_) => tx.rollback(),
        }
        result
    }

    /// Execute a query against the committed state.
    pub fn query_as(&self, creator: &str, query: &Query) -> QueryResult {
        let mut tx = self.store.transaction();
        let hash = Hash::digest(format!("{query:?}").as_bytes());
        QueryExecutor::new(&mut tx).execute(query, creator, &hash)
    }

    /// Create a role holding `permissions` and an account in `DOMAIN` wearing it.
    pub fn create_user_with_perms(
        &self,
        name: &str,
        pubkey: &str,
        permissions: impl IntoIterator<Item = RolePermission>,
    ) -> String {
        self.create_user_in_domain(name, DOMAIN, pubkey, permissions)
    }

    /// Same, for an arbitrary (existing) domain.
    pub fn create_user_in_domain(
        &self,
        name: &str,
        domain: &str,
        pubkey: &str,
        permissions: impl IntoIterator<Item = RolePermission>,
    ) -> String {
        let role_name = format!("{name}role");
        self.execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: role_name.clone(),
                permissions: RolePermissionSet::from_permissions(permissions),
            },
        )
        .unwrap_or_else(|e| panic!("create role for {name}: {e}"));
        self.execute_as(
            ADMIN_ID,
            &Command::CreateAccount {
                account_name: name.to_owned(),
                domain_id: domain.to_owned(),
                public_key: pubkey.to_owned(),
            },
        )
        .unwrap_or_else(|e| panic!("create account {name}: {e}"));
        let account_id = format!("{name}@{domain}");
        self.execute_as(
            ADMIN_ID,
            &Command::AppendRole {
                account_id: account_id.clone(),
                role_name,
            },
        )
        .unwrap_or_else(|e| panic!("append role for {name}: {e}"));
        account_id
    }

    /// Create a domain with the default role.
    pub fn create_domain(&self, domain: &str) {
        self.execute_as(
            ADMIN_ID,
            &Command::CreateDomain {
                domain_id: domain.to_owned(),
                default_role: DEFAULT_ROLE.to_owned(),
            },
        )
        .unwrap_or_else(|e| panic!("create domain {domain}: {e}"));
    }

    /// Create an asset `name#domain` with the given precision.
    pub fn create_asset(&self, name: &str, domain: &str, precision: u8) {
        self.execute_as(
            ADMIN_ID,
            &Command::CreateAsset {
                asset_name: name.to_owned(),
                domain_id: domain.to_owned(),
                precision,
            },
        )
        .unwrap_or_else(|e| panic!("create asset {name}: {e}"));
    }

    /// Credit `account` with `amount` of `asset_id`, bypassing validation.
    pub fn add_asset(&self, account_id: &str, asset_id: &str, amount: &str) {
        self.execute_unvalidated(
            account_id,
            &Command::AddAssetQuantity {
                asset_id: asset_id.to_owned(),
                amount: amount.parse().unwrap(),
            },
        );
    }

    /// Committed balance string, if the entry exists.
    pub fn balance(&self, account_id: &str, asset_id: &str) -> Option<String> {
        let (name, domain) = account_id.split_once('@').unwrap();
        self.store
            .committed(&format!("account_asset/{domain}/{name}/{asset_id}"))
    }

    /// Committed `account_asset_size` entry, if present.
    pub fn asset_size(&self, account_id: &str) -> Option<String> {
        let (name, domain) = account_id.split_once('@').unwrap();
        self.store
            .committed(&format!("account_asset_size/{domain}/{name}"))
    }

    /// Committed effective permission bitstring for an account.
    pub fn permissions(&self, account_id: &str) -> Option<String> {
        let (name, domain) = account_id.split_once('@').unwrap();
        self.store.committed(&format!("permissions/{domain}/{name}"))
    }
}

/// Assert that a command failed with the given numeric code.
#[track_caller]
pub fn check_error(result: CommandResult, code: u32) {
    match result {
        Err(CommandError { error_code, .. }) if error_code == code => {}
        other => panic!("expected command error with code {code}, got {other:?}"),
    }
}

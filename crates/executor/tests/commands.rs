//! Integration tests for the command executor.
//!
//! Each test bootstraps a fresh world, runs commands through the validated
//! path, and checks both the error taxonomy and the committed state.

mod common;

use accord_executor::{Command, MemoryStore, NOT_IMPLEMENTED};
use accord_types::{Amount, GrantablePermission, RolePermission, RolePermissionSet};
use common::{check_error, Fixture, ADMIN_ID, DEFAULT_ROLE, DOMAIN};
use proptest::prelude::*;

fn transfer(src: &str, dest: &str, asset: &str, amount: &str) -> Command {
    Command::TransferAsset {
        src_account_id: src.to_owned(),
        dest_account_id: dest.to_owned(),
        asset_id: asset.to_owned(),
        description: String::new(),
        amount: amount.parse().unwrap(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TransferAsset
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn transfer_happy_path() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    fixture.create_asset("a", "d", 1);
    let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);
    fixture.add_asset(&u1, "a#d", "10.0");

    fixture
        .execute_as(&u1, &transfer(&u1, &u2, "a#d", "3.0"))
        .unwrap();

    assert_eq!(fixture.balance(&u1, "a#d").as_deref(), Some("7.0"));
    assert_eq!(fixture.balance(&u2, "a#d").as_deref(), Some("3.0"));
    assert_eq!(fixture.asset_size(&u2).as_deref(), Some("1"));
}

#[test]
fn transfer_without_receive_permission() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    fixture.create_asset("a", "d", 1);
    let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", []);
    fixture.add_asset(&u1, "a#d", "10.0");

    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "3.0")), 2);

    assert_eq!(fixture.balance(&u1, "a#d").as_deref(), Some("10.0"));
    assert_eq!(fixture.balance(&u2, "a#d"), None);
}

#[test]
fn transfer_overflow_precision_1() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    fixture.create_asset("a", "d", 1);
    let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);
    fixture.add_asset(&u1, "a#d", "10.0");

    // Destination already holds the maximum representable amount.
    let max = Amount::max_at(1).to_string();
    fixture.add_asset(&u2, "a#d", &max);

    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "0.1")), 7);
    // A precision-0 amount scales up before the overflow check and still fails.
    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "1")), 7);

    assert_eq!(fixture.balance(&u1, "a#d").as_deref(), Some("10.0"));
    assert_eq!(fixture.balance(&u2, "a#d").as_deref(), Some(max.as_str()));
}

#[test]
fn transfer_error_taxonomy() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);

    // Asset does not exist yet.
    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "1.0")), 5);

    fixture.create_asset("a", "d", 1);

    // Destination account missing.
    check_error(
        fixture.execute_as(&u1, &transfer(&u1, "ghost@d", "a#d", "1.0")),
        4,
    );

    // Source missing when transferring on behalf of another account.
    check_error(
        fixture.execute_as(ADMIN_ID, &transfer("ghost@d", &u2, "a#d", "1.0")),
        3,
    );

    // Source holds no entry for the asset.
    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "1.0")), 6);

    // Source holds too little.
    fixture.add_asset(&u1, "a#d", "0.5");
    check_error(fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", "1.0")), 6);
}

#[test]
fn transfer_on_behalf_requires_grant_or_root() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    fixture.create_asset("a", "d", 1);
    let u1 = fixture.create_user_in_domain(
        "u1",
        "d",
        "u1key",
        [RolePermission::Transfer, RolePermission::GrantTransferMyAssets],
    );
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);
    let u3 = fixture.create_user_in_domain("u3", "d", "u3key", []);
    fixture.add_asset(&u1, "a#d", "10.0");

    // u3 has neither the grant nor Root.
    check_error(fixture.execute_as(&u3, &transfer(&u1, &u2, "a#d", "1.0")), 2);

    // u1 grants u3 TransferMyAssets; now it works.
    fixture
        .execute_as(
            &u1,
            &Command::GrantPermission {
                account_id: u3.clone(),
                permission: GrantablePermission::TransferMyAssets,
            },
        )
        .unwrap();
    fixture
        .execute_as(&u3, &transfer(&u1, &u2, "a#d", "1.0"))
        .unwrap();

    // Root transfers on anyone's behalf without a grant.
    fixture
        .execute_as(ADMIN_ID, &transfer(&u1, &u2, "a#d", "1.0"))
        .unwrap();

    assert_eq!(fixture.balance(&u1, "a#d").as_deref(), Some("8.0"));
    assert_eq!(fixture.balance(&u2, "a#d").as_deref(), Some("2.0"));
}

#[test]
fn transfer_description_bounded_by_setting() {
    let fixture = Fixture::new();
    fixture.create_domain("d");
    fixture.create_asset("a", "d", 1);
    let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
    let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);
    fixture.add_asset(&u1, "a#d", "10.0");

    fixture.execute_unvalidated(
        ADMIN_ID,
        &Command::SetSettingValue {
            key: "max_description_size".to_owned(),
            value: "10".to_owned(),
        },
    );

    let long = Command::TransferAsset {
        src_account_id: u1.clone(),
        dest_account_id: u2.clone(),
        asset_id: "a#d".to_owned(),
        description: "a".repeat(11),
        amount: "1.0".parse().unwrap(),
    };
    check_error(fixture.execute_as(&u1, &long), 8);

    let ok = Command::TransferAsset {
        src_account_id: u1.clone(),
        dest_account_id: u2.clone(),
        asset_id: "a#d".to_owned(),
        description: "a".repeat(10),
        amount: "1.0".parse().unwrap(),
    };
    fixture.execute_as(&u1, &ok).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// Roles and permissions
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn detach_role_recomputes_permissions() {
    let fixture = Fixture::new();
    let account = fixture.create_user_with_perms("alice", "alicekey", []);

    fixture
        .execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: "r1".to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::AddSignatory]),
            },
        )
        .unwrap();
    fixture
        .execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: "r2".to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::Receive]),
            },
        )
        .unwrap();
    for role in ["r1", "r2"] {
        fixture
            .execute_as(
                ADMIN_ID,
                &Command::AppendRole {
                    account_id: account.clone(),
                    role_name: role.to_owned(),
                },
            )
            .unwrap();
    }

    fixture
        .execute_as(
            ADMIN_ID,
            &Command::DetachRole {
                account_id: account.clone(),
                role_name: "r1".to_owned(),
            },
        )
        .unwrap();

    // Only r2 and the empty default role remain.
    let expected =
        RolePermissionSet::from_permissions([RolePermission::Receive]).to_bitstring();
    assert_eq!(fixture.permissions(&account).as_deref(), Some(expected.as_str()));
}

#[test]
fn create_role_checks() {
    let fixture = Fixture::new();
    let user = fixture.create_user_with_perms("bob", "bobkey", [RolePermission::CreateRole]);

    // Privilege escalation: bob cannot create a role with bits he lacks.
    check_error(
        fixture.execute_as(
            &user,
            &Command::CreateRole {
                role_name: "sneaky".to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::Transfer]),
            },
        ),
        2,
    );

    // Duplicate role name.
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: DEFAULT_ROLE.to_owned(),
                permissions: RolePermissionSet::new(),
            },
        ),
        3,
    );

    // No CreateRole permission at all.
    let pleb = fixture.create_user_with_perms("pleb", "plebkey", []);
    check_error(
        fixture.execute_as(
            &pleb,
            &Command::CreateRole {
                role_name: "r".to_owned(),
                permissions: RolePermissionSet::new(),
            },
        ),
        2,
    );
}

#[test]
fn create_role_with_root_expands_to_all() {
    let fixture = Fixture::new();
    fixture
        .execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: "superuser".to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::Root]),
            },
        )
        .unwrap();

    let stored = fixture.store.committed("role/superuser").unwrap();
    assert!(stored.bytes().all(|b| b == b'1'));
}

#[test]
fn append_role_checks() {
    let fixture = Fixture::new();
    let account = fixture.create_user_with_perms("alice", "alicekey", []);

    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::AppendRole {
                account_id: "ghost@test".to_owned(),
                role_name: DEFAULT_ROLE.to_owned(),
            },
        ),
        3,
    );
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::AppendRole {
                account_id: account.clone(),
                role_name: "ghostrole".to_owned(),
            },
        ),
        4,
    );
    // The default role is already attached.
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::AppendRole {
                account_id: account.clone(),
                role_name: DEFAULT_ROLE.to_owned(),
            },
        ),
        1,
    );

    // Appending a role above the creator's own permissions is refused.
    let granter =
        fixture.create_user_with_perms("granter", "granterkey", [RolePermission::AppendRole]);
    fixture
        .execute_as(
            ADMIN_ID,
            &Command::CreateRole {
                role_name: "mighty".to_owned(),
                permissions: RolePermissionSet::from_permissions([RolePermission::Transfer]),
            },
        )
        .unwrap();
    check_error(
        fixture.execute_as(
            &granter,
            &Command::AppendRole {
                account_id: account.clone(),
                role_name: "mighty".to_owned(),
            },
        ),
        2,
    );
}

#[test]
fn grant_and_revoke_permission() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms(
        "u1",
        "u1key",
        [RolePermission::GrantTransferMyAssets],
    );
    let u2 = fixture.create_user_with_perms("u2", "u2key", []);

    let grant = Command::GrantPermission {
        account_id: u2.clone(),
        permission: GrantablePermission::TransferMyAssets,
    };
    fixture.execute_as(&u1, &grant).unwrap();
    assert!(fixture
        .store
        .committed("granted/test/u2/test/u1")
        .is_some());

    // Granting twice is a duplicate.
    check_error(fixture.execute_as(&u1, &grant), 1);

    // Revoking removes the now-empty entry.
    let revoke = Command::RevokePermission {
        account_id: u2.clone(),
        permission: GrantablePermission::TransferMyAssets,
    };
    fixture.execute_as(&u1, &revoke).unwrap();
    assert!(fixture.store.committed("granted/test/u2/test/u1").is_none());

    // Revoking what is not granted fails.
    check_error(fixture.execute_as(&u1, &revoke), 1);
}

#[test]
fn grant_requires_the_granting_role_permission() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms("u1", "u1key", []);
    let u2 = fixture.create_user_with_perms("u2", "u2key", []);

    check_error(
        fixture.execute_as(
            &u1,
            &Command::GrantPermission {
                account_id: u2,
                permission: GrantablePermission::SetMyAccountDetail,
            },
        ),
        2,
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Domains, accounts, assets
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn create_domain_checks() {
    let fixture = Fixture::new();
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateDomain {
                domain_id: DOMAIN.to_owned(),
                default_role: DEFAULT_ROLE.to_owned(),
            },
        ),
        3,
    );
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateDomain {
                domain_id: "fresh".to_owned(),
                default_role: "ghostrole".to_owned(),
            },
        ),
        4,
    );
}

#[test]
fn create_account_checks() {
    let fixture = Fixture::new();
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateAccount {
                account_name: "alice".to_owned(),
                domain_id: "ghostdomain".to_owned(),
                public_key: "key".to_owned(),
            },
        ),
        3,
    );

    let create = Command::CreateAccount {
        account_name: "alice".to_owned(),
        domain_id: DOMAIN.to_owned(),
        public_key: "ALICEKEY".to_owned(),
    };
    fixture.execute_as(ADMIN_ID, &create).unwrap();
    check_error(fixture.execute_as(ADMIN_ID, &create), 4);

    // Pubkey is stored lowercased, quorum starts at one.
    assert!(fixture
        .store
        .committed("signatory/test/alice/alicekey")
        .is_some());
    assert_eq!(
        fixture.store.committed("quorum/test/alice").as_deref(),
        Some("1")
    );
}

#[test]
fn create_asset_checks() {
    let fixture = Fixture::new();
    fixture.create_asset("gold", DOMAIN, 2);
    assert_eq!(
        fixture.store.committed("asset/test/gold").as_deref(),
        Some("2")
    );

    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateAsset {
                asset_name: "gold".to_owned(),
                domain_id: DOMAIN.to_owned(),
                precision: 2,
            },
        ),
        3,
    );
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CreateAsset {
                asset_name: "silver".to_owned(),
                domain_id: "ghostdomain".to_owned(),
                precision: 2,
            },
        ),
        4,
    );
}

#[test]
fn add_asset_quantity_checks() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms("u1", "u1key", [RolePermission::AddAssetQty]);

    check_error(
        fixture.execute_as(
            &u1,
            &Command::AddAssetQuantity {
                asset_id: "ghost#test".to_owned(),
                amount: "1.0".parse().unwrap(),
            },
        ),
        3,
    );

    fixture.create_asset("gold", DOMAIN, 1);
    let add = Command::AddAssetQuantity {
        asset_id: "gold#test".to_owned(),
        amount: "2.5".parse().unwrap(),
    };
    fixture.execute_as(&u1, &add).unwrap();
    fixture.execute_as(&u1, &add).unwrap();

    assert_eq!(fixture.balance(&u1, "gold#test").as_deref(), Some("5.0"));
    // The size counter counts entries, not additions.
    assert_eq!(fixture.asset_size(&u1).as_deref(), Some("1"));

    // Pushing past the representable maximum overflows.
    let u2 = fixture.create_user_with_perms("u2", "u2key", [RolePermission::AddAssetQty]);
    fixture.add_asset(&u2, "gold#test", &Amount::max_at(1).to_string());
    check_error(fixture.execute_as(&u2, &add), 4);
}

#[test]
fn add_domain_asset_quantity_is_domain_scoped() {
    let fixture = Fixture::new();
    fixture.create_domain("other");
    fixture.create_asset("gold", DOMAIN, 1);
    fixture.create_asset("gold", "other", 1);
    let u1 = fixture.create_user_with_perms("u1", "u1key", [RolePermission::AddDomainAssetQty]);

    fixture
        .execute_as(
            &u1,
            &Command::AddAssetQuantity {
                asset_id: "gold#test".to_owned(),
                amount: "1.0".parse().unwrap(),
            },
        )
        .unwrap();

    // Same permission does not reach into a foreign domain.
    check_error(
        fixture.execute_as(
            &u1,
            &Command::AddAssetQuantity {
                asset_id: "gold#other".to_owned(),
                amount: "1.0".parse().unwrap(),
            },
        ),
        2,
    );
}

#[test]
fn subtract_asset_quantity_checks() {
    let fixture = Fixture::new();
    fixture.create_asset("gold", DOMAIN, 1);
    let u1 = fixture.create_user_with_perms("u1", "u1key", [RolePermission::SubtractAssetQty]);

    let subtract = Command::SubtractAssetQuantity {
        asset_id: "gold#test".to_owned(),
        amount: "1.0".parse().unwrap(),
    };

    // No balance entry at all.
    check_error(fixture.execute_as(&u1, &subtract), 4);

    fixture.add_asset(&u1, "gold#test", "1.5");
    fixture.execute_as(&u1, &subtract).unwrap();
    assert_eq!(fixture.balance(&u1, "gold#test").as_deref(), Some("0.5"));

    // Underflow.
    check_error(fixture.execute_as(&u1, &subtract), 4);

    check_error(
        fixture.execute_as(
            &u1,
            &Command::SubtractAssetQuantity {
                asset_id: "ghost#test".to_owned(),
                amount: "1.0".parse().unwrap(),
            },
        ),
        3,
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Signatories, quorum, details, peers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn signatory_lifecycle() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms(
        "u1",
        "u1key",
        [RolePermission::AddSignatory, RolePermission::RemoveSignatory],
    );

    let add = Command::AddSignatory {
        account_id: u1.clone(),
        public_key: "SECONDKEY".to_owned(),
    };
    fixture.execute_as(&u1, &add).unwrap();
    assert!(fixture
        .store
        .committed("signatory/test/u1/secondkey")
        .is_some());
    check_error(fixture.execute_as(&u1, &add), 4);

    fixture
        .execute_as(
            &u1,
            &Command::RemoveSignatory {
                account_id: u1.clone(),
                public_key: "secondkey".to_owned(),
            },
        )
        .unwrap();

    // Removing the last signatory would break quorum = 1.
    check_error(
        fixture.execute_as(
            &u1,
            &Command::RemoveSignatory {
                account_id: u1.clone(),
                public_key: "u1key".to_owned(),
            },
        ),
        5,
    );
}

#[test]
fn set_quorum_bounded_by_signatories() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms(
        "u1",
        "u1key",
        [RolePermission::AddSignatory, RolePermission::SetQuorum],
    );

    check_error(
        fixture.execute_as(
            &u1,
            &Command::SetQuorum {
                account_id: u1.clone(),
                quorum: 2,
            },
        ),
        4,
    );

    fixture
        .execute_as(
            &u1,
            &Command::AddSignatory {
                account_id: u1.clone(),
                public_key: "secondkey".to_owned(),
            },
        )
        .unwrap();
    fixture
        .execute_as(
            &u1,
            &Command::SetQuorum {
                account_id: u1.clone(),
                quorum: 2,
            },
        )
        .unwrap();
    assert_eq!(fixture.store.committed("quorum/test/u1").as_deref(), Some("2"));

    check_error(
        fixture.execute_as(
            &u1,
            &Command::SetQuorum {
                account_id: "ghost@test".to_owned(),
                quorum: 1,
            },
        ),
        3,
    );
}

#[test]
fn set_account_detail_permissions() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms("u1", "u1key", []);
    let u2 = fixture.create_user_with_perms("u2", "u2key", []);

    // Writing one's own detail needs no permission.
    fixture
        .execute_as(
            &u1,
            &Command::SetAccountDetail {
                account_id: u1.clone(),
                key: "color".to_owned(),
                value: "green".to_owned(),
            },
        )
        .unwrap();
    assert_eq!(
        fixture
            .store
            .committed("account_detail/test/u1/test/u1/color")
            .as_deref(),
        Some("green")
    );

    // Writing another account's detail needs SetDetail or a grant.
    let set_on_u1 = Command::SetAccountDetail {
        account_id: u1.clone(),
        key: "color".to_owned(),
        value: "red".to_owned(),
    };
    check_error(fixture.execute_as(&u2, &set_on_u1), 2);

    fixture
        .execute_as(
            &u1,
            &Command::GrantPermission {
                account_id: u2.clone(),
                permission: GrantablePermission::SetMyAccountDetail,
            },
        )
        .unwrap();
    fixture.execute_as(&u2, &set_on_u1).unwrap();
    assert_eq!(
        fixture
            .store
            .committed("account_detail/test/u1/test/u2/color")
            .as_deref(),
        Some("red")
    );

    check_error(
        fixture.execute_as(
            &u1,
            &Command::SetAccountDetail {
                account_id: "ghost@test".to_owned(),
                key: "k".to_owned(),
                value: "v".to_owned(),
            },
        ),
        3,
    );
}

#[test]
fn compare_and_set_account_detail() {
    let fixture = Fixture::new();
    let u1 = fixture.create_user_with_perms("u1", "u1key", []);

    let cas = |old: Option<&str>, value: &str, check_empty: bool| Command::CompareAndSetAccountDetail {
        account_id: u1.clone(),
        key: "k".to_owned(),
        value: value.to_owned(),
        old_value: old.map(str::to_owned),
        check_empty,
    };

    // Fresh key with check_empty set.
    fixture.execute_as(&u1, &cas(None, "1", true)).unwrap();
    // Now the key is non-empty, check_empty fails.
    check_error(fixture.execute_as(&u1, &cas(None, "2", true)), 4);
    // Wrong expected value fails, right one succeeds.
    check_error(fixture.execute_as(&u1, &cas(Some("9"), "2", false)), 4);
    fixture.execute_as(&u1, &cas(Some("1"), "2", false)).unwrap();
    assert_eq!(
        fixture
            .store
            .committed("account_detail/test/u1/test/u1/k")
            .as_deref(),
        Some("2")
    );
}

#[test]
fn peer_lifecycle() {
    let fixture = Fixture::new();
    let add = |key: &str, addr: &str| Command::AddPeer {
        address: addr.to_owned(),
        public_key: key.to_owned(),
    };

    fixture.execute_as(ADMIN_ID, &add("PEERA", "10.0.0.1:50541")).unwrap();
    assert_eq!(
        fixture.store.committed("peer/peera").as_deref(),
        Some("10.0.0.1:50541")
    );
    check_error(fixture.execute_as(ADMIN_ID, &add("peera", "10.0.0.1:50541")), 3);

    // The last peer cannot be removed.
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::RemovePeer {
                public_key: "peera".to_owned(),
            },
        ),
        4,
    );

    fixture.execute_as(ADMIN_ID, &add("peerb", "10.0.0.2:50541")).unwrap();
    fixture
        .execute_as(
            ADMIN_ID,
            &Command::RemovePeer {
                public_key: "peera".to_owned(),
            },
        )
        .unwrap();
    assert!(fixture.store.committed("peer/peera").is_none());

    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::RemovePeer {
                public_key: "ghost".to_owned(),
            },
        ),
        3,
    );
}

#[test]
fn call_engine_is_not_implemented() {
    let fixture = Fixture::new();
    check_error(
        fixture.execute_as(
            ADMIN_ID,
            &Command::CallEngine {
                caller: ADMIN_ID.to_owned(),
                callee: None,
                input: String::new(),
            },
        ),
        NOT_IMPLEMENTED,
    );
}

#[test]
fn no_creator_permissions_fails_validated_commands() {
    let store = MemoryStore::new();
    let mut tx = store.transaction();
    let result = accord_executor::CommandExecutor::new(&mut tx).execute(
        &Command::SetSettingValue {
            key: "k".to_owned(),
            value: "v".to_owned(),
        },
        "ghost@nowhere",
        true,
    );
    check_error(result, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Invariant properties
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum RoleOp {
    Append(usize),
    Detach(usize),
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // After any append/detach sequence, the effective permission set equals
    // the union of the role definitions still linked to the account.
    #[test]
    fn permission_union_invariant(
        ops in proptest::collection::vec(
            prop_oneof![
                (0usize..3).prop_map(RoleOp::Append),
                (0usize..3).prop_map(RoleOp::Detach),
            ],
            1..12,
        )
    ) {
        let role_perms = [
            vec![RolePermission::Transfer],
            vec![RolePermission::Receive, RolePermission::GetMyAccount],
            vec![RolePermission::AddSignatory],
        ];

        let fixture = Fixture::new();
        let account = fixture.create_user_with_perms("alice", "alicekey", []);
        for (i, perms) in role_perms.iter().enumerate() {
            fixture
                .execute_as(ADMIN_ID, &Command::CreateRole {
                    role_name: format!("r{i}"),
                    permissions: RolePermissionSet::from_permissions(perms.iter().copied()),
                })
                .unwrap();
        }

        let mut attached = [false; 3];
        for op in ops {
            match op {
                RoleOp::Append(i) => {
                    let result = fixture.execute_as(ADMIN_ID, &Command::AppendRole {
                        account_id: account.clone(),
                        role_name: format!("r{i}"),
                    });
                    prop_assert_eq!(result.is_ok(), !attached[i]);
                    attached[i] = true;
                }
                RoleOp::Detach(i) => {
                    let result = fixture.execute_as(ADMIN_ID, &Command::DetachRole {
                        account_id: account.clone(),
                        role_name: format!("r{i}"),
                    });
                    prop_assert_eq!(result.is_ok(), attached[i]);
                    attached[i] = false;
                }
            }
        }

        let mut expected = RolePermissionSet::new();
        for (i, perms) in role_perms.iter().enumerate() {
            if attached[i] {
                expected |= RolePermissionSet::from_permissions(perms.iter().copied());
            }
        }
        prop_assert_eq!(
            fixture.permissions(&account),
            Some(expected.to_bitstring())
        );
    }

    // Transfers conserve the total across the pair, successful or not.
    #[test]
    fn transfer_conserves_assets(tenths in 1u64..400) {
        let fixture = Fixture::new();
        fixture.create_domain("d");
        fixture.create_asset("a", "d", 1);
        let u1 = fixture.create_user_in_domain("u1", "d", "u1key", [RolePermission::Transfer]);
        let u2 = fixture.create_user_in_domain("u2", "d", "u2key", [RolePermission::Receive]);
        fixture.add_asset(&u1, "a#d", "20.0");
        fixture.add_asset(&u2, "a#d", "5.0");

        let amount = Amount::new(tenths.into(), 1).unwrap();
        let result = fixture.execute_as(&u1, &transfer(&u1, &u2, "a#d", &amount.to_string()));
        // Anything above the source balance must fail with underflow.
        prop_assert_eq!(result.is_ok(), tenths <= 200);

        let src: Amount = fixture.balance(&u1, "a#d").unwrap().parse().unwrap();
        let dst: Amount = fixture.balance(&u2, "a#d").unwrap().parse().unwrap();
        prop_assert_eq!(src.checked_add(&dst).unwrap(), "25.0".parse().unwrap());
    }
}

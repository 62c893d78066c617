//! Role and grantable permission sets.
//!
//! The two permission universes are disjoint. *Role* permissions are attached
//! to named roles and unioned into an account's effective permission set.
//! *Grantable* permissions are capabilities one account delegates to another.
//!
//! Both are stored on disk as fixed-width bitstrings: one ASCII `0`/`1` per
//! permission, indexed by the enum discriminant. The discriminant order below
//! is the canonical schema and must never be reordered; new permissions are
//! appended only.

use std::fmt;
use std::marker::PhantomData;
use std::ops::BitOrAssign;
use thiserror::Error;

/// A permission enumeration with stable bit positions.
pub trait Permission: Copy {
    /// Number of variants; the bitstring width.
    const COUNT: u32;
    /// Stable bit position of this permission.
    fn bit(self) -> u32;
}

/// Role permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RolePermission {
    AppendRole = 0,
    CreateRole = 1,
    DetachRole = 2,
    AddAssetQty = 3,
    SubtractAssetQty = 4,
    AddPeer = 5,
    RemovePeer = 6,
    AddSignatory = 7,
    RemoveSignatory = 8,
    SetQuorum = 9,
    CreateAccount = 10,
    SetDetail = 11,
    CreateAsset = 12,
    Transfer = 13,
    Receive = 14,
    CreateDomain = 15,
    AddDomainAssetQty = 16,
    SubtractDomainAssetQty = 17,
    ReadAssets = 18,
    GetRoles = 19,
    GetMyAccount = 20,
    GetAllAccounts = 21,
    GetDomainAccounts = 22,
    GetMySignatories = 23,
    GetAllSignatories = 24,
    GetDomainSignatories = 25,
    GetMyAccountAssets = 26,
    GetAllAccountAssets = 27,
    GetDomainAccountAssets = 28,
    GetMyAccountDetail = 29,
    GetAllAccountDetail = 30,
    GetDomainAccountDetail = 31,
    GetMyTransactions = 32,
    GetAllTransactions = 33,
    GetDomainTransactions = 34,
    GetBlocks = 35,
    GetPeers = 36,
    CallEngine = 37,
    GrantAddMySignatory = 38,
    GrantRemoveMySignatory = 39,
    GrantSetMyQuorum = 40,
    GrantSetMyAccountDetail = 41,
    GrantTransferMyAssets = 42,
    GrantCallEngineOnMyBehalf = 43,
    /// Wildcard: a role holding `Root` implicitly holds every role permission.
    Root = 44,
}

impl Permission for RolePermission {
    const COUNT: u32 = 45;

    fn bit(self) -> u32 {
        self as u32
    }
}

/// Grantable permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GrantablePermission {
    AddMySignatory = 0,
    RemoveMySignatory = 1,
    SetMyQuorum = 2,
    SetMyAccountDetail = 3,
    TransferMyAssets = 4,
    CallEngineOnMyBehalf = 5,
}

impl Permission for GrantablePermission {
    const COUNT: u32 = 6;

    fn bit(self) -> u32 {
        self as u32
    }
}

/// The role permission required to grant a grantable permission.
pub fn permission_for(grantable: GrantablePermission) -> RolePermission {
    match grantable {
        GrantablePermission::AddMySignatory => RolePermission::GrantAddMySignatory,
        GrantablePermission::RemoveMySignatory => RolePermission::GrantRemoveMySignatory,
        GrantablePermission::SetMyQuorum => RolePermission::GrantSetMyQuorum,
        GrantablePermission::SetMyAccountDetail => RolePermission::GrantSetMyAccountDetail,
        GrantablePermission::TransferMyAssets => RolePermission::GrantTransferMyAssets,
        GrantablePermission::CallEngineOnMyBehalf => RolePermission::GrantCallEngineOnMyBehalf,
    }
}

/// Errors from bitstring parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionParseError {
    #[error("permission bitstring has length {actual}, expected {expected}")]
    Length { expected: u32, actual: usize },
    #[error("permission bitstring contains a character other than `0`/`1`")]
    BadCharacter,
}

/// A fixed-width set of permissions.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PermissionSet<P: Permission> {
    bits: u128,
    _marker: PhantomData<P>,
}

impl<P: Permission> Default for PermissionSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Role permission set, the on-disk `role/{role}` and `permissions/...` value.
pub type RolePermissionSet = PermissionSet<RolePermission>;
/// Grantable permission set, the on-disk `granted/...` value.
pub type GrantablePermissionSet = PermissionSet<GrantablePermission>;

impl<P: Permission> PermissionSet<P> {
    const MASK: u128 = if P::COUNT == 128 {
        u128::MAX
    } else {
        (1u128 << P::COUNT) - 1
    };

    /// The empty set.
    pub fn new() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// A set containing the given permissions.
    pub fn from_permissions(permissions: impl IntoIterator<Item = P>) -> Self {
        let mut set = Self::new();
        for permission in permissions {
            set.set(permission);
        }
        set
    }

    pub fn is_set(&self, permission: P) -> bool {
        self.bits & (1 << permission.bit()) != 0
    }

    pub fn set(&mut self, permission: P) {
        self.bits |= 1 << permission.bit();
    }

    pub fn unset(&mut self, permission: P) {
        self.bits &= !(1 << permission.bit());
    }

    /// Set every permission.
    pub fn set_all(&mut self) {
        self.bits = Self::MASK;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Serialize to the canonical bitstring: character `i` is bit `i`.
    pub fn to_bitstring(&self) -> String {
        (0..P::COUNT)
            .map(|bit| if self.bits & (1 << bit) != 0 { '1' } else { '0' })
            .collect()
    }

    /// Parse the canonical bitstring form.
    pub fn from_bitstring(s: &str) -> Result<Self, PermissionParseError> {
        if s.len() != P::COUNT as usize {
            return Err(PermissionParseError::Length {
                expected: P::COUNT,
                actual: s.len(),
            });
        }
        let mut bits = 0u128;
        for (i, c) in s.bytes().enumerate() {
            match c {
                b'1' => bits |= 1 << i,
                b'0' => {}
                _ => return Err(PermissionParseError::BadCharacter),
            }
        }
        Ok(Self {
            bits,
            _marker: PhantomData,
        })
    }
}

impl<P: Permission> BitOrAssign for PermissionSet<P> {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

// Debug renders the canonical bitstring; the variant list would be noisy.
impl<P: Permission> fmt::Debug for PermissionSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bitstring())
    }
}

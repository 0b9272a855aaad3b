//! Proof roles and the per-position metadata word stored in the frontier

use std::ops::BitOr;

/// The role a position plays in a strong solution proof
///
/// # Notes
/// Roles are bit flags so that a position reached along several lines of the
/// proof carries all of its roles in a single [`KindMask`]. A role is passed
/// down to a child according to whether the child is the *most promising*
/// one, meaning it is reached by the parent's best move under center-out
/// tie-breaking (see [`NodeKind::child`]).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum NodeKind {
    /// Principal-variation solution node
    Principal = 1 << 0,
    /// Alternative solution node, opened where the second player deviates
    /// from the principal variation
    Alternative = 1 << 1,
    /// Proof branch refuting an alternative
    Refutation = 1 << 2,
    /// Certificate-side main line
    CertLine = 1 << 3,
    /// Certificate-side alternative
    CertBranch = 1 << 4,
}

impl NodeKind {
    /// All five roles in bit order
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Principal,
        NodeKind::Alternative,
        NodeKind::Refutation,
        NodeKind::CertLine,
        NodeKind::CertBranch,
    ];

    /// Returns the role a child inherits from a parent holding this role
    pub fn child(self, most_promising: bool) -> NodeKind {
        use NodeKind::*;
        match (self, most_promising) {
            (Principal, true) => Principal,
            (Principal, false) => Alternative,
            (Alternative, true) => Refutation,
            (Alternative, false) => CertLine,
            (Refutation, _) => Alternative,
            (CertLine, _) => CertBranch,
            (CertBranch, _) => CertLine,
        }
    }

    /// The singleton role set holding only this role
    pub const fn mask(self) -> KindMask {
        KindMask(self as u8)
    }
}

/// A set of proof roles packed into the low five bits of a byte
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct KindMask(u8);

impl KindMask {
    /// The empty role set
    pub const EMPTY: Self = Self(0);

    /// The roles that make a position part of the solution itself
    pub const SOLUTION: Self = Self(
        NodeKind::Principal as u8 | NodeKind::Alternative as u8 | NodeKind::Refutation as u8,
    );

    /// The roles on the certificate side of the proof
    pub const CERTIFICATE: Self = Self(NodeKind::CertLine as u8 | NodeKind::CertBranch as u8);

    /// Builds a role set from raw bits, discarding anything above the five
    /// role flags
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x1F)
    }

    /// Accesses the raw five role bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a single role is present
    pub fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind as u8 != 0
    }

    /// Whether the two sets share any role
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether every role present is also present in `other`
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Whether any role lies on the solution side of the proof
    pub fn is_solution_artifact(self) -> bool {
        self.intersects(Self::SOLUTION)
    }

    /// Iterates over the roles present
    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }

    /// Returns the union of child roles over every role present
    pub fn child_mask(self, most_promising: bool) -> KindMask {
        self.iter()
            .map(|kind| kind.child(most_promising).mask())
            .fold(Self::EMPTY, BitOr::bitor)
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<NodeKind> for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: NodeKind) -> Self {
        Self(self.0 | rhs as u8)
    }
}

impl BitOr for NodeKind {
    type Output = KindMask;

    fn bitor(self, rhs: Self) -> KindMask {
        KindMask(self as u8 | rhs as u8)
    }
}

impl From<NodeKind> for KindMask {
    fn from(kind: NodeKind) -> Self {
        kind.mask()
    }
}

/// The 14-bit metadata word attached to each frontier position
///
/// Bits `[0, 2)` hold the side-to-move value plus one (0, 1, 2 for loss,
/// draw, win) and bits `[2, 7)` hold the [`KindMask`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NodeMeta(u16);

impl NodeMeta {
    /// The width of the metadata word in a frontier slot
    pub const BITS: u32 = 14;

    /// Packs a side-to-move value in `{-1, 0, 1}` and a role set
    pub fn new(value: i8, kinds: KindMask) -> Self {
        debug_assert!((-1..=1).contains(&value));
        Self((value + 1) as u16 | (kinds.bits() as u16) << 2)
    }

    /// Rebuilds the word from its stored form
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & ((1 << Self::BITS) - 1))
    }

    /// Accesses the stored form
    pub fn bits(self) -> u16 {
        self.0
    }

    /// The side-to-move value in `{-1, 0, 1}`
    pub fn value(self) -> i8 {
        (self.0 & 0x3) as i8 - 1
    }

    /// The role set
    pub fn kinds(self) -> KindMask {
        KindMask::from_bits((self.0 >> 2) as u8)
    }

    /// Merges a second sighting of the same position into this word
    ///
    /// The existing value is kept (a correct oracle reports the same value
    /// through every parent, so a mismatch is tolerated rather than fatal)
    /// and the role sets are unioned.
    pub fn merge(self, other: NodeMeta) -> NodeMeta {
        Self((self.0 & 0x3) | ((self.kinds() | other.kinds()).bits() as u16) << 2)
    }
}

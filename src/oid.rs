//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u64; 16]>` to avoid heap allocation for common OIDs.
//! All operations are pure: they never mutate `self` and return new values.

use crate::error::{EncodeErrorKind, Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Maximum number of arcs (subidentifiers) accepted when decoding an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// An ordered sequence of non-negative sub-identifiers. Any length is
/// tolerated, including the empty OID which sorts before every other OID.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Oid {
    arcs: SmallVec<[u64; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// # Examples
    ///
    /// ```
    /// use snmp_stack::oid::Oid;
    ///
    /// let oid = Oid::new(vec![1, 3, 6, 1, 2, 1]);
    /// assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1]);
    ///
    /// let oid = Oid::new(0..5);
    /// assert_eq!(oid.arcs(), &[0, 1, 2, 3, 4]);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u64>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u64]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted string notation (e.g., "1.3.6.1.2.1.1.1.0").
    ///
    /// A single leading dot is accepted (`.1.3.6`). Empty input, empty
    /// components (`1..3`, trailing dot) and non-numeric components fail with
    /// [`Error::InvalidOid`].
    ///
    /// ```
    /// use snmp_stack::oid::Oid;
    ///
    /// assert_eq!(Oid::parse("1.3.6.1").unwrap().len(), 4);
    /// assert!(Oid::parse("1..3").is_err());
    /// assert!(Oid::parse("1.x.3").is_err());
    /// assert!(Oid::parse("").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            if part.is_empty() {
                return Err(Error::invalid_oid_with_input(
                    OidErrorKind::EmptyComponent,
                    s,
                ));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_oid_with_input(OidErrorKind::NonNumeric, s));
            }
            let arc: u64 = part.parse().map_err(|_| {
                Error::invalid_oid_with_input(OidErrorKind::SubidentifierOverflow, s)
            })?;
            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Total order: lexicographic over the shared prefix, then shorter first.
    pub fn compare(&self, other: &Oid) -> Ordering {
        self.arcs[..].cmp(&other.arcs[..])
    }

    /// Compare only the first `n` arcs of each OID.
    ///
    /// OIDs shorter than `n` are compared in full, so a shorter OID that is a
    /// prefix of the other sorts first.
    ///
    /// ```
    /// use snmp_stack::oid;
    /// use std::cmp::Ordering;
    ///
    /// let a = oid!(1, 3, 6, 1, 2);
    /// let b = oid!(1, 3, 6, 1, 4);
    /// assert_eq!(a.compare_prefix(&b, 4), Ordering::Equal);
    /// assert_eq!(a.compare_prefix(&b, 5), Ordering::Less);
    /// ```
    pub fn compare_prefix(&self, other: &Oid, n: usize) -> Ordering {
        let a = &self.arcs[..n.min(self.arcs.len())];
        let b = &other.arcs[..n.min(other.arcs.len())];
        a.cmp(b)
    }

    /// Whether `other` lies in the subtree rooted at `self`.
    ///
    /// True iff `self` is a prefix of `other` (an OID contains itself).
    pub fn contains(&self, other: &Oid) -> bool {
        other.starts_with(self)
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// Arcs following `prefix`, if `self` lies under it.
    pub fn suffix_after(&self, prefix: &Oid) -> Option<&[u64]> {
        self.starts_with(prefix)
            .then(|| &self.arcs[prefix.arcs.len()..])
    }

    /// Drop the first `len` arcs.
    ///
    /// ```
    /// use snmp_stack::oid;
    ///
    /// assert_eq!(oid!(1, 3, 6, 1, 2).trim_prefix(3), oid!(1, 2));
    /// assert!(oid!(1, 3).trim_prefix(5).is_empty());
    /// ```
    pub fn trim_prefix(&self, len: usize) -> Oid {
        let start = len.min(self.arcs.len());
        Self::from_slice(&self.arcs[start..])
    }

    /// Drop the last `len` arcs.
    pub fn trim_suffix(&self, len: usize) -> Oid {
        let end = self.arcs.len().saturating_sub(len);
        Self::from_slice(&self.arcs[..end])
    }

    /// Return a new OID with `ids` appended.
    pub fn append(&self, ids: impl IntoIterator<Item = u64>) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend(ids);
        Oid { arcs }
    }

    /// Get the parent OID (all arcs except the last).
    ///
    /// Returns `None` if the OID is empty.
    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(self.trim_suffix(1))
        }
    }

    /// Create a child OID by appending an arc.
    ///
    /// ```
    /// use snmp_stack::oid::Oid;
    ///
    /// let system = Oid::parse("1.3.6.1.2.1.1").unwrap();
    /// assert_eq!(system.child(1).child(0).to_string(), "1.3.6.1.2.1.1.1.0");
    /// ```
    pub fn child(&self, arc: u64) -> Oid {
        self.append([arc])
    }

    /// Validate the first two arcs per X.690 Section 8.19.4.
    ///
    /// - arc1 must be 0, 1, or 2
    /// - arc2 must be <= 39 when arc1 is 0 or 1
    pub fn validate(&self) -> Result<()> {
        let Some(&arc1) = self.arcs.first() else {
            return Ok(());
        };

        if arc1 > 2 {
            return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(arc1)));
        }

        if let Some(&arc2) = self.arcs.get(1) {
            if arc1 < 2 && arc2 >= 40 {
                return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                    first: arc1,
                    second: arc2,
                }));
            }
        }

        Ok(())
    }

    /// Encode the sub-identifiers to BER content bytes (X.690 Section 8.19).
    ///
    /// The first two arcs are packed as `arc1 * 40 + arc2`; every
    /// sub-identifier is written base-128 with 0x80 set on all but its last
    /// byte. An empty OID encodes to empty content; a single arc encodes as
    /// `arc1 * 40`.
    pub fn to_ber(&self) -> Result<SmallVec<[u8; 64]>> {
        let mut bytes = SmallVec::new();

        let Some(&arc1) = self.arcs.first() else {
            return Ok(bytes);
        };

        if self.validate().is_err() {
            return Err(Error::encode(EncodeErrorKind::InvalidOid));
        }

        let arc2 = self.arcs.get(1).copied().unwrap_or(0);
        let first = (arc1 * 40)
            .checked_add(arc2)
            .ok_or_else(|| Error::encode(EncodeErrorKind::InvalidOid))?;
        encode_subidentifier(&mut bytes, first);

        for &arc in self.arcs.iter().skip(2) {
            encode_subidentifier(&mut bytes, arc);
        }

        Ok(bytes)
    }

    /// Number of content bytes [`to_ber`](Self::to_ber) produces.
    pub fn ber_len(&self) -> usize {
        let Some(&arc1) = self.arcs.first() else {
            return 0;
        };
        let arc2 = self.arcs.get(1).copied().unwrap_or(0);
        let first = subidentifier_len(arc1.saturating_mul(40).saturating_add(arc2));
        first
            + self
                .arcs
                .iter()
                .skip(2)
                .map(|&arc| subidentifier_len(arc))
                .sum::<usize>()
    }

    /// Decode from BER content bytes.
    ///
    /// Enforces [`MAX_OID_LEN`]. Non-minimal sub-identifiers (leading 0x80)
    /// are accepted.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        let (first, consumed) = decode_subidentifier(data)?;
        match first {
            0..40 => {
                arcs.push(0);
                arcs.push(first);
            }
            40..80 => {
                arcs.push(1);
                arcs.push(first - 40);
            }
            _ => {
                arcs.push(2);
                arcs.push(first - 80);
            }
        }

        let mut i = consumed;
        while i < data.len() {
            let (arc, used) = decode_subidentifier(&data[i..])?;
            arcs.push(arc);
            i += used;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                }));
            }
        }

        Ok(Self { arcs })
    }
}

#[inline]
fn subidentifier_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode a subidentifier in base-128 variable length.
#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u64) {
    let count = subidentifier_len(value);
    for i in (0..count).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier, returning (value, bytes_consumed).
fn decode_subidentifier(data: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in data.iter().enumerate() {
        if value > (u64::MAX >> 7) {
            return Err(Error::invalid_oid(OidErrorKind::SubidentifierOverflow));
        }
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(Error::invalid_oid(OidErrorKind::Truncated))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u64]> for Oid {
    fn from(arcs: &[u64]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u64; N]> for Oid {
    fn from(arcs: [u64; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_stack::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// assert!(oid!(1, 3, 6, 1, 2, 1, 1).contains(&sys_descr));
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc as u64),*])
    };
}

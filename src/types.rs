use crate::KID_LEN;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};


/// The server-held master key hierarchy: the base derivation key (BDK) from
/// which per-device keys descend, the secret token key (STK) from which
/// session tokens descend, and a key identity. Read-only once generated;
/// erased on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey<const K: usize> {
    pub(crate) bdk: [u8; K],
    pub(crate) stk: [u8; K],
    pub(crate) kid: [u8; KID_LEN],
}

impl<const K: usize> MasterKey<K> {
    pub(crate) fn new(bdk: [u8; K], stk: [u8; K], kid: [u8; KID_LEN]) -> Self {
        Self { bdk, stk, kid }
    }

    /// The master key identity.
    #[must_use]
    pub fn kid(&self) -> &[u8; KID_LEN] { &self.kid }
}


/// An embedded device key (EDK), provisioned into a single terminal at
/// manufacture. Erased on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EmbeddedDeviceKey<const K: usize>(pub(crate) [u8; K]);

impl<const K: usize> EmbeddedDeviceKey<K> {
    pub(crate) fn new(key: [u8; K]) -> Self { Self(key) }
}

// Conservative (constant-time) support...
impl<const K: usize> PartialEq for EmbeddedDeviceKey<K> {
    fn eq(&self, other: &Self) -> bool { bool::from(self.0.ct_eq(&other.0)) }
}

impl<const K: usize> Eq for EmbeddedDeviceKey<K> {}


/// An unwrapped session token; lives only between the client's
/// `decrypt_token` and `generate_cache` calls, then drops and erases itself.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Token<const K: usize>(pub(crate) [u8; K]);

impl<const K: usize> Token<K> {
    pub(crate) fn new(token: [u8; K]) -> Self { Self(token) }
}

// Conservative (constant-time) support...
impl<const K: usize> PartialEq for Token<K> {
    fn eq(&self, other: &Self) -> bool { bool::from(self.0.ct_eq(&other.0)) }
}

impl<const K: usize> Eq for Token<K> {}


/// The KMAC authentication mode carried in the PID byte of a device
/// identity (offset 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthenticationMode {
    /// Messages are encrypted only.
    None = 0x10,
    /// Messages are encrypted then KMAC authenticated.
    Kmac = 0x11,
    /// Reserved designator for a SHA3-based authenticated mode; no distinct
    /// construction is defined, devices provisioned with it behave as
    /// [`AuthenticationMode::Kmac`].
    Sha3 = 0x12,
}

//! Trait-covered functionality, such that consumers can write code generic
//! over the security parameter sets.

use crate::{HkdsError, KID_LEN};
use rand_core::CryptoRngCore;


#[cfg(feature = "default-rng")]
use rand_core::OsRng;


/// The `MasterKeyGen` trait generates the server's master key hierarchy.
pub trait MasterKeyGen {
    /// The master key struct specific to the target security parameter set.
    type MasterKey;


    /// Generates a master key hierarchy (BDK, STK, and key identity) using
    /// the OS default random number generator.
    /// # Errors
    /// Returns an error when the random number generator fails; no key
    /// material survives the failure.
    /// # Examples
    /// ```rust
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use hkds::hkds_256;                                  // Could also be hkds_128 or hkds_512.
    /// use hkds::traits::MasterKeyGen;
    ///
    /// let mdk = hkds_256::MdkGen::try_generate(&[1, 2, 3, 4])?;
    /// assert_eq!(mdk.kid(), &[1, 2, 3, 4]);
    /// # Ok(())}
    /// ```
    #[cfg(feature = "default-rng")]
    fn try_generate(kid: &[u8; KID_LEN]) -> Result<Self::MasterKey, HkdsError> {
        Self::try_generate_with_rng(&mut OsRng, kid)
    }


    /// Generates a master key hierarchy using a provided random number
    /// generator.
    /// # Errors
    /// Returns an error when the random number generator fails; no key
    /// material survives the failure.
    /// # Examples
    /// ```rust
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use rand_core::OsRng;
    /// use hkds::hkds_256;                                  // Could also be hkds_128 or hkds_512.
    /// use hkds::traits::MasterKeyGen;
    ///
    /// let mdk = hkds_256::MdkGen::try_generate_with_rng(&mut OsRng, &[1, 2, 3, 4])?;
    /// assert_eq!(mdk.kid(), &[1, 2, 3, 4]);
    /// # Ok(())}
    /// ```
    fn try_generate_with_rng(
        rng: &mut impl CryptoRngCore, kid: &[u8; KID_LEN],
    ) -> Result<Self::MasterKey, HkdsError>;
}


/// Serialization and deserialization of keys and wire packets.
pub trait SerDes {
    /// Correctly sized byte array for the struct.
    type ByteArray;


    /// Produces a byte array of fixed size specific to the struct being
    /// serialized.
    /// # Examples
    /// ```rust
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use hkds::hkds_256;
    /// use hkds::traits::SerDes;
    ///
    /// let request = hkds_256::TokenRequest::new(&[0u8; 16]);
    /// let on_the_wire = request.into_bytes();              // 4-byte header plus the KSN
    /// assert_eq!(on_the_wire.len(), 20);
    /// # Ok(())}
    /// ```
    fn into_bytes(self) -> Self::ByteArray;


    /// Consumes a byte array of fixed size specific to the struct being
    /// deserialized; performs validation.
    /// # Errors
    /// Returns an error on malformed input, e.g. a header whose flag,
    /// protocol id, or length disagrees with the structural shape.
    /// # Examples
    /// ```rust
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use hkds::hkds_256;
    /// use hkds::traits::SerDes;
    ///
    /// let bytes = hkds_256::TokenRequest::new(&[0u8; 16]).into_bytes();
    /// let request = hkds_256::TokenRequest::try_from_bytes(bytes)?;
    /// assert_eq!(request.ksn, [0u8; 16]);
    /// # Ok(())}
    /// ```
    fn try_from_bytes(ba: Self::ByteArray) -> Result<Self, HkdsError>
    where
        Self: Sized;
}

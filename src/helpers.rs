use crate::{HkdsError, DID_LEN, KSN_LEN};
use subtle::ConstantTimeEq;


/// If the condition is not met, return an error value. Borrowed from the `anyhow` crate.
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub(crate) use ensure; // make available throughout crate


/// Reads the big-endian transaction counter out of a KSN.
#[must_use]
pub(crate) fn transaction_counter(ksn: &[u8; KSN_LEN]) -> u32 {
    u32::from_be_bytes(ksn[DID_LEN..].try_into().expect("tkc fail"))
}


/// Writes the big-endian transaction counter back into a KSN.
pub(crate) fn set_transaction_counter(ksn: &mut [u8; KSN_LEN], value: u32) {
    ksn[DID_LEN..].copy_from_slice(&value.to_be_bytes());
}


/// Constant-time comparison of a computed MAC against a received one; neither
/// the match position nor the mismatch position is observable through timing.
pub(crate) fn verify_tag(computed: &[u8], received: &[u8]) -> Result<(), HkdsError> {
    ensure!(bool::from(computed.ct_eq(received)), HkdsError::AuthFailure);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_round_trip() {
        let mut ksn = [0u8; KSN_LEN];
        set_transaction_counter(&mut ksn, 0x0102_0304);
        assert_eq!(&ksn[DID_LEN..], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(transaction_counter(&ksn), 0x0102_0304);
    }

    #[test]
    fn tag_verify_rejects_mismatch() {
        let a = [0x5Au8; 16];
        let mut b = a;
        assert!(verify_tag(&a, &b).is_ok());
        b[15] ^= 1;
        assert_eq!(verify_tag(&a, &b), Err(HkdsError::AuthFailure));
    }
}

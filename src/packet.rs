//! The five fixed packet shapes exchanged between client and server.
//!
//! Every packet starts with the 4-byte header `[flag, protocol, sequence,
//! length]`; all header fields are single bytes, and the only multi-byte
//! wire quantity anywhere is the big-endian transaction counter inside the
//! KSN. Serialization is a flat copy of the fields; deserialization rejects
//! any buffer whose flag, protocol id, or length byte disagrees with the
//! structural shape as [`HkdsError::InvalidFormat`].
//!
//! The `PID` const parameter pins a packet type to the protocol id of the
//! security level that produced it, so packets from different parameter
//! sets are different types.

use crate::helpers::ensure;
use crate::traits::SerDes;
use crate::{HkdsError, ADMIN_LEN, ERROR_LEN, HEADER_LEN, KSN_LEN, MESSAGE_LEN, TAG_LEN};


/// Wire packet discriminator carried in the header flag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    /// A client token request.
    TokenRequest = 0x01,
    /// A server token response.
    TokenResponse = 0x02,
    /// A client message request.
    MessageRequest = 0x03,
    /// A server message response.
    MessageResponse = 0x04,
    /// An administrative message.
    AdministrativeMessage = 0x05,
    /// An error message.
    ErrorMessage = 0x06,
}

impl PacketType {
    fn from_byte(byte: u8) -> Result<Self, HkdsError> {
        match byte {
            0x01 => Ok(Self::TokenRequest),
            0x02 => Ok(Self::TokenResponse),
            0x03 => Ok(Self::MessageRequest),
            0x04 => Ok(Self::MessageResponse),
            0x05 => Ok(Self::AdministrativeMessage),
            0x06 => Ok(Self::ErrorMessage),
            _ => Err(HkdsError::InvalidFormat),
        }
    }
}


/// Error designators carried in the sequence byte of an error message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// General failure.
    GeneralFailure = 0x1F,
    /// The connection was aborted by the remote host.
    ConnectionAborted = 0x21,
    /// The network link was lost.
    Disconnected = 0x22,
    /// The connection was refused by the remote host.
    ConnectionRefused = 0x23,
    /// The request format was invalid.
    InvalidFormat = 0x24,
    /// The allowed number of retries was exceeded.
    RetriesExceeded = 0x25,
    /// The connection had a general failure.
    ConnectionFailure = 0x26,
    /// The cause of failure is unknown.
    UnknownFailure = 0xFF,
}

impl ErrorCode {
    fn from_byte(byte: u8) -> Result<Self, HkdsError> {
        match byte {
            0x1F => Ok(Self::GeneralFailure),
            0x21 => Ok(Self::ConnectionAborted),
            0x22 => Ok(Self::Disconnected),
            0x23 => Ok(Self::ConnectionRefused),
            0x24 => Ok(Self::InvalidFormat),
            0x25 => Ok(Self::RetriesExceeded),
            0x26 => Ok(Self::ConnectionFailure),
            0xFF => Ok(Self::UnknownFailure),
            _ => Err(HkdsError::InvalidFormat),
        }
    }
}


/// Administrative message opcodes; the 2-byte payload itself is opaque to
/// the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminMessageType {
    /// Sent by the client when a token key fails authentication.
    SynchronizeToken = 0x01,
    /// The server's response to a token key rejection.
    ReinitializedToken = 0x02,
    /// The maximum number of token failures has occurred.
    TokenRequestsExceeded = 0x03,
    /// The server remotely resets the client terminal.
    RemoteReset = 0x04,
    /// The server requests diagnostic output from the terminal.
    Diagnostic = 0x05,
    /// Reserved message 1.
    Reserved1 = 0x06,
    /// Reserved message 2.
    Reserved2 = 0x07,
    /// Reserved message 3.
    Reserved3 = 0x08,
}


/// Serialized size of a client token request.
pub const TOKEN_REQUEST_LEN: usize = HEADER_LEN + KSN_LEN;

/// Serialized size of a client message request.
pub const MESSAGE_REQUEST_LEN: usize = HEADER_LEN + KSN_LEN + MESSAGE_LEN + TAG_LEN;

/// Serialized size of a server message response.
pub const MESSAGE_RESPONSE_LEN: usize = HEADER_LEN + MESSAGE_LEN;

/// Serialized size of an administrative message.
pub const ADMIN_MESSAGE_LEN: usize = HEADER_LEN + ADMIN_LEN;

/// Serialized size of an error message.
pub const ERROR_MESSAGE_LEN: usize = HEADER_LEN + ERROR_LEN;


fn write_header(out: &mut [u8], flag: PacketType, protocol: u8, sequence: u8, length: usize) {
    out[0] = flag as u8;
    out[1] = protocol;
    out[2] = sequence;
    out[3] = length as u8;
}

fn check_header(
    bytes: &[u8], flag: PacketType, protocol: u8, length: usize,
) -> Result<(), HkdsError> {
    ensure!(PacketType::from_byte(bytes[0])? == flag, HkdsError::InvalidFormat);
    ensure!(bytes[1] == protocol, HkdsError::InvalidFormat);
    ensure!(bytes[3] as usize == length, HkdsError::InvalidFormat);
    Ok(())
}


/// Reads the packet type out of a raw buffer.
pub fn packet_type(input: &[u8]) -> Result<PacketType, HkdsError> {
    ensure!(input.len() >= HEADER_LEN, HkdsError::InvalidFormat);
    PacketType::from_byte(input[0])
}

/// Reads the protocol id byte out of a raw buffer.
pub fn protocol_id(input: &[u8]) -> Result<u8, HkdsError> {
    ensure!(input.len() >= HEADER_LEN, HkdsError::InvalidFormat);
    Ok(input[1])
}

/// Reads the sequence byte out of a raw buffer.
pub fn packet_sequence(input: &[u8]) -> Result<u8, HkdsError> {
    ensure!(input.len() >= HEADER_LEN, HkdsError::InvalidFormat);
    Ok(input[2])
}

/// Reads the declared packet size out of a raw buffer.
pub fn packet_size(input: &[u8]) -> Result<usize, HkdsError> {
    ensure!(input.len() >= HEADER_LEN, HkdsError::InvalidFormat);
    Ok(input[3] as usize)
}


/// A client token request: the device's KSN, sent at initialization and on
/// every cache exhaustion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest<const PID: u8> {
    /// The client's key serial number.
    pub ksn: [u8; KSN_LEN],
}

impl<const PID: u8> TokenRequest<PID> {
    /// Builds a token request for a device KSN.
    #[must_use]
    pub fn new(ksn: &[u8; KSN_LEN]) -> Self { Self { ksn: *ksn } }
}

impl<const PID: u8> SerDes for TokenRequest<PID> {
    type ByteArray = [u8; TOKEN_REQUEST_LEN];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; TOKEN_REQUEST_LEN];
        write_header(&mut out, PacketType::TokenRequest, PID, 0x01, TOKEN_REQUEST_LEN);
        out[HEADER_LEN..].copy_from_slice(&self.ksn);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::TokenRequest, PID, TOKEN_REQUEST_LEN)?;
        Ok(Self { ksn: bytes[HEADER_LEN..].try_into().expect("ksn fail") })
    }
}


/// A server token response: the encrypted, authenticated token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenResponse<const PID: u8, const ETOK: usize, const PKT: usize> {
    /// The encrypted token and its MAC tag.
    pub etok: [u8; ETOK],
}

impl<const PID: u8, const ETOK: usize, const PKT: usize> TokenResponse<PID, ETOK, PKT> {
    /// Builds a token response around a wrapped token.
    #[must_use]
    pub fn new(etok: &[u8; ETOK]) -> Self {
        debug_assert_eq!(PKT, HEADER_LEN + ETOK);
        Self { etok: *etok }
    }
}

impl<const PID: u8, const ETOK: usize, const PKT: usize> SerDes
    for TokenResponse<PID, ETOK, PKT>
{
    type ByteArray = [u8; PKT];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; PKT];
        write_header(&mut out, PacketType::TokenResponse, PID, 0x02, PKT);
        out[HEADER_LEN..].copy_from_slice(&self.etok);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::TokenResponse, PID, PKT)?;
        Ok(Self { etok: bytes[HEADER_LEN..].try_into().expect("etok fail") })
    }
}


/// A client message request: the KSN, the encrypted message, and the MAC
/// tag (all zero when the device runs unauthenticated).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRequest<const PID: u8> {
    /// The client's key serial number as of encryption.
    pub ksn: [u8; KSN_LEN],
    /// The encrypted message.
    pub message: [u8; MESSAGE_LEN],
    /// The authentication tag, or all zero.
    pub tag: [u8; TAG_LEN],
}

impl<const PID: u8> MessageRequest<PID> {
    /// Builds a message request; `tag` is `None` for unauthenticated devices.
    #[must_use]
    pub fn new(
        ksn: &[u8; KSN_LEN], message: &[u8; MESSAGE_LEN], tag: Option<&[u8; TAG_LEN]>,
    ) -> Self {
        Self {
            ksn: *ksn,
            message: *message,
            tag: tag.copied().unwrap_or([0u8; TAG_LEN]),
        }
    }
}

impl<const PID: u8> SerDes for MessageRequest<PID> {
    type ByteArray = [u8; MESSAGE_REQUEST_LEN];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; MESSAGE_REQUEST_LEN];
        write_header(&mut out, PacketType::MessageRequest, PID, 0x01, MESSAGE_REQUEST_LEN);
        out[HEADER_LEN..HEADER_LEN + KSN_LEN].copy_from_slice(&self.ksn);
        out[HEADER_LEN + KSN_LEN..HEADER_LEN + KSN_LEN + MESSAGE_LEN]
            .copy_from_slice(&self.message);
        out[HEADER_LEN + KSN_LEN + MESSAGE_LEN..].copy_from_slice(&self.tag);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::MessageRequest, PID, MESSAGE_REQUEST_LEN)?;
        Ok(Self {
            ksn: bytes[HEADER_LEN..HEADER_LEN + KSN_LEN].try_into().expect("ksn fail"),
            message: bytes[HEADER_LEN + KSN_LEN..HEADER_LEN + KSN_LEN + MESSAGE_LEN]
                .try_into()
                .expect("message fail"),
            tag: bytes[HEADER_LEN + KSN_LEN + MESSAGE_LEN..].try_into().expect("tag fail"),
        })
    }
}


/// A server message response: the 16-byte verification plaintext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageResponse<const PID: u8> {
    /// The server's plaintext response.
    pub message: [u8; MESSAGE_LEN],
}

impl<const PID: u8> MessageResponse<PID> {
    /// Builds a message response.
    #[must_use]
    pub fn new(message: &[u8; MESSAGE_LEN]) -> Self { Self { message: *message } }
}

impl<const PID: u8> SerDes for MessageResponse<PID> {
    type ByteArray = [u8; MESSAGE_RESPONSE_LEN];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; MESSAGE_RESPONSE_LEN];
        write_header(&mut out, PacketType::MessageResponse, PID, 0x02, MESSAGE_RESPONSE_LEN);
        out[HEADER_LEN..].copy_from_slice(&self.message);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::MessageResponse, PID, MESSAGE_RESPONSE_LEN)?;
        Ok(Self { message: bytes[HEADER_LEN..].try_into().expect("message fail") })
    }
}


/// An administrative message: a 2-byte opaque payload, conventionally an
/// [`AdminMessageType`] opcode and a parameter byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminMessage<const PID: u8> {
    /// The administrative payload.
    pub message: [u8; ADMIN_LEN],
}

impl<const PID: u8> AdminMessage<PID> {
    /// Builds an administrative message.
    #[must_use]
    pub fn new(message: &[u8; ADMIN_LEN]) -> Self { Self { message: *message } }
}

impl<const PID: u8> SerDes for AdminMessage<PID> {
    type ByteArray = [u8; ADMIN_MESSAGE_LEN];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; ADMIN_MESSAGE_LEN];
        write_header(&mut out, PacketType::AdministrativeMessage, PID, 0x01, ADMIN_MESSAGE_LEN);
        out[HEADER_LEN..].copy_from_slice(&self.message);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::AdministrativeMessage, PID, ADMIN_MESSAGE_LEN)?;
        Ok(Self { message: bytes[HEADER_LEN..].try_into().expect("message fail") })
    }
}


/// A bidirectional error message; the error designator rides in the header
/// sequence byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage<const PID: u8> {
    /// The error designator.
    pub code: ErrorCode,
    /// The error payload.
    pub message: [u8; ERROR_LEN],
}

impl<const PID: u8> ErrorMessage<PID> {
    /// Builds an error message.
    #[must_use]
    pub fn new(code: ErrorCode, message: &[u8; ERROR_LEN]) -> Self {
        Self { code, message: *message }
    }
}

impl<const PID: u8> SerDes for ErrorMessage<PID> {
    type ByteArray = [u8; ERROR_MESSAGE_LEN];

    fn into_bytes(self) -> Self::ByteArray {
        let mut out = [0u8; ERROR_MESSAGE_LEN];
        write_header(&mut out, PacketType::ErrorMessage, PID, self.code as u8, ERROR_MESSAGE_LEN);
        out[HEADER_LEN..].copy_from_slice(&self.message);
        out
    }

    fn try_from_bytes(bytes: Self::ByteArray) -> Result<Self, HkdsError> {
        check_header(&bytes, PacketType::ErrorMessage, PID, ERROR_MESSAGE_LEN)?;
        Ok(Self {
            code: ErrorCode::from_byte(bytes[2])?,
            message: bytes[HEADER_LEN..].try_into().expect("message fail"),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const PID: u8 = 0x0A;

    #[test]
    fn token_request_round_trip() {
        let ksn = [0x11u8; KSN_LEN];
        let bytes = TokenRequest::<PID>::new(&ksn).into_bytes();
        assert_eq!(&bytes[..HEADER_LEN], &[0x01, PID, 0x01, 20]);
        let parsed = TokenRequest::<PID>::try_from_bytes(bytes).unwrap();
        assert_eq!(parsed.ksn, ksn);
    }

    #[test]
    fn wrong_protocol_is_rejected() {
        let mut bytes = TokenRequest::<PID>::new(&[0u8; KSN_LEN]).into_bytes();
        bytes[1] = 0x0B;
        assert_eq!(
            TokenRequest::<PID>::try_from_bytes(bytes),
            Err(HkdsError::InvalidFormat)
        );
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut bytes = MessageResponse::<PID>::new(&[0u8; MESSAGE_LEN]).into_bytes();
        bytes[3] = 19;
        assert_eq!(
            MessageResponse::<PID>::try_from_bytes(bytes),
            Err(HkdsError::InvalidFormat)
        );
    }

    #[test]
    fn error_code_rides_in_sequence_byte() {
        let msg = ErrorMessage::<PID>::new(ErrorCode::InvalidFormat, &[0u8; ERROR_LEN]);
        let bytes = msg.clone().into_bytes();
        assert_eq!(bytes[2], 0x24);
        assert_eq!(ErrorMessage::<PID>::try_from_bytes(bytes).unwrap(), msg);
    }

    #[test]
    fn raw_buffer_accessors() {
        let bytes = AdminMessage::<PID>::new(&[0x01, 0x00]).into_bytes();
        assert_eq!(packet_type(&bytes).unwrap(), PacketType::AdministrativeMessage);
        assert_eq!(protocol_id(&bytes).unwrap(), PID);
        assert_eq!(packet_sequence(&bytes).unwrap(), 0x01);
        assert_eq!(packet_size(&bytes).unwrap(), ADMIN_MESSAGE_LEN);
        assert!(packet_type(&bytes[..2]).is_err());
    }
}

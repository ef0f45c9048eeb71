//! Diameter AVP (Attribute-Value Pair) encoding and decoding
//!
//! AVP format (RFC 6733):
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           AVP Code                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V M P r r r r r|                  AVP Length                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Vendor-ID (opt)                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Data ...
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! The AVP Length field covers the header plus the unpadded data; encoded
//! AVPs are zero-padded to a 4-octet boundary and the pad octets are not
//! counted in the Length field.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{DiameterError, DiameterResult};

/// AVP flags
pub mod avp_flags {
    /// Vendor-Specific bit
    pub const VENDOR: u8 = 0x80;
    /// Mandatory bit
    pub const MANDATORY: u8 = 0x40;
    /// Protected bit
    pub const PROTECTED: u8 = 0x20;
}

/// AVP header size without vendor ID
pub const AVP_HEADER_SIZE: usize = 8;
/// AVP header size with vendor ID
pub const AVP_HEADER_SIZE_VENDOR: usize = 12;

/// Seconds between the Diameter time epoch (1900-01-01 UTC, RFC 5905) and
/// the Unix epoch
const SECONDS_BETWEEN_1900_AND_UNIX_EPOCH: u64 = 2_208_988_800;

/// Address family numbers used in the Address AVP type (IANA assigned)
pub mod address_family {
    pub const IP4: u16 = 1;
    pub const IP6: u16 = 2;
    pub const NSAP: u16 = 3;
    pub const HDLC: u16 = 4;
    pub const BBN1822: u16 = 5;
    pub const ETHERNET: u16 = 6;
    pub const E163: u16 = 7;
    pub const E164: u16 = 8;
    pub const F69: u16 = 9;
    pub const X121: u16 = 10;
    pub const IPX: u16 = 11;
    pub const APPLETALK: u16 = 12;
    pub const DECNET_IV: u16 = 13;
    pub const BANYAN_VINES: u16 = 14;
    pub const E164_WITH_NSAP: u16 = 15;
    pub const DNS: u16 = 16;
    pub const DISTINGUISHED_NAME: u16 = 17;
    pub const AS_NUMBER: u16 = 18;
    pub const XTP_OVER_IP4: u16 = 19;
    pub const XTP_OVER_IP6: u16 = 20;
    pub const XTP_NATIVE_MODE: u16 = 21;
    pub const FIBRE_CHANNEL_PORT_NAME: u16 = 22;
    pub const FIBRE_CHANNEL_NODE_NAME: u16 = 23;
    pub const GWID: u16 = 24;
    pub const AFI_FOR_L2VPN: u16 = 25;
    pub const MAC_48_BIT: u16 = 16389;
    pub const MAC_64_BIT: u16 = 16390;
}

/// The closed set of Diameter AVP data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvpDataType {
    /// Unsigned 32-bit integer
    Unsigned32,
    /// Unsigned 64-bit integer
    Unsigned64,
    /// Signed 32-bit integer
    Integer32,
    /// Signed 64-bit integer
    Integer64,
    /// IEEE 754 single-precision float
    Float32,
    /// IEEE 754 double-precision float
    Float64,
    /// Enumerated (signed 32-bit integer domain)
    Enumerated,
    /// UTF-8 encoded text
    Utf8String,
    /// Arbitrary octet stream
    OctetString,
    /// Seconds since 1900-01-01 UTC as an unsigned 32-bit integer
    Time,
    /// Address family number followed by family-specific bytes
    Address,
    /// Diameter identity (FQDN)
    DiamIdent,
    /// Diameter URI
    DiamUri,
    /// A concatenation of encoded AVPs
    Grouped,
    /// IP filter rule text
    IpFilterRule,
    /// Sentinel for AVPs whose type is not known
    Unknown,
}

/// A typed AVP value, in the domain prescribed by its [`AvpDataType`]
#[derive(Debug, Clone, PartialEq)]
pub enum AvpValue {
    Unsigned32(u32),
    Unsigned64(u64),
    Integer32(i32),
    Integer64(i64),
    Float32(f32),
    Float64(f64),
    Enumerated(i32),
    Utf8String(String),
    OctetString(Vec<u8>),
    /// Seconds since 1900-01-01 UTC
    Time(u32),
    Address(AddressType),
    DiamIdent(String),
    DiamUri(String),
    Grouped(Vec<Avp>),
    IpFilterRule(Vec<u8>),
    Unknown(Vec<u8>),
}

/// Accepted input shapes for [`Avp::new_typed`]
///
/// Each [`AvpDataType`] accepts a small set of these shapes; anything else
/// fails with `TypeCoercion`. `Int` stands in for an uncast integer literal:
/// every numeric data type accepts it and coerces by bit-reinterpretation to
/// the declared width, with no overflow check (a negative value becomes the
/// corresponding two's-complement unsigned bits). Fixed-width signed inputs
/// are rejected by the unsigned types so that sign changes are never silent.
#[derive(Debug, Clone)]
pub enum AvpInput {
    U32(u32),
    U64(u64),
    I32(i32),
    I64(i64),
    /// An uncast integer; accepted by every numeric type
    Int(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Instant(SystemTime),
    Ip(IpAddr),
    Address(AddressType),
    Grouped(Vec<Avp>),
}

impl From<u32> for AvpInput {
    fn from(v: u32) -> Self {
        AvpInput::U32(v)
    }
}
impl From<u64> for AvpInput {
    fn from(v: u64) -> Self {
        AvpInput::U64(v)
    }
}
impl From<i32> for AvpInput {
    fn from(v: i32) -> Self {
        AvpInput::I32(v)
    }
}
impl From<i64> for AvpInput {
    fn from(v: i64) -> Self {
        AvpInput::I64(v)
    }
}
impl From<f32> for AvpInput {
    fn from(v: f32) -> Self {
        AvpInput::F32(v)
    }
}
impl From<f64> for AvpInput {
    fn from(v: f64) -> Self {
        AvpInput::F64(v)
    }
}
impl From<&str> for AvpInput {
    fn from(v: &str) -> Self {
        AvpInput::Text(v.to_string())
    }
}
impl From<String> for AvpInput {
    fn from(v: String) -> Self {
        AvpInput::Text(v)
    }
}
impl From<Vec<u8>> for AvpInput {
    fn from(v: Vec<u8>) -> Self {
        AvpInput::Bytes(v)
    }
}
impl From<&[u8]> for AvpInput {
    fn from(v: &[u8]) -> Self {
        AvpInput::Bytes(v.to_vec())
    }
}
impl From<SystemTime> for AvpInput {
    fn from(v: SystemTime) -> Self {
        AvpInput::Instant(v)
    }
}
impl From<IpAddr> for AvpInput {
    fn from(v: IpAddr) -> Self {
        AvpInput::Ip(v)
    }
}
impl From<std::net::Ipv4Addr> for AvpInput {
    fn from(v: std::net::Ipv4Addr) -> Self {
        AvpInput::Ip(IpAddr::V4(v))
    }
}
impl From<std::net::Ipv6Addr> for AvpInput {
    fn from(v: std::net::Ipv6Addr) -> Self {
        AvpInput::Ip(IpAddr::V6(v))
    }
}
impl From<AddressType> for AvpInput {
    fn from(v: AddressType) -> Self {
        AvpInput::Address(v)
    }
}
impl From<Vec<Avp>> for AvpInput {
    fn from(v: Vec<Avp>) -> Self {
        AvpInput::Grouped(v)
    }
}

/// The wire form of the Address AVP type: a 2-octet address family number in
/// network byte order followed by the family-specific bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressType {
    bytes: Vec<u8>,
}

impl AddressType {
    /// Create an AddressType from an address family number and the
    /// family-specific bytes (usually network byte order). IP4 requires
    /// exactly 4 value bytes and IP6 exactly 16.
    pub fn new(family: u16, value: &[u8]) -> DiameterResult<Self> {
        match family {
            address_family::IP4 if value.len() != 4 => {
                return Err(DiameterError::TypeCoercion(
                    "an IP4 address must have exactly 4 bytes".to_string(),
                ));
            }
            address_family::IP6 if value.len() != 16 => {
                return Err(DiameterError::TypeCoercion(
                    "an IP6 address must have exactly 16 bytes".to_string(),
                ));
            }
            _ => {}
        }

        let mut bytes = Vec::with_capacity(2 + value.len());
        bytes.extend_from_slice(&family.to_be_bytes());
        bytes.extend_from_slice(value);
        Ok(Self { bytes })
    }

    /// Create an AddressType from an IP address, as family IP4 (6-byte form)
    /// or IP6 (18-byte form)
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => {
                let mut bytes = Vec::with_capacity(6);
                bytes.extend_from_slice(&address_family::IP4.to_be_bytes());
                bytes.extend_from_slice(&v4.octets());
                Self { bytes }
            }
            IpAddr::V6(v6) => {
                let mut bytes = Vec::with_capacity(18);
                bytes.extend_from_slice(&address_family::IP6.to_be_bytes());
                bytes.extend_from_slice(&v6.octets());
                Self { bytes }
            }
        }
    }

    /// Interpret raw AVP data as an AddressType. The data must contain at
    /// least the family number, and IP families must carry exactly their
    /// fixed-size address.
    pub fn from_avp_data(data: &[u8]) -> DiameterResult<Self> {
        if data.len() < 2 {
            return Err(DiameterError::TypeMismatch(
                "type Address requires at least 2 bytes".to_string(),
            ));
        }

        let family = u16::from_be_bytes([data[0], data[1]]);
        match family {
            address_family::IP4 if data.len() != 6 => Err(DiameterError::TypeMismatch(
                "an IP4 Address must be exactly 6 bytes".to_string(),
            )),
            address_family::IP6 if data.len() != 18 => Err(DiameterError::TypeMismatch(
                "an IP6 Address must be exactly 18 bytes".to_string(),
            )),
            _ => Ok(Self {
                bytes: data.to_vec(),
            }),
        }
    }

    /// The address family number
    pub fn family(&self) -> u16 {
        u16::from_be_bytes([self.bytes[0], self.bytes[1]])
    }

    /// The family-specific bytes after the family number
    pub fn address(&self) -> &[u8] {
        &self.bytes[2..]
    }

    /// The full wire form (family number plus address bytes)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if the family is IP4 or IP6
    pub fn is_ip(&self) -> bool {
        matches!(self.family(), address_family::IP4 | address_family::IP6)
    }

    /// The single IP view of this address, if the family is IP4 or IP6
    pub fn to_ip(&self) -> Option<IpAddr> {
        match self.family() {
            address_family::IP4 => {
                let octets: [u8; 4] = self.address().try_into().ok()?;
                Some(IpAddr::V4(octets.into()))
            }
            address_family::IP6 => {
                let octets: [u8; 16] = self.address().try_into().ok()?;
                Some(IpAddr::V6(octets.into()))
            }
            _ => None,
        }
    }
}

/// Extended AVP attributes attached by a dictionary: a human-friendly name
/// and the typed value for the AVP's declared data type.
#[derive(Debug, Clone, PartialEq)]
pub struct AvpExtendedAttributes {
    pub name: Option<String>,
    pub data_type: AvpDataType,
    pub typed_value: AvpValue,
}

/// Diameter AVP
///
/// `length` is the header size plus the unpadded data length;
/// `padded_length` rounds it up to the next 4-octet boundary. The
/// vendor-specific flag is always consistent with `vendor_id != 0`.
#[derive(Debug, Clone)]
pub struct Avp {
    pub code: u32,
    pub vendor_specific: bool,
    pub mandatory: bool,
    pub protected: bool,
    pub vendor_id: u32,
    pub data: Vec<u8>,
    pub length: usize,
    pub padded_length: usize,
    pub extended: Option<AvpExtendedAttributes>,
}

impl Avp {
    /// Create an AVP from raw data. Sets the vendor-specific flag when
    /// `vendor_id` is not 0 and computes the length fields.
    pub fn new(code: u32, vendor_id: u32, mandatory: bool, data: &[u8]) -> Self {
        let vendor_specific = vendor_id != 0;
        let header = if vendor_specific {
            AVP_HEADER_SIZE_VENDOR
        } else {
            AVP_HEADER_SIZE
        };
        let length = header + data.len();

        Self {
            code,
            vendor_specific,
            mandatory,
            protected: false,
            vendor_id,
            data: data.to_vec(),
            length,
            padded_length: pad_to_four(length),
            extended: None,
        }
    }

    /// Create an AVP from a typed value, validating the input shape against
    /// the declared data type per the coercion policy described on
    /// [`AvpInput`]. The resulting AVP carries extended attributes with the
    /// coerced typed value (and no name).
    pub fn new_typed(
        code: u32,
        vendor_id: u32,
        mandatory: bool,
        data_type: AvpDataType,
        value: impl Into<AvpInput>,
    ) -> DiameterResult<Self> {
        let (data, typed_value) = coerce_input(data_type, value.into())?;

        let mut avp = Self::new(code, vendor_id, mandatory, &data);
        avp.extended = Some(AvpExtendedAttributes {
            name: None,
            data_type,
            typed_value,
        });
        Ok(avp)
    }

    /// Set the Protected flag, returning the AVP so the call can be chained
    /// after construction.
    pub fn make_protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Convert the raw data into the typed domain of `data_type`
    pub fn to_typed(&self, data_type: AvpDataType) -> DiameterResult<AvpValue> {
        convert_avp_data(&self.data, data_type)
    }

    /// Get the encoded length of this AVP including padding
    pub fn encoded_len(&self) -> usize {
        self.padded_length
    }

    /// Encode this AVP into the buffer, padding to a 4-octet boundary
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.code);

        let mut flags = 0u8;
        if self.vendor_specific {
            flags |= avp_flags::VENDOR;
        }
        if self.mandatory {
            flags |= avp_flags::MANDATORY;
        }
        if self.protected {
            flags |= avp_flags::PROTECTED;
        }
        buf.put_u32(((flags as u32) << 24) | (self.length as u32 & 0x00ff_ffff));

        if self.vendor_specific {
            buf.put_u32(self.vendor_id);
        }

        buf.put_slice(&self.data);
        for _ in self.length..self.padded_length {
            buf.put_u8(0);
        }
    }

    /// Encode this AVP into a standalone byte vector
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.padded_length);
        self.encode(&mut buf);
        buf.to_vec()
    }

    /// Decode one AVP from the buffer, consuming the header, data and pad
    /// octets so the buffer is positioned at the next AVP.
    pub fn decode(buf: &mut Bytes) -> DiameterResult<Self> {
        if buf.remaining() < AVP_HEADER_SIZE {
            return Err(DiameterError::MalformedAvp(format!(
                "AVP header truncated: {} bytes remain",
                buf.remaining()
            )));
        }

        let code = buf.get_u32();
        let flags_and_length = buf.get_u32();
        let flags = (flags_and_length >> 24) as u8;
        let length = (flags_and_length & 0x00ff_ffff) as usize;

        let vendor_specific = flags & avp_flags::VENDOR != 0;
        let header = if vendor_specific {
            AVP_HEADER_SIZE_VENDOR
        } else {
            AVP_HEADER_SIZE
        };

        if length < header {
            return Err(DiameterError::MalformedAvp(format!(
                "AVP length {length} is less than its header size {header}"
            )));
        }

        let vendor_id = if vendor_specific {
            if buf.remaining() < 4 {
                return Err(DiameterError::MalformedAvp(
                    "AVP vendor ID truncated".to_string(),
                ));
            }
            buf.get_u32()
        } else {
            0
        };

        let data_len = length - header;
        if buf.remaining() < data_len {
            return Err(DiameterError::MalformedAvp(format!(
                "length field in AVP header greater than remaining stream: need {data_len}, have {}",
                buf.remaining()
            )));
        }
        let data = buf.copy_to_bytes(data_len).to_vec();

        let padded_length = pad_to_four(length);
        let padding = padded_length - length;
        if buf.remaining() >= padding {
            buf.advance(padding);
        }

        Ok(Self {
            code,
            vendor_specific,
            mandatory: flags & avp_flags::MANDATORY != 0,
            protected: flags & avp_flags::PROTECTED != 0,
            vendor_id,
            data,
            length,
            padded_length,
            extended: None,
        })
    }
}

// Byte-wise equality: two AVPs are equal when they would encode identically.
impl PartialEq for Avp {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.vendor_specific == other.vendor_specific
            && self.mandatory == other.mandatory
            && self.protected == other.protected
            && self.vendor_id == other.vendor_id
            && self.length == other.length
            && self.padded_length == other.padded_length
            && self.data == other.data
    }
}

impl Eq for Avp {}

fn pad_to_four(length: usize) -> usize {
    (length + 3) & !3
}

fn coerce_input(data_type: AvpDataType, input: AvpInput) -> DiameterResult<(Vec<u8>, AvpValue)> {
    match data_type {
        AvpDataType::Unsigned32 => match input {
            AvpInput::U32(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Unsigned32(v))),
            AvpInput::Int(n) => {
                let v = n as u32;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Unsigned32(v)))
            }
            other => Err(coercion_error("Unsigned32", &other)),
        },

        AvpDataType::Unsigned64 => match input {
            AvpInput::U64(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Unsigned64(v))),
            AvpInput::U32(v) => {
                let v = v as u64;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Unsigned64(v)))
            }
            AvpInput::Int(n) => {
                let v = n as u64;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Unsigned64(v)))
            }
            other => Err(coercion_error("Unsigned64", &other)),
        },

        AvpDataType::Integer32 => match input {
            AvpInput::I32(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Integer32(v))),
            AvpInput::Int(n) => {
                let v = n as i32;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Integer32(v)))
            }
            other => Err(coercion_error("Integer32", &other)),
        },

        AvpDataType::Integer64 => match input {
            AvpInput::I64(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Integer64(v))),
            AvpInput::I32(v) => {
                let v = v as i64;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Integer64(v)))
            }
            AvpInput::Int(n) => Ok((n.to_be_bytes().to_vec(), AvpValue::Integer64(n))),
            other => Err(coercion_error("Integer64", &other)),
        },

        AvpDataType::Float32 => match input {
            AvpInput::F32(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Float32(v))),
            AvpInput::Int(n) => {
                let v = n as f32;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Float32(v)))
            }
            other => Err(coercion_error("Float32", &other)),
        },

        AvpDataType::Float64 => match input {
            AvpInput::F64(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Float64(v))),
            AvpInput::F32(v) => {
                let v = v as f64;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Float64(v)))
            }
            AvpInput::Int(n) => {
                let v = n as f64;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Float64(v)))
            }
            other => Err(coercion_error("Float64", &other)),
        },

        AvpDataType::Enumerated => match input {
            AvpInput::I32(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Enumerated(v))),
            AvpInput::Int(n) => {
                let v = n as i32;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Enumerated(v)))
            }
            other => Err(coercion_error("Enumerated", &other)),
        },

        AvpDataType::Utf8String => match input {
            AvpInput::Text(s) => Ok((s.as_bytes().to_vec(), AvpValue::Utf8String(s))),
            AvpInput::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => Ok((s.as_bytes().to_vec(), AvpValue::Utf8String(s))),
                Err(_) => Err(DiameterError::TypeCoercion(
                    "supplied value is not valid UTF-8".to_string(),
                )),
            },
            other => Err(coercion_error("UTF8String", &other)),
        },

        AvpDataType::OctetString => match input {
            AvpInput::Bytes(b) => Ok((b.clone(), AvpValue::OctetString(b))),
            AvpInput::Text(s) => {
                let b = s.into_bytes();
                Ok((b.clone(), AvpValue::OctetString(b)))
            }
            other => Err(coercion_error("OctetString", &other)),
        },

        AvpDataType::Time => match input {
            AvpInput::Instant(t) => {
                let secs = diameter_time_from_system_time(t)?;
                Ok((secs.to_be_bytes().to_vec(), AvpValue::Time(secs)))
            }
            AvpInput::Bytes(b) => {
                let raw: [u8; 4] = b.as_slice().try_into().map_err(|_| {
                    DiameterError::TypeCoercion(
                        "byte input for Time must have a length of exactly 4".to_string(),
                    )
                })?;
                let secs = u32::from_be_bytes(raw);
                Ok((b, AvpValue::Time(secs)))
            }
            AvpInput::U32(v) => Ok((v.to_be_bytes().to_vec(), AvpValue::Time(v))),
            AvpInput::Int(n) => {
                if n < 0 {
                    return Err(DiameterError::TypeCoercion(
                        "value for Time cannot be negative".to_string(),
                    ));
                }
                if n > u32::MAX as i64 {
                    return Err(DiameterError::TypeCoercion(
                        "value for Time is later than Diameter time can represent".to_string(),
                    ));
                }
                let v = n as u32;
                Ok((v.to_be_bytes().to_vec(), AvpValue::Time(v)))
            }
            other => Err(coercion_error("Time", &other)),
        },

        AvpDataType::Address => match input {
            AvpInput::Address(a) => {
                Ok((a.as_bytes().to_vec(), AvpValue::Address(a)))
            }
            AvpInput::Ip(ip) => {
                let a = AddressType::from_ip(ip);
                Ok((a.as_bytes().to_vec(), AvpValue::Address(a)))
            }
            other => Err(coercion_error("Address", &other)),
        },

        AvpDataType::DiamIdent => match input {
            AvpInput::Text(s) => Ok((s.as_bytes().to_vec(), AvpValue::DiamIdent(s))),
            other => Err(coercion_error("DiamIdent", &other)),
        },

        AvpDataType::DiamUri => match input {
            AvpInput::Text(s) => Ok((s.as_bytes().to_vec(), AvpValue::DiamUri(s))),
            other => Err(coercion_error("DiamURI", &other)),
        },

        AvpDataType::Grouped => match input {
            AvpInput::Grouped(avps) => {
                let mut buf =
                    BytesMut::with_capacity(avps.iter().map(|a| a.padded_length).sum());
                for avp in &avps {
                    avp.encode(&mut buf);
                }
                Ok((buf.to_vec(), AvpValue::Grouped(avps)))
            }
            other => Err(coercion_error("Grouped", &other)),
        },

        AvpDataType::IpFilterRule => match input {
            AvpInput::Bytes(b) => Ok((b.clone(), AvpValue::IpFilterRule(b))),
            AvpInput::Text(s) => {
                let b = s.into_bytes();
                Ok((b.clone(), AvpValue::IpFilterRule(b)))
            }
            other => Err(coercion_error("IPFilterRule", &other)),
        },

        AvpDataType::Unknown => Err(DiameterError::TypeCoercion(
            "Unknown is not a constructible AVP type".to_string(),
        )),
    }
}

fn coercion_error(type_name: &str, input: &AvpInput) -> DiameterError {
    DiameterError::TypeCoercion(format!(
        "supplied {input:?} cannot be converted to {type_name}"
    ))
}

/// Convert raw AVP data into a typed value according to `data_type`
pub fn convert_avp_data(data: &[u8], data_type: AvpDataType) -> DiameterResult<AvpValue> {
    match data_type {
        AvpDataType::Unsigned32 => {
            Ok(AvpValue::Unsigned32(u32::from_be_bytes(fixed(data, "Unsigned32")?)))
        }
        AvpDataType::Unsigned64 => {
            Ok(AvpValue::Unsigned64(u64::from_be_bytes(fixed(data, "Unsigned64")?)))
        }
        AvpDataType::Integer32 => {
            Ok(AvpValue::Integer32(i32::from_be_bytes(fixed(data, "Integer32")?)))
        }
        AvpDataType::Integer64 => {
            Ok(AvpValue::Integer64(i64::from_be_bytes(fixed(data, "Integer64")?)))
        }
        AvpDataType::Float32 => {
            Ok(AvpValue::Float32(f32::from_be_bytes(fixed(data, "Float32")?)))
        }
        AvpDataType::Float64 => {
            Ok(AvpValue::Float64(f64::from_be_bytes(fixed(data, "Float64")?)))
        }
        AvpDataType::Enumerated => {
            Ok(AvpValue::Enumerated(i32::from_be_bytes(fixed(data, "Enumerated")?)))
        }
        AvpDataType::Utf8String => match std::str::from_utf8(data) {
            Ok(s) => Ok(AvpValue::Utf8String(s.to_string())),
            Err(_) => Err(DiameterError::TypeMismatch(
                "data is not valid UTF-8".to_string(),
            )),
        },
        AvpDataType::OctetString => Ok(AvpValue::OctetString(data.to_vec())),
        AvpDataType::Time => Ok(AvpValue::Time(u32::from_be_bytes(fixed(data, "Time")?))),
        AvpDataType::Address => Ok(AvpValue::Address(AddressType::from_avp_data(data)?)),
        AvpDataType::DiamIdent => match std::str::from_utf8(data) {
            Ok(s) => Ok(AvpValue::DiamIdent(s.to_string())),
            Err(_) => Err(DiameterError::TypeMismatch(
                "DiamIdent data is not valid text".to_string(),
            )),
        },
        AvpDataType::DiamUri => match std::str::from_utf8(data) {
            Ok(s) => Ok(AvpValue::DiamUri(s.to_string())),
            Err(_) => Err(DiameterError::TypeMismatch(
                "DiamURI data is not valid text".to_string(),
            )),
        },
        AvpDataType::Grouped => {
            let mut buf = Bytes::copy_from_slice(data);
            let mut avps = Vec::new();
            while buf.has_remaining() {
                avps.push(Avp::decode(&mut buf)?);
            }
            Ok(AvpValue::Grouped(avps))
        }
        AvpDataType::IpFilterRule => Ok(AvpValue::IpFilterRule(data.to_vec())),
        AvpDataType::Unknown => Err(DiameterError::TypeMismatch(
            "cannot convert data for an unknown AVP type".to_string(),
        )),
    }
}

fn fixed<const N: usize>(data: &[u8], type_name: &str) -> DiameterResult<[u8; N]> {
    data.try_into().map_err(|_| {
        DiameterError::TypeMismatch(format!(
            "type {type_name} requires exactly {N} bytes, have {}",
            data.len()
        ))
    })
}

/// Convert a system clock instant to Diameter time (seconds since
/// 1900-01-01 UTC). Instants before the Diameter epoch or beyond what 32
/// bits can represent are rejected.
pub fn diameter_time_from_system_time(t: SystemTime) -> DiameterResult<u32> {
    let since_1900: i128 = match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i128 + SECONDS_BETWEEN_1900_AND_UNIX_EPOCH as i128,
        Err(e) => SECONDS_BETWEEN_1900_AND_UNIX_EPOCH as i128 - e.duration().as_secs() as i128,
    };

    if since_1900 < 0 {
        return Err(DiameterError::TypeCoercion(
            "provided instant is earlier than the Diameter epoch (1900-01-01 UTC)".to_string(),
        ));
    }
    if since_1900 > u32::MAX as i128 {
        return Err(DiameterError::TypeCoercion(
            "provided instant is later than Diameter time can represent".to_string(),
        ));
    }

    Ok(since_1900 as u32)
}

/// Convert Diameter time (seconds since 1900-01-01 UTC) back to a system
/// clock instant
pub fn system_time_from_diameter_time(seconds: u32) -> SystemTime {
    let relative_to_unix = seconds as i64 - SECONDS_BETWEEN_1900_AND_UNIX_EPOCH as i64;
    if relative_to_unix >= 0 {
        UNIX_EPOCH + Duration::from_secs(relative_to_unix as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(relative_to_unix.unsigned_abs())
    }
}

/// A vendor-id/code pair identifying a kind of AVP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvpId {
    pub vendor_id: u32,
    pub code: u32,
}

/// Index a set of AVPs by vendor-id and code, mapping each pair to the
/// positions of the matching AVPs in the slice, in order.
pub fn avps_by_vendor_and_code(avps: &[Avp]) -> HashMap<AvpId, Vec<usize>> {
    let mut map: HashMap<AvpId, Vec<usize>> = HashMap::new();
    for (i, avp) in avps.iter().enumerate() {
        map.entry(AvpId {
            vendor_id: avp.vendor_id,
            code: avp.code,
        })
        .or_default()
        .push(i);
    }
    map
}

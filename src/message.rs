//! Diameter message header and message types
//!
//! Message format (RFC 6733):
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Version    |                 Message Length                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | Command Flags |                  Command-Code                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Application-ID                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Hop-by-Hop Identifier                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      End-to-End Identifier                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  AVPs ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-
//! ```
//!
//! Length and Command-Code occupy 24 bits. The Length field covers the
//! 20-octet header plus the padded length of every contained AVP.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::avp::{avps_by_vendor_and_code, Avp, AvpId};
use crate::error::{DiameterError, DiameterResult};
use crate::DIAMETER_VERSION;

/// Diameter message header size
pub const MSG_HEADER_SIZE: usize = 20;

/// Command flags
pub mod msg_flags {
    /// Request bit
    pub const REQUEST: u8 = 0x80;
    /// Proxiable bit
    pub const PROXIABLE: u8 = 0x40;
    /// Error bit
    pub const ERROR: u8 = 0x20;
    /// Potentially re-transmitted bit
    pub const RETRANSMIT: u8 = 0x10;
}

/// Extended Message attributes attached by a dictionary: a human-friendly
/// name and an abbreviated name (e.g. "Capabilities-Exchange-Request"/"CER").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageExtendedAttributes {
    pub name: String,
    pub abbreviated_name: String,
}

/// A single Diameter message: the header fields plus an ordered AVP
/// sequence. AVP order is significant and preserved across decode/encode.
#[derive(Debug)]
pub struct Message {
    pub version: u8,
    /// Total message length including the header (24-bit domain)
    pub length: u32,
    pub flags: u8,
    /// Command code (24-bit domain)
    pub code: u32,
    pub app_id: u32,
    pub hop_by_hop_id: u32,
    pub end_to_end_id: u32,
    pub avps: Vec<Avp>,
    pub extended: Option<MessageExtendedAttributes>,

    // Lazily built index of top-level AVP positions by (vendor, code).
    index: OnceLock<HashMap<AvpId, Vec<usize>>>,
}

impl Message {
    /// Create a message. Every AVP in `mandatory_avps` gets its Mandatory
    /// flag forced on; the flags of `additional_avps` are left untouched.
    /// Mandatory AVPs come first and order is preserved within each set.
    pub fn new(
        flags: u8,
        code: u32,
        app_id: u32,
        hop_by_hop_id: u32,
        end_to_end_id: u32,
        mandatory_avps: Vec<Avp>,
        additional_avps: Vec<Avp>,
    ) -> Self {
        let mut avps = Vec::with_capacity(mandatory_avps.len() + additional_avps.len());
        let mut length = MSG_HEADER_SIZE as u32;

        for mut avp in mandatory_avps {
            avp.mandatory = true;
            length += avp.padded_length as u32;
            avps.push(avp);
        }
        for avp in additional_avps {
            length += avp.padded_length as u32;
            avps.push(avp);
        }

        Self {
            version: DIAMETER_VERSION,
            length,
            flags: flags & 0xf0,
            code: code & 0x00ff_ffff,
            app_id,
            hop_by_hop_id,
            end_to_end_id,
            avps,
            extended: None,
            index: OnceLock::new(),
        }
    }

    /// True if the request flag is set
    pub fn is_request(&self) -> bool {
        self.flags & msg_flags::REQUEST != 0
    }

    /// True if the request flag is not set
    pub fn is_answer(&self) -> bool {
        !self.is_request()
    }

    /// True if the proxiable flag is set
    pub fn is_proxiable(&self) -> bool {
        self.flags & msg_flags::PROXIABLE != 0
    }

    /// True if the error flag is set
    pub fn is_error(&self) -> bool {
        self.flags & msg_flags::ERROR != 0
    }

    /// True if the potentially re-transmitted flag is set
    pub fn is_potentially_retransmitted(&self) -> bool {
        self.flags & msg_flags::RETRANSMIT != 0
    }

    /// Append an AVP, updating the message length
    pub fn add_avp(&mut self, avp: Avp) {
        self.length += avp.padded_length as u32;
        self.avps.push(avp);
        self.index = OnceLock::new();
    }

    fn index(&self) -> &HashMap<AvpId, Vec<usize>> {
        self.index.get_or_init(|| avps_by_vendor_and_code(&self.avps))
    }

    /// The first top-level AVP with the given vendor-id and code, if any
    pub fn first_avp_matching(&self, vendor_id: u32, code: u32) -> Option<&Avp> {
        self.index()
            .get(&AvpId { vendor_id, code })
            .and_then(|positions| positions.first())
            .map(|&i| &self.avps[i])
    }

    /// All top-level AVPs with the given vendor-id and code, in message
    /// order. AVPs nested inside Grouped AVPs are not considered.
    pub fn top_level_avps_matching(&self, vendor_id: u32, code: u32) -> Vec<&Avp> {
        self.index()
            .get(&AvpId { vendor_id, code })
            .map(|positions| positions.iter().map(|&i| &self.avps[i]).collect())
            .unwrap_or_default()
    }

    /// True if at least one top-level AVP matches
    pub fn has_top_level_avp_matching(&self, vendor_id: u32, code: u32) -> bool {
        self.number_of_top_level_avps_matching(vendor_id, code) > 0
    }

    /// The count of matching top-level AVPs
    pub fn number_of_top_level_avps_matching(&self, vendor_id: u32, code: u32) -> usize {
        self.index()
            .get(&AvpId { vendor_id, code })
            .map(|positions| positions.len())
            .unwrap_or(0)
    }

    /// A map from (vendor, code) to the matching top-level AVPs. A fresh map
    /// is built on every call; mutating it cannot affect the message's
    /// internal index.
    pub fn map_of_avps_by_code(&self) -> HashMap<AvpId, Vec<&Avp>> {
        avps_by_vendor_and_code(&self.avps)
            .into_iter()
            .map(|(id, positions)| {
                (id, positions.into_iter().map(|i| &self.avps[i]).collect())
            })
            .collect()
    }

    /// Encode this message into an octet stream in network byte order
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.length as usize);

        buf.put_u32(((self.version as u32) << 24) | (self.length & 0x00ff_ffff));
        buf.put_u32(((self.flags as u32) << 24) | (self.code & 0x00ff_ffff));
        buf.put_u32(self.app_id);
        buf.put_u32(self.hop_by_hop_id);
        buf.put_u32(self.end_to_end_id);

        for avp in &self.avps {
            avp.encode(&mut buf);
        }

        buf.freeze()
    }

    /// Decode a message from the buffer. The buffer must contain at least
    /// the full declared message length; AVPs are decoded in order, each
    /// advancing by its padded length.
    pub fn decode(buf: &mut Bytes) -> DiameterResult<Self> {
        if buf.remaining() < MSG_HEADER_SIZE {
            return Err(DiameterError::ShortMessage {
                needed: MSG_HEADER_SIZE,
                available: buf.remaining(),
            });
        }

        let version_and_length = buf.get_u32();
        let version = (version_and_length >> 24) as u8;
        let length = version_and_length & 0x00ff_ffff;

        if (length as usize) < MSG_HEADER_SIZE {
            return Err(DiameterError::ShortMessage {
                needed: MSG_HEADER_SIZE,
                available: length as usize,
            });
        }

        let flags_and_code = buf.get_u32();
        let flags = (flags_and_code >> 24) as u8;
        let code = flags_and_code & 0x00ff_ffff;

        let app_id = buf.get_u32();
        let hop_by_hop_id = buf.get_u32();
        let end_to_end_id = buf.get_u32();

        let body_len = length as usize - MSG_HEADER_SIZE;
        if buf.remaining() < body_len {
            return Err(DiameterError::ShortMessage {
                needed: body_len,
                available: buf.remaining(),
            });
        }

        let mut body = buf.copy_to_bytes(body_len);
        let mut avps = Vec::new();
        while body.has_remaining() {
            avps.push(Avp::decode(&mut body)?);
        }

        Ok(Self {
            version,
            length,
            flags,
            code,
            app_id,
            hop_by_hop_id,
            end_to_end_id,
            avps,
            extended: None,
            index: OnceLock::new(),
        })
    }

    /// Turn this message into the answer for `request`: copy its
    /// end-to-end-id, hop-by-hop-id, application id and code, and clear the
    /// request flag. Returns the message so the call can be chained.
    pub fn become_answer_of(&mut self, request: &Message) -> &mut Self {
        self.end_to_end_id = request.end_to_end_id;
        self.hop_by_hop_id = request.hop_by_hop_id;
        self.app_id = request.app_id;
        self.code = request.code;
        self.flags &= !msg_flags::REQUEST;
        self
    }

    /// Build the answer matching this request: same flags (with the request
    /// bit cleared), code, application id and identifiers, carrying the
    /// provided AVPs.
    pub fn generate_matching_response(
        &self,
        mandatory_avps: Vec<Avp>,
        additional_avps: Vec<Avp>,
    ) -> Message {
        Message::new(
            self.flags & !msg_flags::REQUEST,
            self.code,
            self.app_id,
            self.hop_by_hop_id,
            self.end_to_end_id,
            mandatory_avps,
            additional_avps,
        )
    }
}

impl Clone for Message {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            length: self.length,
            flags: self.flags,
            code: self.code,
            app_id: self.app_id,
            hop_by_hop_id: self.hop_by_hop_id,
            end_to_end_id: self.end_to_end_id,
            avps: self.avps.clone(),
            extended: self.extended.clone(),
            index: OnceLock::new(),
        }
    }
}

// Equality over the header fields and the AVP sequence in order; the length
// field follows from the AVPs and the cached index is ignored.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.flags == other.flags
            && self.code == other.code
            && self.app_id == other.app_id
            && self.hop_by_hop_id == other.hop_by_hop_id
            && self.end_to_end_id == other.end_to_end_id
            && self.avps == other.avps
    }
}

impl Eq for Message {}

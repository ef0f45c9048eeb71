//! Diameter entity identity and Capabilities-Exchange extraction
//!
//! A [`DiameterEntity`] describes one Diameter node: the identity carried
//! in the mandatory AVPs of a Capabilities-Exchange request or answer. The
//! identity AVPs are built once at construction and handed out as clones;
//! entity values are immutable for the lifetime of a connection.

use std::net::IpAddr;

use crate::avp::{Avp, AvpDataType, AvpValue};
use crate::common::avp_code;
use crate::error::{DiameterError, DiameterResult};
use crate::message::Message;

#[derive(Debug, Clone, PartialEq)]
struct EntityAvpCache {
    origin_host: Avp,
    origin_realm: Avp,
    host_ip_addresses: Vec<Avp>,
    vendor_id: Avp,
    product_name: Avp,
}

/// Identifying information about a Diameter node
#[derive(Debug, Clone, PartialEq)]
pub struct DiameterEntity {
    pub origin_host: String,
    pub origin_realm: String,
    pub host_ip_addresses: Vec<IpAddr>,
    pub vendor_id: u32,
    pub product_name: String,

    cache: EntityAvpCache,
}

impl DiameterEntity {
    /// Create an entity description. At least one host IP address is
    /// required.
    pub fn new(
        origin_host: impl Into<String>,
        origin_realm: impl Into<String>,
        host_ip_addresses: Vec<IpAddr>,
        vendor_id: u32,
        product_name: impl Into<String>,
    ) -> DiameterResult<Self> {
        if host_ip_addresses.is_empty() {
            return Err(DiameterError::InvalidConfiguration(
                "a Diameter entity must have at least one host IP address".to_string(),
            ));
        }

        let origin_host = origin_host.into();
        let origin_realm = origin_realm.into();
        let product_name = product_name.into();

        let cache = EntityAvpCache {
            origin_host: Avp::new_typed(
                avp_code::ORIGIN_HOST,
                0,
                true,
                AvpDataType::DiamIdent,
                origin_host.clone(),
            )?,
            origin_realm: Avp::new_typed(
                avp_code::ORIGIN_REALM,
                0,
                true,
                AvpDataType::DiamIdent,
                origin_realm.clone(),
            )?,
            host_ip_addresses: host_ip_addresses
                .iter()
                .map(|&ip| {
                    Avp::new_typed(avp_code::HOST_IP_ADDRESS, 0, true, AvpDataType::Address, ip)
                })
                .collect::<DiameterResult<Vec<Avp>>>()?,
            vendor_id: Avp::new_typed(
                avp_code::VENDOR_ID,
                0,
                true,
                AvpDataType::Unsigned32,
                vendor_id,
            )?,
            product_name: Avp::new_typed(
                avp_code::PRODUCT_NAME,
                0,
                true,
                AvpDataType::Utf8String,
                product_name.clone(),
            )?,
        };

        Ok(Self {
            origin_host,
            origin_realm,
            host_ip_addresses,
            vendor_id,
            product_name,
            cache,
        })
    }

    /// The Origin-Host identity as an AVP
    pub fn origin_host_avp(&self) -> Avp {
        self.cache.origin_host.clone()
    }

    /// The Origin-Realm identity as an AVP
    pub fn origin_realm_avp(&self) -> Avp {
        self.cache.origin_realm.clone()
    }

    /// The Vendor-Id as an AVP
    pub fn vendor_id_avp(&self) -> Avp {
        self.cache.vendor_id.clone()
    }

    /// The Product-Name as an AVP
    pub fn product_name_avp(&self) -> Avp {
        self.cache.product_name.clone()
    }

    /// One Host-IP-Address AVP per configured address
    pub fn host_ip_address_avps(&self) -> Vec<Avp> {
        self.cache.host_ip_addresses.clone()
    }

    /// The mandatory AVPs for a Capabilities-Exchange request based on this
    /// entity: Origin-Host, Origin-Realm, the Host-IP-Addresses, Vendor-Id
    /// and Product-Name.
    pub fn capabilities_exchange_avps(&self) -> Vec<Avp> {
        let mut avps = Vec::with_capacity(4 + self.cache.host_ip_addresses.len());
        avps.push(self.origin_host_avp());
        avps.push(self.origin_realm_avp());
        avps.extend(self.host_ip_address_avps());
        avps.push(self.vendor_id_avp());
        avps.push(self.product_name_avp());
        avps
    }

    /// The mandatory AVPs for a Capabilities-Exchange answer: the provided
    /// Result-Code AVP followed by this entity's identity AVPs.
    pub fn capabilities_exchange_avps_with_result_code(&self, result_code: &Avp) -> Vec<Avp> {
        let mut avps = Vec::with_capacity(5 + self.cache.host_ip_addresses.len());
        avps.push(result_code.clone());
        avps.extend(self.capabilities_exchange_avps());
        avps
    }

    /// Extract a peer's identity from a Capabilities-Exchange request or
    /// answer. Origin-Host (264), Origin-Realm (296), Vendor-Id (266) and
    /// Product-Name (269) must each appear exactly once; Host-IP-Address
    /// (257) at least once.
    pub fn from_capabilities_exchange(message: &Message) -> DiameterResult<Self> {
        for code in [
            avp_code::ORIGIN_HOST,
            avp_code::ORIGIN_REALM,
            avp_code::VENDOR_ID,
            avp_code::PRODUCT_NAME,
        ] {
            if message.number_of_top_level_avps_matching(0, code) != 1 {
                return Err(DiameterError::MissingMandatoryAvp(code));
            }
        }
        if message.number_of_top_level_avps_matching(0, avp_code::HOST_IP_ADDRESS) == 0 {
            return Err(DiameterError::MissingMandatoryAvp(avp_code::HOST_IP_ADDRESS));
        }

        let origin_host = required_text(message, avp_code::ORIGIN_HOST, AvpDataType::DiamIdent)?;
        let origin_realm = required_text(message, avp_code::ORIGIN_REALM, AvpDataType::DiamIdent)?;
        let product_name =
            required_text(message, avp_code::PRODUCT_NAME, AvpDataType::Utf8String)?;

        let vendor_id = match message
            .first_avp_matching(0, avp_code::VENDOR_ID)
            .map(|avp| avp.to_typed(AvpDataType::Unsigned32))
        {
            Some(Ok(AvpValue::Unsigned32(v))) => v,
            Some(Err(e)) => return Err(e),
            _ => return Err(DiameterError::MissingMandatoryAvp(avp_code::VENDOR_ID)),
        };

        let mut host_ip_addresses = Vec::new();
        for avp in message.top_level_avps_matching(0, avp_code::HOST_IP_ADDRESS) {
            match avp.to_typed(AvpDataType::Address)? {
                AvpValue::Address(address) => match address.to_ip() {
                    Some(ip) => host_ip_addresses.push(ip),
                    None => {
                        return Err(DiameterError::TypeMismatch(
                            "Host-IP-Address AVP does not carry an IP address".to_string(),
                        ));
                    }
                },
                _ => {
                    return Err(DiameterError::TypeMismatch(
                        "Host-IP-Address AVP cannot be decoded as an Address".to_string(),
                    ));
                }
            }
        }

        Self::new(
            origin_host,
            origin_realm,
            host_ip_addresses,
            vendor_id,
            product_name,
        )
    }
}

fn required_text(message: &Message, code: u32, data_type: AvpDataType) -> DiameterResult<String> {
    let avp = message
        .first_avp_matching(0, code)
        .ok_or(DiameterError::MissingMandatoryAvp(code))?;

    match avp.to_typed(data_type)? {
        AvpValue::DiamIdent(s) | AvpValue::Utf8String(s) => Ok(s),
        _ => Err(DiameterError::TypeMismatch(format!(
            "AVP {code} does not carry text data"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{msg_flags, Message};

    fn test_entity() -> DiameterEntity {
        DiameterEntity::new(
            "client.example.com",
            "example.com",
            vec!["10.20.30.1".parse().unwrap()],
            0,
            "rust-diameter",
        )
        .unwrap()
    }

    #[test]
    fn test_entity_requires_an_ip_address() {
        assert!(matches!(
            DiameterEntity::new("h.example.com", "example.com", vec![], 0, "p"),
            Err(DiameterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_capabilities_exchange_avps() {
        let entity = test_entity();
        let avps = entity.capabilities_exchange_avps();

        let codes: Vec<u32> = avps.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![264, 296, 257, 266, 269]);
        assert!(avps.iter().all(|a| a.mandatory));
        assert_eq!(avps[0].data, b"client.example.com");
    }

    #[test]
    fn test_capabilities_exchange_avps_with_result_code() {
        let entity = test_entity();
        let result_code = Avp::new(268, 0, true, &2001u32.to_be_bytes());
        let avps = entity.capabilities_exchange_avps_with_result_code(&result_code);

        let codes: Vec<u32> = avps.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![268, 264, 296, 257, 266, 269]);
    }

    #[test]
    fn test_round_trip_through_capabilities_exchange_message() {
        let entity = DiameterEntity::new(
            "server.example.com",
            "example.com",
            vec!["10.0.0.1".parse().unwrap(), "fd00::1".parse().unwrap()],
            10415,
            "rust-diameter",
        )
        .unwrap();

        let cer = Message::new(
            msg_flags::REQUEST,
            257,
            0,
            1,
            2,
            entity.capabilities_exchange_avps(),
            vec![],
        );

        let extracted = DiameterEntity::from_capabilities_exchange(&cer).unwrap();
        assert_eq!(extracted.origin_host, "server.example.com");
        assert_eq!(extracted.origin_realm, "example.com");
        assert_eq!(extracted.vendor_id, 10415);
        assert_eq!(extracted.product_name, "rust-diameter");
        assert_eq!(extracted.host_ip_addresses.len(), 2);
        assert_eq!(extracted.host_ip_addresses[0], "10.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(extracted.host_ip_addresses[1], "fd00::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_extraction_rejects_missing_mandatory_avps() {
        let entity = test_entity();

        // Drop Origin-Realm.
        let avps: Vec<Avp> = entity
            .capabilities_exchange_avps()
            .into_iter()
            .filter(|a| a.code != 296)
            .collect();
        let cer = Message::new(msg_flags::REQUEST, 257, 0, 1, 2, avps, vec![]);

        assert!(matches!(
            DiameterEntity::from_capabilities_exchange(&cer),
            Err(DiameterError::MissingMandatoryAvp(296))
        ));

        // Drop every Host-IP-Address.
        let avps: Vec<Avp> = entity
            .capabilities_exchange_avps()
            .into_iter()
            .filter(|a| a.code != 257)
            .collect();
        let cer = Message::new(msg_flags::REQUEST, 257, 0, 1, 2, avps, vec![]);

        assert!(matches!(
            DiameterEntity::from_capabilities_exchange(&cer),
            Err(DiameterError::MissingMandatoryAvp(257))
        ));
    }

    #[test]
    fn test_extraction_rejects_duplicated_singleton_avp() {
        let entity = test_entity();
        let mut avps = entity.capabilities_exchange_avps();
        avps.push(entity.origin_host_avp());

        let cer = Message::new(msg_flags::REQUEST, 257, 0, 1, 2, avps, vec![]);
        assert!(matches!(
            DiameterEntity::from_capabilities_exchange(&cer),
            Err(DiameterError::MissingMandatoryAvp(264))
        ));
    }
}

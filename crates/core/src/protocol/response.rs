use serde::{Deserialize, Serialize};

use crate::net::AddressType;

/// Answer to a [`PrepareRequest`](super::PrepareRequest).
///
/// Each leg present in the request comes back with the same port and SRTP
/// key/salt plus the SSRC the camera will send with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaLegResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaLegResponse>,
    pub address: AddressInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLegResponse {
    pub port: u16,
    pub ssrc: u32,
    pub srtp_key: Vec<u8>,
    pub srtp_salt: Vec<u8>,
}

/// Camera-side address the viewer should expect media from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: AddressType,
}

impl AddressInfo {
    pub fn new(address: String) -> Self {
        let kind = AddressType::of(&address);
        Self { address, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_omits_missing_legs() {
        let resp = PrepareResponse {
            video: Some(MediaLegResponse {
                port: 5000,
                ssrc: 1,
                srtp_key: vec![0xAA],
                srtp_salt: vec![0xBB],
            }),
            audio: None,
            address: AddressInfo::new("192.168.1.5".to_string()),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("audio").is_none());
        assert_eq!(json["video"]["ssrc"], 1);
        assert_eq!(json["address"]["address"], "192.168.1.5");
        assert_eq!(json["address"]["type"], "v4");
    }

    #[test]
    fn address_info_classifies() {
        assert_eq!(AddressInfo::new("fe80::1".to_string()).kind, AddressType::V6);
    }
}

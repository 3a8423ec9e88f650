use core::fmt;

/// A single-octet MS/TP station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MstpAddress {
    Station(u8),
    Broadcast,
}

impl MstpAddress {
    /// The reserved broadcast octet on the wire.
    pub const BROADCAST_OCTET: u8 = 0xFF;

    pub fn from_octet(octet: u8) -> Self {
        if octet == Self::BROADCAST_OCTET {
            Self::Broadcast
        } else {
            Self::Station(octet)
        }
    }

    pub fn as_octet(self) -> u8 {
        match self {
            Self::Station(mac) => mac,
            Self::Broadcast => Self::BROADCAST_OCTET,
        }
    }
}

impl fmt::Display for MstpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Station(mac) => write!(f, "{mac}"),
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MstpAddress;
    use proptest::prelude::*;

    #[test]
    fn broadcast_octet_maps_to_broadcast() {
        assert_eq!(MstpAddress::from_octet(0xFF), MstpAddress::Broadcast);
        assert_eq!(MstpAddress::Broadcast.as_octet(), 0xFF);
    }

    proptest! {
        #[test]
        fn octet_roundtrip(octet in any::<u8>()) {
            let addr = MstpAddress::from_octet(octet);
            prop_assert_eq!(addr.as_octet(), octet);
            prop_assert_eq!(addr == MstpAddress::Broadcast, octet == 0xFF);
        }
    }
}

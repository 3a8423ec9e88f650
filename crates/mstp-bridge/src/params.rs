use thiserror::Error;

/// Errors raised while decoding a packed parameter block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("parameter block too short: {0} bytes, expected {expected}", expected = PortParams::PACKED_LEN)]
    Truncated(usize),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i32 },
}

/// MS/TP interface parameters supplied at registration.
///
/// The surrounding process hands these over as a packed block of four
/// little-endian 32-bit integers: mac address, max master, baud rate,
/// max info frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortParams {
    pub mac_address: u8,
    pub max_master: u8,
    pub baud_rate: u32,
    pub max_info_frames: u8,
}

impl PortParams {
    pub const PACKED_LEN: usize = 16;

    pub fn from_packed(buf: &[u8]) -> Result<Self, ParamsError> {
        if buf.len() < Self::PACKED_LEN {
            return Err(ParamsError::Truncated(buf.len()));
        }
        let mut fields = [0i32; 4];
        for (i, field) in fields.iter_mut().enumerate() {
            let word: [u8; 4] = buf[i * 4..i * 4 + 4].try_into().unwrap();
            *field = i32::from_le_bytes(word);
        }
        let [mac_address, max_master, baud_rate, max_info_frames] = fields;

        if !(0..=254).contains(&mac_address) {
            return Err(ParamsError::OutOfRange {
                field: "mac address",
                value: mac_address,
            });
        }
        if !(1..=127).contains(&max_master) {
            return Err(ParamsError::OutOfRange {
                field: "max master",
                value: max_master,
            });
        }
        if baud_rate <= 0 {
            return Err(ParamsError::OutOfRange {
                field: "baud rate",
                value: baud_rate,
            });
        }
        if !(1..=255).contains(&max_info_frames) {
            return Err(ParamsError::OutOfRange {
                field: "max info frames",
                value: max_info_frames,
            });
        }

        Ok(Self {
            mac_address: mac_address as u8,
            max_master: max_master as u8,
            baud_rate: baud_rate as u32,
            max_info_frames: max_info_frames as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamsError, PortParams};

    fn pack(mac: i32, max_master: i32, baud: i32, max_info: i32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        for v in [mac, max_master, baud, max_info] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    #[test]
    fn parses_packed_block() {
        let params = PortParams::from_packed(&pack(5, 127, 38400, 1)).unwrap();
        assert_eq!(
            params,
            PortParams {
                mac_address: 5,
                max_master: 127,
                baud_rate: 38400,
                max_info_frames: 1,
            }
        );
    }

    #[test]
    fn rejects_truncated_block() {
        assert_eq!(
            PortParams::from_packed(&[0u8; 12]),
            Err(ParamsError::Truncated(12))
        );
    }

    #[test]
    fn rejects_out_of_range_mac() {
        let err = PortParams::from_packed(&pack(255, 127, 38400, 1)).unwrap_err();
        assert!(matches!(
            err,
            ParamsError::OutOfRange {
                field: "mac address",
                value: 255
            }
        ));
    }

    #[test]
    fn rejects_zero_baud_rate() {
        let err = PortParams::from_packed(&pack(5, 127, 0, 1)).unwrap_err();
        assert!(matches!(
            err,
            ParamsError::OutOfRange {
                field: "baud rate",
                ..
            }
        ));
    }
}

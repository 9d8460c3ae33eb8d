use serde::{Deserialize, Deserializer, Serializer, de::Error};

pub mod u256 {
    use super::*;
    use ethereum_types::U256;

    /// Fee amounts are carried as decimal strings so they survive JSON consumers
    /// without 256-bit integers.
    pub mod dec_str {
        use super::*;
        pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&value.to_string())
        }
    }

    /// Accepts either `0x` prefixed hex or plain decimal, serializes as decimal.
    pub mod hex_or_dec_str {
        use super::*;
        pub fn deserialize<'de, D>(d: D) -> Result<U256, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = String::deserialize(d)?;
            if let Some(stripped) = value.strip_prefix("0x") {
                U256::from_str_radix(stripped, 16).map_err(|e| D::Error::custom(e.to_string()))
            } else {
                U256::from_dec_str(&value).map_err(|e| D::Error::custom(e.to_string()))
            }
        }

        pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            dec_str::serialize(value, serializer)
        }
    }
}

/// Serializes to and deserializes from 0x prefixed hex string
pub mod bytes {
    use ::bytes::Bytes;

    use super::*;

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let bytes = hex::decode(value.trim_start_matches("0x"))
            .map_err(|e| D::Error::custom(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{value:x}"))
    }
}

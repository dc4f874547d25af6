//! Locating and reading transaction outputs inside a serialized transaction
//!
//! An output is serialized as `value (8 bytes LE) ‖ script length (varint) ‖ script`. Only
//! scripts whose length fits a one-byte varint are handled.

use byteorder::{ByteOrder, LittleEndian};
use chain_gang::{
    messages::{Tx, TxOut},
    script::{Script, op_codes::OP_RETURN},
    util::Serializable,
};
use tracing::debug;

use crate::error::ClaimError;
use crate::traits::ClaimConfig;

pub mod constraints;

/// Size of the satoshi value of an output
pub const VALUE_BYTES: usize = 8;
/// Size of a commitment carried by a data carrier output
pub const COMMITMENT_BYTES: usize = 32;
/// `OP_RETURN OP_PUSHBYTES_32`, the script bytes preceding an embedded commitment
pub const DATA_CARRIER_PREFIX: [u8; 2] = [OP_RETURN, 0x20];

/// Largest script length encoded by a one-byte varint
const MAX_SINGLE_BYTE_VARINT: usize = 0xfc;

/// Serialize an output
fn serialize_output(output: &TxOut) -> Result<Vec<u8>, ClaimError> {
    let mut bytes = Vec::new();
    output.write(&mut bytes)?;
    Ok(bytes)
}

/// Data carrier script embedding `commitment`
pub fn data_carrier_script(commitment: &[u8; 32]) -> Script {
    let mut script = DATA_CARRIER_PREFIX.to_vec();
    script.extend_from_slice(commitment);
    Script(script)
}

/// A serialized transaction together with the byte offset of each of its outputs
#[derive(Clone, Debug)]
pub struct TxLayout {
    pub bytes: Vec<u8>,
    pub output_offsets: Vec<usize>,
}

impl TxLayout {
    pub fn new(tx: &Tx) -> Result<Self, ClaimError> {
        let mut bytes = Vec::new();
        tx.write(&mut bytes)?;

        // Outputs are followed only by the 4-byte lock time
        let mut end = bytes.len() - 4;
        let mut output_offsets = vec![0; tx.outputs.len()];
        for (i, output) in tx.outputs.iter().enumerate().rev() {
            end -= serialize_output(output)?.len();
            output_offsets[i] = end;
        }
        debug!(len = bytes.len(), ?output_offsets, "serialized transaction");

        Ok(Self {
            bytes,
            output_offsets,
        })
    }

    /// Offset of the first output paying `amount` to `script`
    pub fn find_payment(&self, amount: u64, script: &[u8]) -> Result<usize, ClaimError> {
        self.output_offsets
            .iter()
            .copied()
            .find(|offset| {
                let Some(value) = self.bytes.get(*offset..*offset + VALUE_BYTES) else {
                    return false;
                };
                let script_start = *offset + VALUE_BYTES + 1;
                LittleEndian::read_u64(value) == amount
                    && self.bytes.get(*offset + VALUE_BYTES) == Some(&(script.len() as u8))
                    && self.bytes.get(script_start..script_start + script.len()) == Some(script)
            })
            .ok_or(ClaimError::OutputNotFound { amount })
    }

    /// Offset of `commitment` inside the first data carrier output embedding it
    ///
    /// The returned offset points at the commitment itself, two bytes past the start of
    /// the data carrier script.
    pub fn find_commitment(&self, commitment: &[u8; 32]) -> Result<usize, ClaimError> {
        let expected = data_carrier_script(commitment).0;
        self.output_offsets
            .iter()
            .find_map(|offset| {
                let length = *self.bytes.get(offset + VALUE_BYTES)? as usize;
                let script_start = offset + VALUE_BYTES + 1;
                let script = self.bytes.get(script_start..script_start + length)?;
                (script == expected.as_slice()).then_some(script_start + DATA_CARRIER_PREFIX.len())
            })
            .ok_or(ClaimError::CommitmentNotEmbedded)
    }
}

pub(crate) fn check_script_length<P: ClaimConfig>(len: usize) -> Result<(), ClaimError> {
    if P::SCRIPT_LENGTHS.contains(&len) && len <= P::MAX_SCRIPT_BYTES && len <= MAX_SINGLE_BYTE_VARINT
    {
        Ok(())
    } else {
        Err(ClaimError::UnsupportedScriptLength {
            len,
            supported: P::SCRIPT_LENGTHS,
        })
    }
}

/// Read the amount and the locking script of the output serialized at `offset`
pub fn extract_output_at<P: ClaimConfig>(
    bytes: &[u8],
    offset: usize,
) -> Result<(u64, Vec<u8>), ClaimError> {
    let header = bytes
        .get(offset..offset + VALUE_BYTES + 1)
        .ok_or(ClaimError::OffsetOutOfBounds {
            offset,
            width: VALUE_BYTES + 1,
            len: bytes.len(),
        })?;
    let amount = LittleEndian::read_u64(&header[..VALUE_BYTES]);
    let script_len = header[VALUE_BYTES] as usize;
    check_script_length::<P>(script_len)?;

    let script_start = offset + VALUE_BYTES + 1;
    let script = bytes
        .get(script_start..script_start + script_len)
        .ok_or(ClaimError::OffsetOutOfBounds {
            offset: script_start,
            width: script_len,
            len: bytes.len(),
        })?;

    Ok((amount, script.to_vec()))
}

/// Copy of `bytes` with an output paying `amount` to `script` written at `offset`
pub fn embed_output_at<P: ClaimConfig>(
    bytes: &[u8],
    offset: usize,
    amount: u64,
    script: &[u8],
) -> Result<Vec<u8>, ClaimError> {
    check_script_length::<P>(script.len())?;
    let width = VALUE_BYTES + 1 + script.len();
    if offset + width > bytes.len() {
        return Err(ClaimError::OffsetOutOfBounds {
            offset,
            width,
            len: bytes.len(),
        });
    }

    let mut embedded = bytes.to_vec();
    LittleEndian::write_u64(&mut embedded[offset..offset + VALUE_BYTES], amount);
    embedded[offset + VALUE_BYTES] = script.len() as u8;
    embedded[offset + VALUE_BYTES + 1..offset + width].copy_from_slice(script);
    Ok(embedded)
}

#[cfg(test)]
mod test {
    use chain_gang::messages::{OutPoint, TxIn};
    use chain_gang::util::Hash256;

    use super::*;
    use crate::traits::BridgeConfig;

    fn p2wpkh_script() -> Vec<u8> {
        let mut script = vec![0x00, 0x14];
        script.extend_from_slice(&[0x5a; 20]);
        script
    }

    fn test_tx(commitment: &[u8; 32]) -> Tx {
        Tx {
            version: 2,
            inputs: vec![TxIn {
                prev_output: OutPoint {
                    hash: Hash256::decode(
                        "f671dc000ad12795e86b59b27e0c367d9b026bbd4141c227b9285867a53bb6f7",
                    )
                    .unwrap(),
                    index: 0,
                },
                unlock_script: Script(vec![]),
                sequence: 0xffffffff,
            }],
            outputs: vec![
                TxOut {
                    satoshis: 0,
                    lock_script: data_carrier_script(commitment),
                },
                TxOut {
                    satoshis: 100_000_000,
                    lock_script: Script(p2wpkh_script()),
                },
            ],
            lock_time: 0,
        }
    }

    #[test]
    fn test_layout_offsets() {
        let commitment = [0x42u8; 32];
        let tx = test_tx(&commitment);
        let layout = TxLayout::new(&tx).unwrap();

        // version, input count, input (36 + 1 + 4), output count
        assert_eq!(layout.output_offsets[0], 4 + 1 + 41 + 1);
        assert_eq!(layout.output_offsets[1], layout.output_offsets[0] + 8 + 1 + 34);
        assert_eq!(layout.bytes.len(), layout.output_offsets[1] + 8 + 1 + 22 + 4);

        for (offset, output) in layout.output_offsets.iter().zip(tx.outputs.iter()) {
            let (amount, script) = extract_output_at::<BridgeConfig>(&layout.bytes, *offset).unwrap();
            assert_eq!(amount as i64, output.satoshis);
            assert_eq!(script, output.lock_script.0);
        }
    }

    #[test]
    fn test_find_payment_and_commitment() {
        let commitment = [0x42u8; 32];
        let layout = TxLayout::new(&test_tx(&commitment)).unwrap();

        assert_eq!(
            layout.find_payment(100_000_000, &p2wpkh_script()).unwrap(),
            layout.output_offsets[1]
        );
        assert!(matches!(
            layout.find_payment(99_999_999, &p2wpkh_script()),
            Err(ClaimError::OutputNotFound { amount: 99_999_999 })
        ));

        let offset = layout.find_commitment(&commitment).unwrap();
        assert_eq!(offset, layout.output_offsets[0] + 8 + 1 + 2);
        assert_eq!(&layout.bytes[offset - 2..offset], &DATA_CARRIER_PREFIX);
        assert_eq!(&layout.bytes[offset..offset + 32], &commitment);
        assert!(matches!(
            layout.find_commitment(&[0x43u8; 32]),
            Err(ClaimError::CommitmentNotEmbedded)
        ));
    }

    #[test]
    fn test_embed_extract_round_trip() {
        let buffer = vec![0xeeu8; 100];
        for len in BridgeConfig::SCRIPT_LENGTHS {
            let script: Vec<u8> = (0..*len as u8).collect();
            let embedded =
                embed_output_at::<BridgeConfig>(&buffer, 17, 123_456_789, &script).unwrap();
            assert_eq!(
                extract_output_at::<BridgeConfig>(&embedded, 17).unwrap(),
                (123_456_789, script)
            );
        }
    }

    #[test]
    fn test_unsupported_lengths_are_rejected() {
        let buffer = vec![0u8; 100];
        for len in [0usize, 21, 24, 33, 35] {
            assert!(matches!(
                embed_output_at::<BridgeConfig>(&buffer, 0, 1, &vec![0x51; len]),
                Err(ClaimError::UnsupportedScriptLength { .. })
            ));
        }

        let mut bytes = buffer.clone();
        bytes[VALUE_BYTES] = 24;
        assert!(matches!(
            extract_output_at::<BridgeConfig>(&bytes, 0),
            Err(ClaimError::UnsupportedScriptLength { len: 24, .. })
        ));
    }

    #[test]
    fn test_embed_past_end_is_rejected() {
        let buffer = vec![0u8; 40];
        assert!(matches!(
            embed_output_at::<BridgeConfig>(&buffer, 10, 1, &[0x51; 22]),
            Err(ClaimError::OffsetOutOfBounds {
                offset: 10,
                width: 31,
                len: 40
            })
        ));
    }
}

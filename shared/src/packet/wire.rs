use bincode::Options;
use thiserror::Error;

use crate::packet::{Packet, PacketKind};

/// Errors surfaced while encoding or decoding the fixed wire layout.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode {kind:?} packet: {source}")]
    Encode {
        kind: PacketKind,
        source: bincode::Error,
    },
    #[error("failed to decode {kind:?} packet: {source}")]
    Decode {
        kind: PacketKind,
        source: bincode::Error,
    },
    #[error("addressed payload of {len} bytes is shorter than its uid prefix")]
    Truncated { len: usize },
}

/// Packed little-endian layout with fixed-width integers: an int32 simulation
/// tick, float32 vectors, a 4-float quaternion, and int8 input deltas come
/// out exactly as wide as declared.
fn wire_options() -> impl Options {
    bincode::options().with_fixint_encoding().with_little_endian()
}

pub fn encode<P: Packet>(packet: &P) -> Result<Vec<u8>, WireError> {
    wire_options()
        .serialize(packet)
        .map_err(|source| WireError::Encode {
            kind: P::KIND,
            source,
        })
}

pub fn decode<P: Packet>(payload: &[u8]) -> Result<P, WireError> {
    wire_options()
        .deserialize(payload)
        .map_err(|source| WireError::Decode {
            kind: P::KIND,
            source,
        })
}

/// Encodes a packet prefixed with the network uid of the entity it concerns.
pub fn encode_addressed<P: Packet>(uid: u64, packet: &P) -> Result<Vec<u8>, WireError> {
    let mut bytes = uid.to_le_bytes().to_vec();
    bytes.extend(encode(packet)?);
    Ok(bytes)
}

/// Splits an addressed payload into its uid prefix and the packet bytes.
pub fn split_addressed(payload: &[u8]) -> Result<(u64, &[u8]), WireError> {
    if payload.len() < 8 {
        return Err(WireError::Truncated { len: payload.len() });
    }

    let (prefix, body) = payload.split_at(8);
    let mut uid_bytes = [0u8; 8];
    uid_bytes.copy_from_slice(prefix);
    Ok((u64::from_le_bytes(uid_bytes), body))
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::{decode, encode, encode_addressed, split_addressed, WireError};
    use crate::packet::{PlayerAction, PlayerActionResponse};

    #[test]
    fn player_action_layout_is_packed() {
        let action = PlayerAction {
            simulation_tick: 7,
            rotation: Quat::IDENTITY,
            delta_action: [1, 0, -1],
            walking: true,
        };

        let bytes = encode(&action).unwrap();
        // int32 tick + 4 x float32 quat + 3 x int8 deltas + bool
        assert_eq!(bytes.len(), 4 + 16 + 3 + 1);
        assert_eq!(&bytes[0..4], &7i32.to_le_bytes());
    }

    #[test]
    fn response_round_trips() {
        let response = PlayerActionResponse {
            simulation_tick: 42,
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(0.0, -9.81, 4.0),
            rotation: Quat::from_rotation_y(0.5),
        };

        let decoded: PlayerActionResponse = decode(&encode(&response).unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let result = decode::<PlayerAction>(&[1, 2, 3]);
        assert!(matches!(result, Err(WireError::Decode { .. })));
    }

    #[test]
    fn addressed_payloads_carry_the_uid_prefix() {
        let action = PlayerAction::default();
        let bytes = encode_addressed(9001, &action).unwrap();

        let (uid, body) = split_addressed(&bytes).unwrap();
        assert_eq!(uid, 9001);
        assert_eq!(decode::<PlayerAction>(body).unwrap(), action);

        assert!(matches!(
            split_addressed(&[0; 4]),
            Err(WireError::Truncated { len: 4 })
        ));
    }
}

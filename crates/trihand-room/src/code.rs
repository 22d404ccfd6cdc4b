//! Room-code generation.

use rand::Rng;

use trihand_protocol::{RoomCode, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};

/// Draws a random 6-character room code from the unambiguous alphabet.
///
/// Uniqueness against live rooms is the registry's job — it redraws on the
/// (rare) collision.
pub fn generate_room_code(rng: &mut impl Rng) -> RoomCode {
    let code: String = (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect();
    RoomCode::from_generated(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_codes_are_valid_wire_codes() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            // Round-trips through the strict parser.
            let parsed: RoomCode = code.as_str().parse().unwrap();
            assert_eq!(parsed, code);
        }
    }

    #[test]
    fn test_generated_codes_avoid_ambiguous_characters() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let code = generate_room_code(&mut rng);
            assert!(
                !code.as_str().chars().any(|c| "0O1IL".contains(c)),
                "{code}"
            );
        }
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_room_code(&mut StdRng::seed_from_u64(42));
        let b = generate_room_code(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}

//! Identifier generation for new records

use uuid::Uuid;

const ID_LENGTH: usize = 14;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque unique-id generator seeded with a type prefix (`app-`, `appv-`, ...)
pub trait IdGenerator: Send + Sync {
    fn generate(&self, prefix: &str) -> String;
}

/// Random ids: prefix followed by 14 base-36 characters of a v4 UUID
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self, prefix: &str) -> String {
        let mut value = Uuid::new_v4().as_u128();
        let mut suffix = Vec::with_capacity(ID_LENGTH);
        for _ in 0..ID_LENGTH {
            suffix.push(ALPHABET[(value % 36) as usize]);
            value /= 36;
        }
        format!("{}{}", prefix, String::from_utf8_lossy(&suffix))
    }
}

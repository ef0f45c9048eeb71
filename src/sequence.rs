//! Identifier generation for Diameter messages
//!
//! RFC 6733 requires Hop-by-Hop identifiers to start from a random value
//! and increase monotonically, and End-to-End identifiers to combine the
//! low 8 bits of the current time with a randomly seeded 24-bit counter.
//! Both generators here are lock-free and safe to share across tasks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates monotonically increasing hop-by-hop identifiers starting from
/// a cryptographically random seed, wrapping at 2^32.
#[derive(Debug)]
pub struct HopByHopIdGenerator {
    next_value: AtomicU32,
}

impl HopByHopIdGenerator {
    pub fn new() -> Self {
        Self {
            next_value: AtomicU32::new(rand::random()),
        }
    }

    /// Return the current identifier and advance by one
    pub fn next(&self) -> u32 {
        self.next_value.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for HopByHopIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates end-to-end identifiers per RFC 6733: the high-order 8 bits are
/// the low-order 8 bits of the Unix epoch second at generation time, the
/// low-order 24 bits come from a randomly seeded counter that increments on
/// each call and wraps within 24 bits.
#[derive(Debug)]
pub struct EndToEndIdGenerator {
    lower_24_bits: AtomicU32,
}

impl EndToEndIdGenerator {
    pub fn new() -> Self {
        Self {
            lower_24_bits: AtomicU32::new(rand::random()),
        }
    }

    /// Return the next identifier
    pub fn next(&self) -> u32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let n = self.lower_24_bits.fetch_add(1, Ordering::Relaxed);
        (((now as u32) & 0xff) << 24) | (n & 0x00ff_ffff)
    }
}

impl Default for EndToEndIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A bundle of the two identifier generators, shared by a peer state
/// machine and the library embedding it.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    hop_by_hop: HopByHopIdGenerator,
    end_to_end: EndToEndIdGenerator,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            hop_by_hop: HopByHopIdGenerator::new(),
            end_to_end: EndToEndIdGenerator::new(),
        }
    }

    /// The next hop-by-hop identifier
    pub fn next_hop_by_hop_id(&self) -> u32 {
        self.hop_by_hop.next()
    }

    /// The next end-to-end identifier
    pub fn next_end_to_end_id(&self) -> u32 {
        self.end_to_end.next()
    }
}

/// Generate a Session-Id per RFC 6733 Section 8.8:
/// `<origin_host>;<high 32 bits>;<low 32 bits>` of the current Unix
/// microsecond counter.
pub fn generate_session_id(origin_host: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);

    format!("{};{};{}", origin_host, (now >> 32) as u32, now as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_hop_by_hop_increments_by_one() {
        let generator = HopByHopIdGenerator::new();
        let first = generator.next();
        assert_eq!(generator.next(), first.wrapping_add(1));
        assert_eq!(generator.next(), first.wrapping_add(2));
    }

    #[test]
    fn test_hop_by_hop_wraps() {
        let generator = HopByHopIdGenerator {
            next_value: AtomicU32::new(u32::MAX),
        };
        assert_eq!(generator.next(), u32::MAX);
        assert_eq!(generator.next(), 0);
    }

    #[test]
    fn test_end_to_end_composition() {
        let generator = EndToEndIdGenerator {
            lower_24_bits: AtomicU32::new(0x00ff_fffe),
        };

        let now_low_byte = (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32)
            & 0xff;

        let id = generator.next();
        assert_eq!(id >> 24, now_low_byte);
        assert_eq!(id & 0x00ff_ffff, 0x00ff_fffe);

        // The 24-bit counter wraps without touching the time byte.
        let id = generator.next();
        assert_eq!(id & 0x00ff_ffff, 0x00ff_ffff);
        let id = generator.next();
        assert_eq!(id & 0x00ff_ffff, 0);
    }

    #[test]
    fn test_concurrent_hop_by_hop_ids_are_unique() {
        let generator = Arc::new(HopByHopIdGenerator {
            next_value: AtomicU32::new(0),
        });

        let mut handles = Vec::new();
        for _ in 0..4 {
            let generator = Arc::clone(&generator);
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| generator.next()).collect::<Vec<u32>>()
            }));
        }

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn test_session_id_format() {
        let session_id = generate_session_id("client.example.com");

        let parts: Vec<&str> = session_id.split(';').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "client.example.com");

        let high: u64 = parts[1].parse().unwrap();
        let low: u64 = parts[2].parse().unwrap();
        let micros = (high << 32) | low;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;
        assert!(now - micros < 5_000_000, "timestamp should be recent");
    }
}

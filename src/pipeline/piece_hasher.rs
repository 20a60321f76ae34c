//! Accumulates archive bytes into fixed-size pieces and hashes each
//! completed piece with SHA-1, the scheme BitTorrent metainfo files use to
//! let a client verify downloaded data incrementally.

use sha1::{Digest, Sha1};

pub const DIGEST_LEN: usize = 20;

pub struct PieceHasher {
    piece_length: usize,
    pending: Vec<u8>,
    digests: Vec<u8>,
    piece_count: u64,
}

impl PieceHasher {
    pub fn new(piece_length: u64) -> Self {
        assert!(piece_length > 0, "piece_length must be positive");
        Self {
            piece_length: piece_length as usize,
            pending: Vec::new(),
            digests: Vec::new(),
            piece_count: 0,
        }
    }

    /// Appends `bytes`, hashing and emitting every complete `piece_length`
    /// window as soon as it is formed. Deterministic regardless of how the
    /// input is chunked across calls.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while self.pending.len() >= self.piece_length {
            let piece: Vec<u8> = self.pending.drain(..self.piece_length).collect();
            self.hash_piece(&piece);
        }
    }

    /// Hashes any remaining partial piece and returns the concatenated
    /// digests plus the total piece count.
    pub fn finalize(mut self) -> (Vec<u8>, u64) {
        if !self.pending.is_empty() {
            let piece = std::mem::take(&mut self.pending);
            self.hash_piece(&piece);
        }
        (self.digests, self.piece_count)
    }

    fn hash_piece(&mut self, piece: &[u8]) {
        let mut hasher = Sha1::new();
        hasher.update(piece);
        let digest = hasher.finalize();
        self.digests.extend_from_slice(&digest);
        self.piece_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha1_hex(data: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    #[test]
    fn empty_input_hashes_to_one_empty_piece() {
        let hasher = PieceHasher::new(16);
        let (digests, count) = hasher.finalize();
        assert_eq!(count, 1);
        assert_eq!(digests.len(), DIGEST_LEN);
        assert_eq!(
            hex::encode(&digests),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn exact_multiple_of_piece_length_has_no_short_piece() {
        let mut hasher = PieceHasher::new(4);
        hasher.feed(b"abcdefgh");
        let (digests, count) = hasher.finalize();
        assert_eq!(count, 2);
        assert_eq!(digests.len(), 2 * DIGEST_LEN);
        assert_eq!(hex::encode(&digests[0..20]), sha1_hex(b"abcd"));
        assert_eq!(hex::encode(&digests[20..40]), sha1_hex(b"efgh"));
    }

    #[test]
    fn short_final_piece_is_hashed_on_finalize() {
        let mut hasher = PieceHasher::new(4);
        hasher.feed(b"abcdef");
        let (digests, count) = hasher.finalize();
        assert_eq!(count, 2);
        assert_eq!(hex::encode(&digests[0..20]), sha1_hex(b"abcd"));
        assert_eq!(hex::encode(&digests[20..40]), sha1_hex(b"ef"));
    }

    #[test]
    fn chunking_of_feed_calls_does_not_matter() {
        let data: Vec<u8> = (0u8..=255).collect();

        let mut whole = PieceHasher::new(16);
        whole.feed(&data);
        let (whole_digests, whole_count) = whole.finalize();

        let mut piecemeal = PieceHasher::new(16);
        for chunk in data.chunks(7) {
            piecemeal.feed(chunk);
        }
        let (piecemeal_digests, piecemeal_count) = piecemeal.finalize();

        assert_eq!(whole_count, piecemeal_count);
        assert_eq!(whole_digests, piecemeal_digests);
    }

    mod hex {
        pub fn encode(bytes: &[u8]) -> String {
            bytes.iter().map(|b| format!("{b:02x}")).collect()
        }
    }
}

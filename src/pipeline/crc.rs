//! Incremental IEEE CRC-32, the checksum stored in each ZIP entry's data
//! descriptor and central directory record.
//!
//! A thin wrapper around `crc32fast::Hasher` so the pipeline depends on the
//! spec's own component boundary (`Crc32::update` / `Crc32::finalize`)
//! rather than the third-party type directly.

#[derive(Default)]
pub struct Crc32 {
    inner: crc32fast::Hasher,
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `bytes` into the running checksum. Result is independent of how
    /// the input stream is chunked across calls.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> u32 {
        self.inner.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::Crc32;

    #[test]
    fn empty_input_is_zero() {
        let crc = Crc32::new();
        assert_eq!(crc.finalize(), 0);
    }

    #[test]
    fn known_vector() {
        let mut crc = Crc32::new();
        crc.update(b"123456789");
        assert_eq!(crc.finalize(), 0xCBF4_3926);
    }

    #[test]
    fn chunking_is_irrelevant() {
        let data = b"the quick brown fox jumps over the lazy dog";

        let mut whole = Crc32::new();
        whole.update(data);
        let whole_crc = whole.finalize();

        let mut chunked = Crc32::new();
        for byte_chunk in data.chunks(3) {
            chunked.update(byte_chunk);
        }
        let chunked_crc = chunked.finalize();

        assert_eq!(whole_crc, chunked_crc);
    }

    #[test]
    fn matches_hi_fixture() {
        let mut crc = Crc32::new();
        crc.update(b"hi");
        assert_eq!(crc.finalize(), 0xD893_2AAC);
    }
}

pub mod crc;
pub mod multipart_sink;
pub mod orchestrator;
pub mod piece_hasher;
pub mod torrent;
pub mod zip_framer;

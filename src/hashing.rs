//! Hashing adaptor (C3). Given an open readable stream of known size, computes a
//! fixed bundle of digests in a single pass by fanning each read chunk out to every
//! enabled hasher, mirroring the source's multi-writer approach.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake2::Blake2b;
use blake2::Blake2s256;
use crc_fast::{CrcAlgorithm, Digest as CrcDigest};
use digest::Digest as _;
use digest::consts::{U32, U48};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_256, Sha3_512};

use crate::record::{Blake2bBundle, Blake2sBundle, BlakeBundle, CrcBundle, HashBundle, Sha2Bundle, Sha3Bundle};

type Blake2b256 = Blake2b<U32>;
type Blake2b384 = Blake2b<U48>;

const READ_CHUNK_SIZE: usize = 1024 * 1024;

/// Read and hash `path` (whose size is already known to be `size` bytes), producing
/// the full digest bundle. Returns the empty bundle without reading the file when
/// `size` exceeds `size_limit_bytes`.
pub fn hash_file(path: &Path, size: u64, size_limit_bytes: u64) -> std::io::Result<HashBundle> {
    if size > size_limit_bytes {
        return Ok(HashBundle::default());
    }
    let file = File::open(path)?;
    hash_stream(BufReader::with_capacity(READ_CHUNK_SIZE, file))
}

/// Fan a readable stream out to every enabled hasher and assemble the digest bundle.
/// A read error aborts and discards all partially-computed digests.
pub fn hash_stream<R: Read>(mut reader: R) -> std::io::Result<HashBundle> {
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut sha224 = Sha224::new();
    let mut sha256 = Sha256::new();
    let mut sha384 = Sha384::new();
    let mut sha512 = Sha512::new();
    let mut sha512_224 = Sha512_224::new();
    let mut sha512_256 = Sha512_256::new();
    let mut sha3_256 = Sha3_256::new();
    let mut sha3_512 = Sha3_512::new();
    let mut crc32 = CrcDigest::new(CrcAlgorithm::Crc32IsoHdlc);
    let mut crc64 = CrcDigest::new(CrcAlgorithm::Crc64Ecma182);
    let mut blake2b_256 = Blake2b256::new();
    let mut blake2b_384 = Blake2b384::new();
    let mut blake2b_512 = blake2::Blake2b512::new();
    let mut blake2s_256 = Blake2s256::new();

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        md5.update(chunk);
        sha1.update(chunk);
        sha224.update(chunk);
        sha256.update(chunk);
        sha384.update(chunk);
        sha512.update(chunk);
        sha512_224.update(chunk);
        sha512_256.update(chunk);
        sha3_256.update(chunk);
        sha3_512.update(chunk);
        std::io::Write::write_all(&mut crc32, chunk)?;
        std::io::Write::write_all(&mut crc64, chunk)?;
        blake2b_256.update(chunk);
        blake2b_384.update(chunk);
        blake2b_512.update(chunk);
        blake2s_256.update(chunk);
    }

    Ok(HashBundle {
        md5: hex::encode(md5.finalize()),
        sha1: hex::encode(sha1.finalize()),
        sha2: Sha2Bundle {
            sha224: hex::encode(sha224.finalize()),
            sha256: hex::encode(sha256.finalize()),
            sha384: hex::encode(sha384.finalize()),
            sha512: hex::encode(sha512.finalize()),
            sha512_224: hex::encode(sha512_224.finalize()),
            sha512_256: hex::encode(sha512_256.finalize()),
        },
        sha3: Sha3Bundle {
            sha256: hex::encode(sha3_256.finalize()),
            sha512: hex::encode(sha3_512.finalize()),
        },
        crc: CrcBundle {
            crc32: format!("{:08x}", crc32.finalize() as u32),
            crc64: format!("{:016x}", crc64.finalize()),
        },
        blake: BlakeBundle {
            blake2b: Blake2bBundle {
                blake256: hex::encode(blake2b_256.finalize()),
                blake384: hex::encode(blake2b_384.finalize()),
                blake512: hex::encode(blake2b_512.finalize()),
            },
            blake2s: Blake2sBundle {
                blake256: hex::encode(blake2s_256.finalize()),
            },
        },
    })
}

//! Artifact files and key digests
//!
//! File format (all artifacts):
//!
//! ```text
//!   magic[8] = "SVKART1\0" | version: u16 BE | kind: u8 | ark compressed payload
//! ```
//!
//! `kind` guards against loading a proof where a key is expected; the payload
//! types themselves are not self-describing.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use ark_ec::pairing::Pairing;
use ark_groth16::VerifyingKey;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};

pub const FILE_MAGIC: &[u8; 8] = b"SVKART1\0";
pub const FILE_VERSION: u16 = 1;

/// Tag stored after the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    VerifyingKey = 1,
    Proof = 2,
    PublicInputs = 3,
}

impl ArtifactKind {
    fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::VerifyingKey),
            2 => Some(Self::Proof),
            3 => Some(Self::PublicInputs),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization: {0}")]
    Serialize(#[from] SerializationError),
    #[error("bad artifact magic")]
    BadMagic,
    #[error("unsupported artifact version {0}")]
    Version(u16),
    #[error("expected a {expected:?} artifact, found tag {found}")]
    Kind { expected: ArtifactKind, found: u8 },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io { path: path.to_path_buf(), source }
}

/// Write `value` as a `kind` artifact at `path`.
pub fn write_artifact<T: CanonicalSerialize>(
    path: &Path,
    kind: ArtifactKind,
    value: &T,
) -> Result<(), ArtifactError> {
    let mut payload = Vec::with_capacity(value.compressed_size());
    value.serialize_compressed(&mut payload)?;

    let mut f = fs::File::create(path).map_err(io_err(path))?;
    f.write_all(FILE_MAGIC).map_err(io_err(path))?;
    f.write_all(&FILE_VERSION.to_be_bytes()).map_err(io_err(path))?;
    f.write_all(&[kind as u8]).map_err(io_err(path))?;
    f.write_all(&payload).map_err(io_err(path))?;
    f.flush().map_err(io_err(path))
}

/// Read a `kind` artifact from `path`, checking magic, version and tag.
pub fn read_artifact<T: CanonicalDeserialize>(
    path: &Path,
    kind: ArtifactKind,
) -> Result<T, ArtifactError> {
    let mut f = fs::File::open(path).map_err(io_err(path))?;
    let mut header = [0u8; 11];
    f.read_exact(&mut header).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ArtifactError::BadMagic,
        _ => io_err(path)(e),
    })?;

    if &header[..8] != FILE_MAGIC {
        return Err(ArtifactError::BadMagic);
    }
    let version = u16::from_be_bytes([header[8], header[9]]);
    if version != FILE_VERSION {
        return Err(ArtifactError::Version(version));
    }
    if ArtifactKind::from_u8(header[10]) != Some(kind) {
        return Err(ArtifactError::Kind { expected: kind, found: header[10] });
    }

    let mut payload = Vec::new();
    f.read_to_end(&mut payload).map_err(io_err(path))?;
    Ok(T::deserialize_compressed(payload.as_slice())?)
}

/// blake3 over the compressed encoding of `vk`.
pub fn key_digest<E: Pairing>(vk: &VerifyingKey<E>) -> Result<[u8; 32], SerializationError> {
    let mut bytes = Vec::with_capacity(vk.compressed_size());
    vk.serialize_compressed(&mut bytes)?;
    Ok(*blake3::hash(&bytes).as_bytes())
}

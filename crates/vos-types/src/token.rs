use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Version tag leading every encoded token.
const TOKEN_VERSION: &str = "v1";

/// Number of random bytes in a token nonce.
pub const NONCE_LEN: usize = 16;

/// Number of bytes of the physical address digest carried in a token.
pub const ADDRESS_DIGEST_LEN: usize = 8;

/// Truncated BLAKE3 digest of a physical address, binding a token to the
/// one address it was allocated with.
pub fn address_digest(physical_address: &str) -> [u8; ADDRESS_DIGEST_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"vos-physical-address\0");
    hasher.update(physical_address.as_bytes());
    let mut out = [0u8; ADDRESS_DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize().as_bytes()[..ADDRESS_DIGEST_LEN]);
    out
}

/// Short hash identifying one incarnation of a branch.
///
/// Derived from the repository name, the branch name and the branch's
/// incarnation id, so a branch that is deleted and recreated under the same
/// name gets a different fingerprint and stale tokens never match it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchFingerprint([u8; 8]);

impl BranchFingerprint {
    /// Derive the fingerprint of a branch incarnation.
    pub fn derive(repository: &str, branch: &str, incarnation: &Uuid) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vos-branch-fingerprint\0");
        hasher.update(repository.as_bytes());
        hasher.update(b"\0");
        hasher.update(branch.as_bytes());
        hasher.update(b"\0");
        hasher.update(incarnation.as_bytes());
        let hash = hasher.finalize();
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash.as_bytes()[..8]);
        Self(out)
    }

    /// Create from raw bytes.
    pub fn from_raw(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Hex-encoded string representation (16 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 16-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 8 {
            return Err(TypeError::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for BranchFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchFingerprint({})", self.to_hex())
    }
}

/// The decoded contents of a [`StagingToken`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    /// The branch incarnation the token was issued for.
    pub fingerprint: BranchFingerprint,
    /// The branch's staging generation at issuance time.
    pub generation: u64,
    /// Digest of the physical address the token was issued with.
    pub address: [u8; ADDRESS_DIGEST_LEN],
    /// Random bytes making every token unique and unguessable.
    pub nonce: [u8; NONCE_LEN],
}

impl TokenClaims {
    /// Claims for a fresh token bound to `physical_address`, with a random
    /// nonce.
    pub fn fresh(fingerprint: BranchFingerprint, generation: u64, physical_address: &str) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            fingerprint,
            generation,
            address: address_digest(physical_address),
            nonce,
        }
    }

    /// Returns `true` if the token was issued together with `physical_address`.
    pub fn binds(&self, physical_address: &str) -> bool {
        self.address == address_digest(physical_address)
    }

    /// Encode the claims into an opaque token.
    pub fn encode(&self) -> StagingToken {
        StagingToken(format!(
            "{TOKEN_VERSION}.{}.{}.{}.{}",
            self.fingerprint.to_hex(),
            self.generation,
            hex::encode(self.address),
            hex::encode(self.nonce)
        ))
    }
}

/// Opaque staging token handed out with every staging location.
///
/// A token is a concurrency fence: it is valid only while its branch's
/// staging generation still equals the generation captured at issuance.
/// Clients must never interpret it; only the server decodes it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingToken(String);

impl StagingToken {
    /// Wrap a token string received from a client.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the token's claims.
    ///
    /// Fails with [`TypeError::MalformedToken`] if the string was not produced
    /// by [`TokenClaims::encode`].
    pub fn claims(&self) -> Result<TokenClaims, TypeError> {
        let malformed = |reason: &str| TypeError::MalformedToken(reason.to_string());

        let mut parts = self.0.split('.');
        let (Some(version), Some(fingerprint), Some(generation), Some(address), Some(nonce), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed("expected five dot-separated fields"));
        };

        if version != TOKEN_VERSION {
            return Err(malformed("unknown token version"));
        }
        let fingerprint =
            BranchFingerprint::from_hex(fingerprint).map_err(|e| malformed(&e.to_string()))?;
        let generation = generation
            .parse::<u64>()
            .map_err(|_| malformed("generation is not a number"))?;
        let address_bytes = hex::decode(address).map_err(|_| malformed("address digest is not hex"))?;
        let address: [u8; ADDRESS_DIGEST_LEN] = address_bytes
            .try_into()
            .map_err(|_| malformed("address digest has wrong length"))?;
        let nonce_bytes = hex::decode(nonce).map_err(|_| malformed("nonce is not hex"))?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| malformed("nonce has wrong length"))?;

        Ok(TokenClaims {
            fingerprint,
            generation,
            address,
            nonce,
        })
    }
}

impl fmt::Debug for StagingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StagingToken({})", self.0)
    }
}

impl fmt::Display for StagingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

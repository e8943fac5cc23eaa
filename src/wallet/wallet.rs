use crate::core::Transaction;
use crate::error::Result;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

// Uncompressed SEC1 P-256 point: 0x04 || X || Y
const PUBLIC_KEY_LEN: usize = 65;
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// One account: an ECDSA P-256 key pair. The address is the hex public key.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode, ZeroizeOnDrop)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        let public_key = crate::utils::public_key_from_pkcs8(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        HEXLOWER.encode(&self.public_key)
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    /// Builds and signs a transfer from this wallet in one step.
    pub fn create_transaction(&self, payee: &str, amount: u64, fee: u64) -> Result<Transaction> {
        let mut tx = Transaction::new_regular(amount, &self.get_address(), payee, fee)?;
        tx.sign(&self.pkcs8)?;
        Ok(tx)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}

/// True if `address` is the hex encoding of an uncompressed P-256 public key.
pub fn validate_address(address: &str) -> bool {
    match HEXLOWER.decode(address.as_bytes()) {
        Ok(bytes) => bytes.len() == PUBLIC_KEY_LEN && bytes[0] == UNCOMPRESSED_POINT_TAG,
        Err(_) => false,
    }
}

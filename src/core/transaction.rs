// Value-transfer records: the only thing a block carries
// Balances are account based, so a transaction is just payer -> payee plus a fee
// A REGULAR transfer must be signed by the payer's key; supply-creating
// REWARD and GENESIS transactions carry no signature at all

use crate::core::monetary::{
    GENESIS_AMOUNT, GENESIS_PAYER, GENESIS_TIMESTAMP, MINING_REWARD_PAYER, ROOT_ADDRESS,
};
use crate::error::{LedgerError, Result};
use crate::utils::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize,
    sha256_hex,
};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    #[default]
    Regular,
    Reward,
    Genesis,
}

impl TransactionKind {
    fn tag(self) -> u8 {
        match self {
            TransactionKind::Regular => 0,
            TransactionKind::Reward => 1,
            TransactionKind::Genesis => 2,
        }
    }

    /// Kind implied by a reserved payer tag, for records saved without one.
    pub fn infer_from_payer(payer: &str) -> TransactionKind {
        match payer {
            GENESIS_PAYER => TransactionKind::Genesis,
            MINING_REWARD_PAYER => TransactionKind::Reward,
            _ => TransactionKind::Regular,
        }
    }
}

// The exact byte layout that gets signed, verified and compared for equality
#[derive(Serialize, bincode::Encode)]
struct SigningPayload {
    amount: u64,
    payer: String,
    payee: String,
    fee: u64,
    timestamp: i64,
    kind: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TransactionRecord")]
pub struct Transaction {
    amount: u64,
    payer: String,
    payee: String,
    fee: u64,
    timestamp: i64,
    kind: TransactionKind,
    #[serde(default, with = "signature_hex", skip_serializing_if = "Option::is_none")]
    signature: Option<Vec<u8>>,
}

// Stored shape; older snapshots carry no `kind`
#[derive(Deserialize)]
struct TransactionRecord {
    amount: u64,
    payer: String,
    payee: String,
    fee: u64,
    timestamp: i64,
    #[serde(default)]
    kind: Option<TransactionKind>,
    #[serde(default, with = "signature_hex")]
    signature: Option<Vec<u8>>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        let kind = record
            .kind
            .unwrap_or_else(|| TransactionKind::infer_from_payer(&record.payer));
        Transaction {
            amount: record.amount,
            payer: record.payer,
            payee: record.payee,
            fee: record.fee,
            timestamp: record.timestamp,
            kind,
            signature: record.signature,
        }
    }
}

impl Transaction {
    /// Builds an unsigned transfer stamped with the current time.
    pub fn new_regular(amount: u64, payer: &str, payee: &str, fee: u64) -> Result<Transaction> {
        Ok(Transaction {
            amount,
            payer: payer.to_string(),
            payee: payee.to_string(),
            fee,
            timestamp: current_timestamp()?,
            kind: TransactionKind::Regular,
            signature: None,
        })
    }

    /// Reward paying `miner_address` the block subsidy plus collected fees.
    pub fn new_reward(miner_address: &str, total_amount: u64) -> Result<Transaction> {
        if total_amount == 0 {
            return Err(LedgerError::Transaction(
                "Reward amount must be positive".to_string(),
            ));
        }

        Ok(Transaction {
            amount: total_amount,
            payer: MINING_REWARD_PAYER.to_string(),
            payee: miner_address.to_string(),
            fee: 0,
            timestamp: current_timestamp()?,
            kind: TransactionKind::Reward,
            signature: None,
        })
    }

    /// The fixed transaction that seeds the root identity's balance.
    pub fn new_genesis() -> Transaction {
        Transaction {
            amount: GENESIS_AMOUNT,
            payer: GENESIS_PAYER.to_string(),
            payee: ROOT_ADDRESS.to_string(),
            fee: 0,
            timestamp: GENESIS_TIMESTAMP,
            kind: TransactionKind::Genesis,
            signature: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_test_regular(
        amount: u64,
        payer: &str,
        payee: &str,
        fee: u64,
        timestamp: i64,
    ) -> Transaction {
        Transaction {
            amount,
            payer: payer.to_string(),
            payee: payee.to_string(),
            fee,
            timestamp,
            kind: TransactionKind::Regular,
            signature: None,
        }
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_payer(&self) -> &str {
        self.payer.as_str()
    }

    pub fn get_payee(&self) -> &str {
        self.payee.as_str()
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn get_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// REWARD and GENESIS transactions create supply and skip signature/balance checks.
    pub fn is_supply(&self) -> bool {
        matches!(
            self.kind,
            TransactionKind::Reward | TransactionKind::Genesis
        )
    }

    /// amount + fee, or `None` if that overflows.
    pub fn total_cost(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)
    }

    /// Canonical serialization over {amount, payer, payee, fee, timestamp, kind}.
    /// The signature is excluded so the same bytes serve signing and verification.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        serialize(&SigningPayload {
            amount: self.amount,
            payer: self.payer.clone(),
            payee: self.payee.clone(),
            fee: self.fee,
            timestamp: self.timestamp,
            kind: self.kind.tag(),
        })
    }

    /// Hex SHA-256 of the canonical bytes.
    pub fn id(&self) -> Result<String> {
        Ok(sha256_hex(&self.canonical_bytes()?))
    }

    /// Attaches the payer's signature. May only be done once.
    pub fn sign(&mut self, pkcs8: &[u8]) -> Result<()> {
        if self.amount == 0 {
            return Err(LedgerError::Transaction(
                "Cannot sign a transaction with a non-positive amount".to_string(),
            ));
        }
        if self.signature.is_some() {
            return Err(LedgerError::Transaction(
                "Transaction is already signed".to_string(),
            ));
        }

        let message = self.canonical_bytes()?;
        let signature = ecdsa_p256_sha256_sign_digest(pkcs8, &message)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Checks the attached signature against `public_key`.
    pub fn verify(&self, public_key: &[u8]) -> bool {
        let Some(signature) = self.signature.as_deref() else {
            return false;
        };
        match self.canonical_bytes() {
            Ok(message) => ecdsa_p256_sha256_sign_verify(public_key, signature, &message),
            Err(_) => false,
        }
    }

    /// Verifies against the payer address, which is the hex public key.
    pub fn verify_payer(&self) -> bool {
        match HEXLOWER.decode(self.payer.as_bytes()) {
            Ok(public_key) => self.verify(&public_key),
            Err(_) => false,
        }
    }
}

// Signatures travel as lowercase hex in JSON snapshots
mod signature_hex {
    use data_encoding::HEXLOWER;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(signature: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match signature {
            Some(bytes) => serializer.serialize_some(&HEXLOWER.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|hex| {
                HEXLOWER
                    .decode(hex.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

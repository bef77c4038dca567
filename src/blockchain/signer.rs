//! Signing and signature verification for envelopes.

use alloy::primitives::keccak256;
use alloy::signers::Signature;

use crate::blockchain::transaction::{SignedTransaction, TransactionEnvelope};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;

/// Stateless signer over [`Wallet`] keys.
pub struct Signer;

impl Signer {
    /// Sign the keccak256 digest of the envelope's canonical bytes.
    ///
    /// Fails with `SigningError` if the envelope's signer is not the wallet.
    pub async fn sign(
        envelope: TransactionEnvelope,
        wallet: &Wallet,
    ) -> BlockchainResult<SignedTransaction> {
        if let Some(signer) = envelope.signer() {
            if signer != wallet.address() {
                return Err(BlockchainError::SigningError(format!(
                    "envelope is for {}, wallet holds {}",
                    signer,
                    wallet.address()
                )));
            }
        }

        let digest = keccak256(envelope.sign_bytes()?);
        let signature = wallet.sign_hash(digest).await?;

        Ok(SignedTransaction::new(
            envelope,
            signature.as_bytes().to_vec(),
            wallet.public_key(),
        ))
    }

    /// Whether the signature was produced by the embedded public key.
    pub fn verify(signed: &SignedTransaction) -> BlockchainResult<bool> {
        let signature = Signature::try_from(signed.signature())
            .map_err(|e| BlockchainError::Encoding(format!("Malformed signature: {}", e)))?;
        let digest = keccak256(signed.envelope().sign_bytes()?);

        let recovered = match signature.recover_from_prehash(&digest) {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        Ok(recovered.to_encoded_point(true).as_bytes() == signed.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::message::Message;
    use crate::blockchain::types::{Coin, Fee};

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const OTHER_PRIVATE_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn envelope(from: &str, sequence: u64) -> TransactionEnvelope {
        TransactionEnvelope::new(
            vec![Message::transfer(from, "inj1recipient", vec![Coin::new(10, "inj")])],
            Fee {
                amount: vec![Coin::new(100, "inj")],
                gas_limit: 100_000,
            },
            None,
            None,
            sequence,
            1,
            "injective-888".to_string(),
        )
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, "inj").unwrap();
        let signed = Signer::sign(envelope(wallet.address(), 3), &wallet).await.unwrap();

        assert_eq!(signed.signature().len(), 65);
        assert_eq!(signed.public_key(), wallet.public_key().as_slice());
        assert!(Signer::verify(&signed).unwrap());
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, "inj").unwrap();
        let a = Signer::sign(envelope(wallet.address(), 3), &wallet).await.unwrap();
        let b = Signer::sign(envelope(wallet.address(), 3), &wallet).await.unwrap();
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());

        let c = Signer::sign(envelope(wallet.address(), 4), &wallet).await.unwrap();
        assert_ne!(a.signature(), c.signature());
    }

    #[tokio::test]
    async fn test_wrong_wallet_refused() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, "inj").unwrap();
        let other = Wallet::from_private_key(OTHER_PRIVATE_KEY, "inj").unwrap();

        let err = Signer::sign(envelope(other.address(), 0), &wallet).await.unwrap_err();
        assert!(matches!(err, BlockchainError::SigningError(_)));
    }

    #[tokio::test]
    async fn test_verify_detects_foreign_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, "inj").unwrap();
        let other = Wallet::from_private_key(OTHER_PRIVATE_KEY, "inj").unwrap();
        let signed = Signer::sign(envelope(wallet.address(), 3), &wallet).await.unwrap();

        let forged = SignedTransaction::new(
            signed.envelope().clone(),
            signed.signature().to_vec(),
            other.public_key(),
        );
        assert!(!Signer::verify(&forged).unwrap());
    }
}

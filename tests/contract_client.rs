//! Contract execution and query tests against an in-memory chain.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tx_broadcaster::blockchain::{BlockchainError, Coin, ContractClient};

mod common;
use common::{setup, MockChain, CONTRACT_ADDRESS, SENDER_ADDRESS};

#[tokio::test]
async fn test_query_does_not_touch_sequence() {
    let (chain, broadcaster) = setup(4);
    let contract = ContractClient::new(Arc::new(broadcaster), CONTRACT_ADDRESS);

    let answer = contract
        .query(&json!({"round": {"round_id": 1}}))
        .await
        .unwrap();

    assert_eq!(answer["contract"], CONTRACT_ADDRESS);
    assert_eq!(answer["query"], json!({"round": {"round_id": 1}}));
    assert_eq!(chain.queries.load(Ordering::SeqCst), 1);
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);
    assert_eq!(chain.sequence_of(SENDER_ADDRESS), Some(4));
}

#[tokio::test]
async fn test_query_as_typed() {
    #[derive(Deserialize)]
    struct Round {
        round_id: u64,
    }

    let contract = ContractClient::read_only(MockChain::new(), CONTRACT_ADDRESS);
    let round: Round = contract.query_as(&json!({"current_round": {}})).await.unwrap();
    assert_eq!(round.round_id, 1);
}

#[tokio::test]
async fn test_query_rejects_non_object() {
    let chain = MockChain::new();
    let contract = ContractClient::read_only(chain.clone(), CONTRACT_ADDRESS);

    let err = contract.query(&json!("config")).await.unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidMessage(_)));
    assert_eq!(chain.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execute_with_funds() {
    let (chain, broadcaster) = setup(0);
    let contract = ContractClient::new(Arc::new(broadcaster), CONTRACT_ADDRESS);

    let result = contract
        .execute(
            json!({"weighted_batch_vote": {"round_id": 1, "project_ids": [1], "amounts": ["160000"]}}),
            Some(Coin::new(160_000, "inj")),
        )
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(chain.sequence_of(SENDER_ADDRESS), Some(1));
}

#[tokio::test]
async fn test_execute_requires_wallet() {
    let chain = MockChain::new();
    let contract = ContractClient::read_only(chain.clone(), CONTRACT_ADDRESS);

    let err = contract.execute(json!({"end_round": {}}), None).await.unwrap_err();
    assert!(matches!(err, BlockchainError::Wallet(_)));
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_contract_info() {
    let contract = ContractClient::read_only(MockChain::new(), CONTRACT_ADDRESS);
    let info = contract.info().await.unwrap();
    assert_eq!(info.address, CONTRACT_ADDRESS);
    assert_eq!(info.code_id, 7);
}

#[tokio::test]
async fn test_recent_transactions_newest_first() {
    let (_chain, broadcaster) = setup(0);
    let contract = ContractClient::new(Arc::new(broadcaster), CONTRACT_ADDRESS);

    let first = contract.execute(json!({"start_round": {}}), None).await.unwrap();
    let second = contract.execute(json!({"end_round": {}}), None).await.unwrap();

    let latest = contract.transactions(1).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].tx_hash, second.tx_hash);

    let all = contract.transactions(10).await.unwrap();
    let hashes: Vec<_> = all.iter().map(|tx| tx.tx_hash.as_str()).collect();
    assert_eq!(hashes, vec![second.tx_hash.as_str(), first.tx_hash.as_str()]);
    assert!(all.iter().all(|tx| tx.code == 0 && tx.height > 0));
}

#[tokio::test]
async fn test_transactions_reject_zero_limit() {
    let contract = ContractClient::read_only(MockChain::new(), CONTRACT_ADDRESS);
    let err = contract.transactions(0).await.unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidMessage(_)));
}

#[tokio::test]
async fn test_transfers_are_not_contract_transactions() {
    let (_chain, broadcaster) = setup(0);
    broadcaster
        .send_coins(common::RECIPIENT_ADDRESS, vec![Coin::new(1, "inj")])
        .await
        .unwrap();

    let contract = ContractClient::new(Arc::new(broadcaster), CONTRACT_ADDRESS);
    assert!(contract.transactions(5).await.unwrap().is_empty());
}

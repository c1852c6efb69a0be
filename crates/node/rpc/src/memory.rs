//! In-process native node.
//!
//! Stores committed blocks in memory and answers the [`NativeClient`] and
//! [`EventSource`] interfaces from them. Committing a block emits
//! `NewBlockHeader` and `Tx` events to every subscribed query they match.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256, Bytes, U256, hex, keccak256};
use async_trait::async_trait;
use evmgate_primitives::{
    AbciEvent, ConsensusParams, EventData, EventDataNewBlockHeader, EventDataTx, JsonTxCodec,
    NativeBlock, NativeBlockResult, NativeEvent, NativeHeader, NativeTxResult, TxDecoder,
    TxExecResult, event_types,
};
use evmgate_translate::{all_tx_logs_from_events, logs_bloom};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    ClientError, EventSource, NativeClient,
    subscriber::{EVM_EVENTS_QUERY, HEADER_EVENTS_QUERY, TX_EVENTS_QUERY},
};

/// Capacity of the event stream returned by [`InMemoryNode::new`].
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct Chain {
    blocks: BTreeMap<u64, (NativeBlock, NativeBlockResult)>,
    by_hash: HashMap<B256, u64>,
    mempool: Vec<Bytes>,
    base_fee: Option<U256>,
    consensus: ConsensusParams,
    validators: HashMap<Bytes, Address>,
}

/// A native node kept entirely in memory.
pub struct InMemoryNode {
    decoder: Arc<dyn TxDecoder>,
    chain: RwLock<Chain>,
    subscriptions: RwLock<HashSet<String>>,
    events: mpsc::Sender<NativeEvent>,
    online: AtomicBool,
}

impl fmt::Debug for InMemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self.chain.read();
        f.debug_struct("InMemoryNode")
            .field("height", &chain.blocks.keys().next_back())
            .field("mempool", &chain.mempool.len())
            .field("subscriptions", &self.subscriptions.read().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryNode {
    /// Creates an empty node using the JSON transaction codec.
    ///
    /// Returns the node and the receiving end of its event stream.
    pub fn new() -> (Arc<Self>, mpsc::Receiver<NativeEvent>) {
        Self::with_decoder(Arc::new(JsonTxCodec), DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an empty node with a custom decoder and event stream capacity.
    pub fn with_decoder(
        decoder: Arc<dyn TxDecoder>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<NativeEvent>) {
        let (events, rx) = mpsc::channel(capacity);
        let node = Self {
            decoder,
            chain: RwLock::new(Chain::default()),
            subscriptions: RwLock::new(HashSet::new()),
            events,
            online: AtomicBool::new(true),
        };
        (Arc::new(node), rx)
    }

    /// Makes every call fail with [`ClientError::Unavailable`] while `false`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Sets the base fee reported for every height.
    pub fn set_base_fee(&self, base_fee: Option<U256>) {
        self.chain.write().base_fee = base_fee;
    }

    /// Sets the consensus parameters reported for every height.
    pub fn set_consensus_params(&self, params: ConsensusParams) {
        self.chain.write().consensus = params;
    }

    /// Registers the Ethereum account of a validator.
    pub fn set_validator_account(&self, proposer: Bytes, account: Address) {
        self.chain.write().validators.insert(proposer, account);
    }

    /// Adds a raw transaction to the mempool.
    pub fn add_unconfirmed_tx(&self, raw: Bytes) {
        self.chain.write().mempool.push(raw);
    }

    /// Returns the queries currently subscribed to.
    pub fn subscribed_queries(&self) -> Vec<String> {
        let mut queries: Vec<_> = self.subscriptions.read().iter().cloned().collect();
        queries.sort();
        queries
    }

    /// Returns the latest committed height, zero before the first block.
    pub fn height(&self) -> u64 {
        self.chain.read().blocks.keys().next_back().copied().unwrap_or_default()
    }

    /// Assembles the next block on top of the current head.
    ///
    /// The block bloom is computed from the log events of `txs` and attached
    /// as an end-of-block event.
    pub fn build_block(&self, txs: Vec<(Bytes, TxExecResult)>) -> (NativeBlock, NativeBlockResult) {
        let (height, parent_hash) = {
            let chain = self.chain.read();
            chain
                .blocks
                .iter()
                .next_back()
                .map_or((1, B256::ZERO), |(height, (block, _))| (height + 1, block.hash()))
        };

        let (raw_txs, txs_results): (Vec<_>, Vec<_>) = txs.into_iter().unzip();

        let mut preimage = Vec::with_capacity(40);
        preimage.extend_from_slice(&height.to_be_bytes());
        preimage.extend_from_slice(parent_hash.as_slice());
        let mut tx_bytes = Vec::new();
        for raw in &raw_txs {
            tx_bytes.extend_from_slice(raw);
        }
        preimage.extend_from_slice(&tx_bytes);

        let logs: Vec<_> = txs_results
            .iter()
            .filter_map(|res| all_tx_logs_from_events(&res.events).ok())
            .flatten()
            .flatten()
            .collect();
        let bloom = logs_bloom(&logs);
        let bloom_event =
            AbciEvent::new(event_types::BLOCK_BLOOM, [(event_types::ATTR_BLOOM, hex::encode(bloom))]);

        let size = raw_txs.iter().map(|raw| raw.len() as u64).sum();
        let header = NativeHeader {
            height,
            hash: keccak256(&preimage),
            parent_hash,
            time: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default(),
            proposer_address: Bytes::from_static(&[0x01; 20]),
            app_hash: keccak256(height.to_be_bytes()),
            data_hash: (!raw_txs.is_empty()).then(|| keccak256(&tx_bytes)),
        };

        let block = NativeBlock { header, txs: raw_txs, size };
        let results = NativeBlockResult { height, txs_results, end_block_events: vec![bloom_event] };
        (block, results)
    }

    /// Builds and commits the next block, returning it.
    pub async fn produce_block(&self, txs: Vec<(Bytes, TxExecResult)>) -> NativeBlock {
        let (block, results) = self.build_block(txs);
        self.commit_block(block.clone(), results).await;
        block
    }

    /// Stores a block with its results and emits its events.
    ///
    /// Included transactions leave the mempool.
    pub async fn commit_block(&self, block: NativeBlock, results: NativeBlockResult) {
        let height = block.height();
        {
            let mut chain = self.chain.write();
            chain.mempool.retain(|raw| !block.txs.contains(raw));
            chain.by_hash.insert(block.hash(), height);
            chain.blocks.insert(height, (block.clone(), results.clone()));
        }

        for event in self.block_events(&block, &results) {
            if self.events.send(event).await.is_err() {
                warn!(height, "event stream closed");
                return;
            }
        }
        debug!(height, txs = block.txs.len(), "committed block");
    }

    fn block_events(&self, block: &NativeBlock, results: &NativeBlockResult) -> Vec<NativeEvent> {
        let subscriptions = self.subscriptions.read();
        let mut events = Vec::new();

        if subscriptions.contains(HEADER_EVENTS_QUERY) {
            let data = EventData::NewBlockHeader(EventDataNewBlockHeader {
                header: block.header.clone(),
                num_txs: block.txs.len() as u64,
                end_block_events: results.end_block_events.clone(),
            });
            events.push(NativeEvent::new(HEADER_EVENTS_QUERY, data));
        }

        for (index, (raw, result)) in block.txs.iter().zip(&results.txs_results).enumerate() {
            let data = EventData::Tx(EventDataTx {
                height: block.height(),
                index: index as u32,
                tx: raw.clone(),
                result: result.clone(),
            });
            if subscriptions.contains(TX_EVENTS_QUERY) {
                events.push(NativeEvent::new(TX_EVENTS_QUERY, data.clone()));
            }
            if subscriptions.contains(EVM_EVENTS_QUERY) {
                let event = NativeEvent::new(EVM_EVENTS_QUERY, data);
                let key = format!("{}.{}", event_types::MESSAGE, event_types::ATTR_MODULE);
                if event.events.get(&key).is_some_and(|modules| {
                    modules.iter().any(|module| module == event_types::MODULE_EVM)
                }) {
                    events.push(event);
                }
            }
        }
        events
    }

    fn ensure_online(&self) -> Result<(), ClientError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Unavailable("node offline".to_string()))
        }
    }

    fn search(&self, query: &str) -> Result<Vec<NativeTxResult>, ClientError> {
        let conditions = query
            .split(" AND ")
            .map(|condition| {
                let (key, value) = condition
                    .split_once('=')
                    .ok_or_else(|| ClientError::InvalidQuery(query.to_string()))?;
                Ok((key.trim().to_string(), value.trim().trim_matches('\'').to_string()))
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        let chain = self.chain.read();
        let mut hits = Vec::new();
        for (height, (block, results)) in &chain.blocks {
            for (index, (raw, result)) in block.txs.iter().zip(&results.txs_results).enumerate() {
                let matches = conditions.iter().all(|(key, value)| {
                    if key == "tx.height" {
                        return value.parse::<u64>().is_ok_and(|h| h == *height);
                    }
                    let Some((kind, attr)) = key.rsplit_once('.') else {
                        return false;
                    };
                    result.events_of(kind).any(|event| {
                        event
                            .attributes
                            .iter()
                            .any(|a| a.key == attr && a.unquoted_value() == *value)
                    })
                });
                if matches {
                    hits.push(NativeTxResult {
                        height: *height,
                        index: index as u32,
                        tx: raw.clone(),
                        result: result.clone(),
                    });
                }
            }
        }
        Ok(hits)
    }
}

#[async_trait]
impl NativeClient for InMemoryNode {
    async fn latest_height(&self) -> Result<u64, ClientError> {
        self.ensure_online()?;
        Ok(self.height())
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<NativeBlock>, ClientError> {
        self.ensure_online()?;
        Ok(self.chain.read().blocks.get(&height).map(|(block, _)| block.clone()))
    }

    async fn block_by_hash(&self, hash: B256) -> Result<Option<NativeBlock>, ClientError> {
        self.ensure_online()?;
        let chain = self.chain.read();
        Ok(chain
            .by_hash
            .get(&hash)
            .and_then(|height| chain.blocks.get(height))
            .map(|(block, _)| block.clone()))
    }

    async fn block_results(&self, height: u64) -> Result<Option<NativeBlockResult>, ClientError> {
        self.ensure_online()?;
        Ok(self.chain.read().blocks.get(&height).map(|(_, results)| results.clone()))
    }

    async fn consensus_params(&self, _height: u64) -> Result<ConsensusParams, ClientError> {
        self.ensure_online()?;
        Ok(self.chain.read().consensus.clone())
    }

    async fn base_fee(&self, _height: u64) -> Result<Option<U256>, ClientError> {
        self.ensure_online()?;
        Ok(self.chain.read().base_fee)
    }

    async fn validator_account(&self, proposer: &Bytes, _height: u64) -> Result<Address, ClientError> {
        self.ensure_online()?;
        self.chain
            .read()
            .validators
            .get(proposer)
            .copied()
            .ok_or_else(|| ClientError::InvalidQuery(format!("unknown validator {proposer}")))
    }

    async fn tx_search(&self, query: &str) -> Result<Vec<NativeTxResult>, ClientError> {
        self.ensure_online()?;
        self.search(query)
    }

    async fn unconfirmed_txs(&self) -> Result<Vec<Bytes>, ClientError> {
        self.ensure_online()?;
        Ok(self.chain.read().mempool.clone())
    }

    fn tx_decoder(&self) -> Arc<dyn TxDecoder> {
        Arc::clone(&self.decoder)
    }
}

#[async_trait]
impl EventSource for InMemoryNode {
    async fn subscribe(&self, query: &str) -> Result<(), ClientError> {
        self.ensure_online()?;
        self.subscriptions.write().insert(query.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, query: &str) -> Result<(), ClientError> {
        self.ensure_online()?;
        self.subscriptions.write().remove(query);
        Ok(())
    }
}

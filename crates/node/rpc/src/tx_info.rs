//! Transaction and receipt lookups.

use alloy_primitives::B256;
use evmgate_primitives::{MsgEthereumTx, NativeBlock, NativeBlockResult, TxResult, event_types};
use evmgate_translate::{
    ParsedTx, ParsedTxs, RpcTransaction, RpcTransactionReceipt, TranslateError, build_receipt,
    find_eth_tx_index, parse_tx_indexer_result, rpc_tx_from_msg, tx_is_valid_enough,
};
use tracing::debug;

use crate::{Backend, BlockNumberOrTag, RpcError};

impl Backend {
    /// Index record of the Ethereum transaction with `hash`.
    pub async fn get_tx_by_eth_hash(&self, hash: B256) -> Result<Option<TxResult>, RpcError> {
        if let Some(indexer) = &self.indexer {
            return Ok(indexer.get_by_tx_hash(&hash));
        }

        let query = format!(
            "{}.{}='{hash}'",
            event_types::PENDING_ETHEREUM_TX,
            event_types::ATTR_ETH_HASH
        );
        self.query_tx_search(&query, |txs| txs.get_tx_by_hash(&hash)).await
    }

    /// Index record of the Ethereum transaction at `index` of block `height`.
    pub async fn get_tx_by_tx_index(&self, height: u64, index: u32) -> Result<Option<TxResult>, RpcError> {
        if let Some(indexer) = &self.indexer {
            return Ok(indexer.get_by_block_and_index(height, index));
        }

        let query = format!(
            "tx.height={height} AND {}.{}={index}",
            event_types::PENDING_ETHEREUM_TX,
            event_types::ATTR_INDEX
        );
        self.query_tx_search(&query, |txs| txs.get_tx_by_tx_index(index)).await
    }

    async fn query_tx_search<F>(&self, query: &str, getter: F) -> Result<Option<TxResult>, RpcError>
    where
        F: FnOnce(&ParsedTxs) -> Option<&ParsedTx>,
    {
        let hits = self.client().tx_search(query).await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!(query, "ethereum tx not found");
            return Ok(None);
        };

        let (valid, reason) = tx_is_valid_enough(&hit.result);
        if !valid {
            debug!(height = hit.height, index = hit.index, reason, "invalid ethereum tx");
            return Ok(None);
        }

        let tx = if hit.result.is_ok() { None } else { Some(self.decoder().decode_tx(&hit.tx)?) };
        Ok(Some(parse_tx_indexer_result(&hit, tx.as_ref(), getter)?))
    }

    /// `eth_getTransactionByHash`.
    ///
    /// Transactions missing from the index are looked up in the mempool and
    /// returned without block position.
    pub async fn get_transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, RpcError> {
        let res = match self.get_tx_by_eth_hash(hash).await {
            Ok(Some(res)) => res,
            Ok(None) => return self.pending_transaction_by_hash(hash).await,
            Err(err) => {
                debug!(%hash, error = %err, "tx lookup failed, trying mempool");
                return self.pending_transaction_by_hash(hash).await;
            }
        };

        let Some(block) = self.block_by_number(res.height).await? else {
            debug!(%hash, height = res.height, "block not found");
            return Ok(None);
        };
        let msg = self.eth_msg_at(&block, &res)?;
        let Some(results) = self.block_results(res.height).await? else {
            debug!(%hash, height = res.height, "block result not found");
            return Ok(None);
        };
        let index = self.resolve_eth_tx_index(&block, &results, &res, &hash)?;
        let base_fee = self.base_fee(res.height).await;

        Ok(Some(rpc_tx_from_msg(
            &msg,
            block.hash(),
            res.height,
            u64::from(index),
            base_fee,
            self.chain_id(),
        )))
    }

    /// Looks up an Ethereum transaction among the unconfirmed transactions.
    pub async fn pending_transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, RpcError> {
        let txs = self.client().unconfirmed_txs().await?;
        for raw in txs {
            let tx = match self.decoder().decode_tx(&raw) {
                Ok(tx) => tx,
                Err(err) => {
                    debug!(error = %err, "failed to decode unconfirmed tx");
                    continue;
                }
            };
            if let Some(msg) = tx.ethereum_messages().find(|msg| msg.hash == hash) {
                return Ok(Some(rpc_tx_from_msg(msg, B256::ZERO, 0, 0, None, self.chain_id())));
            }
        }
        debug!(%hash, "tx not found");
        Ok(None)
    }

    /// `eth_getTransactionReceipt`.
    pub async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<RpcTransactionReceipt>, RpcError> {
        let res = match self.get_tx_by_eth_hash(hash).await {
            Ok(Some(res)) => res,
            Ok(None) => return Ok(None),
            Err(err) => {
                debug!(%hash, error = %err, "tx not found");
                return Ok(None);
            }
        };

        let Some(block) = self.block_by_number(res.height).await? else {
            debug!(%hash, height = res.height, "block not found");
            return Ok(None);
        };
        let msg = self.eth_msg_at(&block, &res)?;
        let Some(results) = self.block_results(res.height).await? else {
            debug!(%hash, height = res.height, "block result not found");
            return Ok(None);
        };
        let index = self.resolve_eth_tx_index(&block, &results, &res, &hash)?;
        let base_fee = self.base_fee(res.height).await;

        Ok(Some(build_receipt(&msg, &res, index, block.hash(), &results, base_fee)))
    }

    /// `eth_getTransactionByBlockHashAndIndex`.
    pub async fn get_transaction_by_block_hash_and_index(
        &self,
        hash: B256,
        index: u64,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        let Some(block) = self.block_by_hash(hash).await? else {
            debug!(%hash, "block not found");
            return Ok(None);
        };
        self.tx_by_block_and_index(&block, index).await
    }

    /// `eth_getTransactionByBlockNumberAndIndex`.
    pub async fn get_transaction_by_block_number_and_index(
        &self,
        number: BlockNumberOrTag,
        index: u64,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        let height = self.resolve_block_number(&number).await?;
        let Some(block) = self.block_by_number(height).await? else {
            debug!(height, "block not found");
            return Ok(None);
        };
        self.tx_by_block_and_index(&block, index).await
    }

    async fn tx_by_block_and_index(
        &self,
        block: &NativeBlock,
        index: u64,
    ) -> Result<Option<RpcTransaction>, RpcError> {
        let height = block.height();
        let Some(results) = self.block_results(height).await? else {
            debug!(height, "block result not found");
            return Ok(None);
        };
        let Ok(eth_index) = u32::try_from(index) else {
            return Ok(None);
        };

        let indexed = self.get_tx_by_tx_index(height, eth_index).await.unwrap_or_else(|err| {
            debug!(height, index, error = %err, "tx index lookup failed, scanning block");
            None
        });
        let msg = match indexed {
            Some(res) => self.eth_msg_at(block, &res)?,
            None => {
                let msgs = self.eth_msgs_from_block(block, &results)?;
                let Some(msg) = msgs.into_iter().nth(eth_index as usize) else {
                    debug!(height, index, "block txs index out of bound");
                    return Ok(None);
                };
                msg
            }
        };
        let base_fee = self.base_fee(height).await;

        Ok(Some(rpc_tx_from_msg(&msg, block.hash(), height, index, base_fee, self.chain_id())))
    }

    fn eth_msg_at(&self, block: &NativeBlock, res: &TxResult) -> Result<MsgEthereumTx, RpcError> {
        let raw = block.txs.get(res.tx_index as usize).ok_or(TranslateError::MessageNotFound {
            height: res.height,
            index: res.tx_index,
        })?;
        let tx = self.decoder().decode_tx(raw)?;
        let msg = tx
            .ethereum_message(res.msg_index as usize)
            .ok_or(TranslateError::UnexpectedMessage(res.msg_index as usize))?;
        Ok(msg.clone())
    }

    /// Block-level Ethereum index of a record, rescanning the block when the
    /// record was indexed before its committed event was seen.
    fn resolve_eth_tx_index(
        &self,
        block: &NativeBlock,
        results: &NativeBlockResult,
        res: &TxResult,
        hash: &B256,
    ) -> Result<u32, RpcError> {
        if let Some(index) = res.eth_tx_index {
            return Ok(index);
        }
        let msgs = self.eth_msgs_from_block(block, results)?;
        find_eth_tx_index(&msgs, hash).ok_or_else(|| {
            debug!(%hash, height = res.height, "can't find index of ethereum tx");
            RpcError::TxIndexNotFound
        })
    }
}

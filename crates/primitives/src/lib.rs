//! Native chain data model and Ethereum message types for evmgate.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/evmgate/evmgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub use alloy_primitives::{Address, B256, Bloom, Bytes, U256};

mod block;
pub use block::{BlockParams, ConsensusParams, NativeBlock, NativeBlockResult, NativeHeader};

mod event;
pub use event::{
    AbciEvent, EventAttribute, EventData, EventDataNewBlockHeader, EventDataTx, NativeEvent,
    event_types,
};

mod result;
pub use result::{NativeTxResult, TxExecResult, TxResult, codes};

mod tx;
pub use tx::{
    AccessListTx, DecodeError, DecodedTx, DynamicFeeTx, JsonTxCodec, LegacyTx, MsgEthereumTx,
    TxData, TxDecoder, TxMessage, TxType,
};

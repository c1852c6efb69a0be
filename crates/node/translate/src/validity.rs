//! Classification of native execution results.

use evmgate_primitives::{ConsensusParams, NativeBlockResult, TxExecResult, codes};

const BLOCK_GAS_LIMIT_EXCEEDED: &str = "out of gas in location: block gas meter; gasWanted:";
const STATE_DB_COMMIT_FAILED: &str = "failed to commit stateDB";
const NO_BLOCK_GAS_LEFT: &str = "no block gas left to run tx: out of gas";

/// Returns true if the transaction ran out of block gas.
pub fn tx_exceeds_block_gas_limit(res: &TxExecResult) -> bool {
    res.log.contains(BLOCK_GAS_LIMIT_EXCEEDED)
}

/// Returns true if the transaction failed while committing EVM state.
pub fn tx_state_db_commit_error(res: &TxExecResult) -> bool {
    res.log.contains(STATE_DB_COMMIT_FAILED)
}

/// Decides whether a native transaction is visible to Ethereum clients.
///
/// Successful transactions are visible, and so are the two failure modes in
/// which the EVM already consumed gas: exceeding the block gas limit and a
/// failed state commit. Returns the reason alongside the verdict.
pub fn tx_is_valid_enough(res: &TxExecResult) -> (bool, &'static str) {
    if res.code == codes::OK {
        (true, "tx succeeded")
    } else if tx_exceeds_block_gas_limit(res) {
        (true, "tx exceeded block gas limit")
    } else if tx_state_db_commit_error(res) {
        (true, "tx state db commit error")
    } else {
        (false, "unexpected failure")
    }
}

/// Returns true if the result's gas used must not be counted.
///
/// Once one transaction reports that no block gas is left, every later
/// transaction of the block failed the same way.
pub fn should_ignore_gas_used(res: &TxExecResult) -> bool {
    res.code == codes::OUT_OF_GAS && res.log.contains(NO_BLOCK_GAS_LEFT)
}

/// Sums gas used over a block, stopping at the first ignored result.
pub fn block_gas_used(results: &NativeBlockResult) -> u64 {
    results
        .txs_results
        .iter()
        .take_while(|res| !should_ignore_gas_used(res))
        .map(|res| res.gas_used)
        .sum()
}

/// Gas limit reported for unlimited blocks, kept within 53 bits for JS tooling.
pub const DEFAULT_GAS_LIMIT: u64 = u32::MAX as u64;

/// Converts consensus parameters to an Ethereum gas limit.
pub fn block_gas_limit(params: Option<&ConsensusParams>) -> u64 {
    match params {
        Some(params) if params.block.max_gas >= 0 => params.block.max_gas as u64,
        _ => DEFAULT_GAS_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use evmgate_primitives::BlockParams;

    use super::*;

    fn result(code: u32, log: &str, gas_used: u64) -> TxExecResult {
        TxExecResult { code, log: log.into(), gas_used, ..Default::default() }
    }

    #[test]
    fn valid_enough_classification() {
        assert!(tx_is_valid_enough(&result(0, "", 0)).0);
        assert_eq!(
            tx_is_valid_enough(&result(
                11,
                "out of gas in location: block gas meter; gasWanted: 100, gasUsed: 200",
                0
            )),
            (true, "tx exceeded block gas limit")
        );
        assert!(tx_is_valid_enough(&result(5, "failed to commit stateDB: boom", 0)).0);
        assert_eq!(tx_is_valid_enough(&result(5, "insufficient funds", 0)), (false, "unexpected failure"));
    }

    #[test]
    fn ignored_gas_stops_block_summation() {
        let results = NativeBlockResult {
            txs_results: vec![
                result(0, "", 10),
                result(0, "", 20),
                result(11, "no block gas left to run tx: out of gas", 99),
                result(0, "", 40),
            ],
            ..Default::default()
        };
        assert_eq!(block_gas_used(&results), 30);
        assert!(!should_ignore_gas_used(&result(11, "other", 0)));
    }

    #[test]
    fn gas_limit_from_consensus_params() {
        let limited = ConsensusParams { block: BlockParams { max_gas: 30_000_000, max_bytes: 1 } };
        assert_eq!(block_gas_limit(Some(&limited)), 30_000_000);
        assert_eq!(block_gas_limit(Some(&ConsensusParams::default())), DEFAULT_GAS_LIMIT);
        assert_eq!(block_gas_limit(None), 4_294_967_295);
    }
}

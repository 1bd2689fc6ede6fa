use crate::{
    gas::{percentile, GasConfigError, GasStrategy, GasTarget, Multiplier},
    logging::CycleLog,
    rpc::{with_retries, BlockRef, BlockTag, ChainRpc, RetryConfig},
    telemetry,
};
use tokio::time::Instant;

/// Resolves the gas target for one provider's transactions in a cycle.
///
/// Strategies run in configured order. The first to produce a price wins. A constant price is
/// always reachable: construction rejects lists without one, and once `deadline` passes every
/// remaining RPC strategy is skipped in favour of it.
#[derive(Debug, Clone)]
pub struct GasPriceOracle {
    chain_id: u64,
    strategies: Vec<GasStrategy>,
    constant_price: u128,
    gas_limit: u64,
    retry: RetryConfig,
}

impl GasPriceOracle {
    /// Builds an oracle from a chain's configured strategy list.
    ///
    /// # Errors
    ///
    /// Returns [`GasConfigError::MissingConstant`] if no constant strategy is configured, or the
    /// first strategy that fails validation.
    pub fn new(
        chain_id: u64,
        strategies: Vec<GasStrategy>,
        gas_limit: u64,
        retry: RetryConfig,
    ) -> Result<Self, GasConfigError> {
        for strategy in &strategies {
            strategy.validate()?;
        }

        let constant_price = strategies
            .iter()
            .find_map(|strategy| match strategy {
                GasStrategy::Constant { gas_price } => Some(gas_price.to_wei()),
                _ => None,
            })
            .ok_or(GasConfigError::MissingConstant(chain_id))??;

        Ok(Self { chain_id, strategies, constant_price, gas_limit, retry })
    }

    #[must_use]
    pub fn strategies(&self) -> &[GasStrategy] {
        &self.strategies
    }

    /// Produces a gas target. Never fails.
    ///
    /// One log entry is written per strategy attempted, plus one when the deadline forces the
    /// constant fallback.
    pub async fn resolve(&self, rpc: &dyn ChainRpc, deadline: Instant, log: &mut CycleLog) -> GasTarget {
        for strategy in &self.strategies {
            if Instant::now() >= deadline {
                log.warn(format!(
                    "Gas price oracle deadline exceeded on chain:{}, falling back to constant gas price",
                    self.chain_id
                ));
                break;
            }

            let name = strategy.name();
            match self.attempt(strategy, rpc, deadline).await {
                Ok(target) => {
                    telemetry::record_gas_strategy(self.chain_id, name, true);
                    log.info(format!("Gas price set using strategy:{name} ({target})"));
                    return target;
                }
                Err(reason) => {
                    telemetry::record_gas_strategy(self.chain_id, name, false);
                    log.warn(format!("Gas price strategy:{name} failed: {reason}"));
                }
            }
        }

        self.constant()
    }

    fn constant(&self) -> GasTarget {
        GasTarget::Legacy { gas_price: self.constant_price, gas_limit: self.gas_limit }
    }

    async fn attempt(
        &self,
        strategy: &GasStrategy,
        rpc: &dyn ChainRpc,
        deadline: Instant,
    ) -> Result<GasTarget, String> {
        match strategy {
            GasStrategy::Constant { .. } => Ok(self.constant()),
            GasStrategy::ProviderRecommended { multiplier } => {
                self.provider_recommended(*multiplier, rpc, deadline).await
            }
            GasStrategy::ProviderRecommendedEip1559 { base_fee_multiplier, priority_fee } => {
                let priority_fee = priority_fee.to_wei().map_err(|e| e.to_string())?;
                self.provider_recommended_eip1559(*base_fee_multiplier, priority_fee, rpc, deadline)
                    .await
            }
            GasStrategy::LatestBlockPercentile {
                percentile,
                min_transaction_count,
                past_to_compare_in_blocks,
                max_deviation_multiplier,
            } => {
                self.latest_block_percentile(
                    *percentile,
                    *min_transaction_count,
                    *past_to_compare_in_blocks,
                    *max_deviation_multiplier,
                    rpc,
                    deadline,
                )
                .await
            }
        }
    }

    async fn provider_recommended(
        &self,
        multiplier: Multiplier,
        rpc: &dyn ChainRpc,
        deadline: Instant,
    ) -> Result<GasTarget, String> {
        let price = with_retries(&self.retry, Some(deadline), || rpc.gas_price())
            .await
            .map_err(|e| format!("unable to get gas price: {e}"))?;

        Ok(GasTarget::Legacy { gas_price: multiplier.apply(price), gas_limit: self.gas_limit })
    }

    async fn provider_recommended_eip1559(
        &self,
        base_fee_multiplier: Multiplier,
        priority_fee: u128,
        rpc: &dyn ChainRpc,
        deadline: Instant,
    ) -> Result<GasTarget, String> {
        let block = self.fetch_block(rpc, BlockRef::Tag(BlockTag::Latest), deadline).await?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| format!("block {} has no base fee", block.number))?;

        Ok(GasTarget::Eip1559 {
            max_priority_fee_per_gas: priority_fee,
            max_fee_per_gas: base_fee_multiplier.apply(base_fee).saturating_add(priority_fee),
            gas_limit: self.gas_limit,
        })
    }

    async fn latest_block_percentile(
        &self,
        percentile: u8,
        min_transaction_count: usize,
        past_to_compare_in_blocks: u64,
        max_deviation_multiplier: Multiplier,
        rpc: &dyn ChainRpc,
        deadline: Instant,
    ) -> Result<GasTarget, String> {
        let latest = self.fetch_block(rpc, BlockRef::Tag(BlockTag::Latest), deadline).await?;
        let reference_number = latest.number.saturating_sub(past_to_compare_in_blocks);
        let reference = self.fetch_block(rpc, BlockRef::Number(reference_number), deadline).await?;

        let block_percentile = |block: &crate::rpc::Block| -> Result<u128, String> {
            let prices: Vec<u128> = block
                .transactions
                .iter()
                .filter_map(|tx| tx.effective_price(block.base_fee_per_gas))
                .collect();
            if prices.len() < min_transaction_count {
                return Err(format!(
                    "block {} has {} priced transactions, at least {} required",
                    block.number,
                    prices.len(),
                    min_transaction_count
                ));
            }
            percentile::percentile_price(prices, percentile)
                .ok_or_else(|| format!("block {} has no priced transactions", block.number))
        };

        let latest_price = block_percentile(&latest)?;
        let reference_price = block_percentile(&reference)?;

        if !percentile::within_limit(latest_price, reference_price, max_deviation_multiplier) {
            return Err(format!(
                "percentile price {latest_price} of block {} deviates more than {max_deviation_multiplier}x from {reference_price} of block {}",
                latest.number, reference.number
            ));
        }

        Ok(GasTarget::Legacy { gas_price: latest_price, gas_limit: self.gas_limit })
    }

    async fn fetch_block(
        &self,
        rpc: &dyn ChainRpc,
        block: BlockRef,
        deadline: Instant,
    ) -> Result<crate::rpc::Block, String> {
        with_retries(&self.retry, Some(deadline), || rpc.block_with_transactions(block))
            .await
            .map_err(|e| format!("unable to get block {block}: {e}"))?
            .ok_or_else(|| format!("block {block} not found"))
    }
}

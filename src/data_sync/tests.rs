/// Integration tests for the data synchronization layer
///
/// These run the aggregator and the synchronizer against an in-memory chain
/// that answers Multicall3 `aggregate` requests block by block.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::data_sync::codec::ISmardexPair;
    use crate::data_sync::mock_chain::{MockChain, sample_state};
    use crate::logic::pools::{CurveKind, VenueIdentity};
    use crate::sync_error::SyncError;
    use alloy_primitives::{Address, U256};
    use alloy_sol_types::SolCall;
    use std::sync::Arc;

    fn deploy(chain: &MockChain, count: u8, block: u64) -> Vec<VenueIdentity> {
        (0..count)
            .map(|idx| {
                let venue = chain.add_venue(Address::repeat_byte(0x10 + idx), Address::repeat_byte(0xa0));
                chain.set_state(venue.address, block, sample_state(idx as u64));
                venue
            })
            .collect()
    }

    fn reserves_calls(venues: &[VenueIdentity]) -> Vec<BatchedCall> {
        venues.iter().map(|venue| BatchedCall::new(venue.address, &ISmardexPair::getReservesCall {})).collect()
    }

    #[tokio::test]
    async fn test_aggregate_preserves_order() {
        for count in [1u8, 3, 10] {
            let chain = Arc::new(MockChain::new(50));
            let venues = deploy(&chain, count, 50);
            let aggregator = Aggregator::new(chain.clone(), chain.multicall_address(), 100);

            let answer = aggregator.aggregate(&reserves_calls(&venues), BlockTag::Number(50)).await.unwrap();
            assert_eq!(answer.block_number, 50);
            assert_eq!(answer.results.len(), count as usize);

            for (idx, result) in answer.results.iter().enumerate() {
                let reserves = ISmardexPair::getReservesCall::abi_decode_returns(result).unwrap();
                assert_eq!(reserves.reserve0_, sample_state(idx as u64).reserve0);
            }
            assert_eq!(chain.round_trips(), 1);
        }
    }

    #[tokio::test]
    async fn test_aggregate_chunks_at_one_block() {
        let chain = Arc::new(MockChain::new(50));
        let venues = deploy(&chain, 10, 50);
        let aggregator = Aggregator::new(chain.clone(), chain.multicall_address(), 4);

        let answer = aggregator.aggregate(&reserves_calls(&venues), BlockTag::Latest).await.unwrap();
        assert_eq!(answer.block_number, 50);
        assert_eq!(answer.results.len(), 10);
        assert_eq!(chain.round_trips(), 3);
        assert_eq!(aggregator.stats().round_trips(), 3);
        assert_eq!(aggregator.stats().calls(), 10);

        let last = ISmardexPair::getReservesCall::abi_decode_returns(&answer.results[9]).unwrap();
        assert_eq!(last.reserve0_, sample_state(9).reserve0);
    }

    #[tokio::test]
    async fn test_aggregate_is_all_or_nothing() {
        let chain = Arc::new(MockChain::new(50));
        let venues = deploy(&chain, 10, 50);
        let aggregator = Aggregator::new(chain.clone(), chain.multicall_address(), 4);
        let calls = reserves_calls(&venues);

        assert!(aggregator.aggregate(&calls, BlockTag::Number(50)).await.is_ok());

        chain.fail_next_calls(1);
        let failed = aggregator.aggregate(&calls, BlockTag::Number(50)).await;
        assert!(matches!(failed, Err(SyncError::Transport(_))));
        assert!(failed.unwrap_err().is_transient());

        chain.truncate_next_answers(1);
        let truncated = aggregator.aggregate(&calls, BlockTag::Number(50)).await;
        assert!(matches!(truncated, Err(SyncError::ResultCountMismatch { expected: 4, got: 3 })));
        assert_eq!(aggregator.stats().failures(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_reverts_on_missing_state() {
        let chain = Arc::new(MockChain::new(50));
        let venues = deploy(&chain, 3, 50);
        let aggregator = Aggregator::new(chain.clone(), chain.multicall_address(), 100);

        // nothing deployed before block 50
        let result = aggregator.aggregate(&reserves_calls(&venues), BlockTag::Number(49)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sync_log_matches_bootstrap() {
        let chain = Arc::new(MockChain::new(201));
        let venue = chain.add_venue(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        chain.set_state(venue.address, 200, sample_state(1));

        // block 201 moves reserves and, silently, price average and fees
        let mut next = sample_state(7);
        next.fees_lp = U256::from(1_000);
        chain.set_state(venue.address, 201, next.clone());

        let aggregator = Arc::new(Aggregator::new(chain.clone(), chain.multicall_address(), 100));
        let synchronizer = Synchronizer::new(venue, CurveKind::FictiveReserve, aggregator, 16);

        let prior = synchronizer.ensure_state(200).await.unwrap();
        let log = MockChain::sync_log(201, venue.address, &next);

        let incremental = synchronizer.process_log(&prior, &log).await.unwrap().unwrap();
        let (_, bootstrapped) = synchronizer.generate_state(BlockTag::Number(201)).await.unwrap();
        assert_eq!(incremental, bootstrapped);
        assert_eq!(incremental, next);
        assert_eq!(prior, sample_state(1));
    }

    #[tokio::test]
    async fn test_sync_log_price_averages_come_from_payload() {
        let chain = Arc::new(MockChain::new(201));
        let venue = chain.add_venue(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        let end_of_block = sample_state(7);
        chain.set_state(venue.address, 201, end_of_block.clone());

        // an earlier swap in the same block left other averages behind
        let mut emitted = sample_state(5);
        emitted.price_average0 = U256::from(123_456_789u64);
        emitted.price_average1 = U256::from(987_654_321u64);

        let aggregator = Arc::new(Aggregator::new(chain.clone(), chain.multicall_address(), 100));
        let synchronizer = Synchronizer::new(venue, CurveKind::FictiveReserve, aggregator, 16);
        let log = MockChain::sync_log(201, venue.address, &emitted);
        let next = synchronizer.process_log(&sample_state(1), &log).await.unwrap().unwrap();

        assert_eq!(next.reserves(), emitted.reserves());
        assert_eq!(next.fictive_reserves(), emitted.fictive_reserves());
        assert_eq!(next.price_average0, emitted.price_average0);
        assert_eq!(next.price_average1, emitted.price_average1);
        assert_eq!(next.price_average_last_timestamp, end_of_block.price_average_last_timestamp);
        assert_eq!(next.fees_lp, end_of_block.fees_lp);
        assert_eq!(next.fees_pool, end_of_block.fees_pool);
    }

    #[tokio::test]
    async fn test_apply_logs_in_order() {
        let chain = Arc::new(MockChain::new(301));
        let venue = chain.add_venue(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        chain.set_state(venue.address, 300, sample_state(1));
        let mut end_of_block = sample_state(2);
        end_of_block.fees_lp = U256::from(450);
        end_of_block.fees_pool = U256::from(50);
        chain.set_state(venue.address, 301, end_of_block.clone());

        let aggregator = Arc::new(Aggregator::new(chain.clone(), chain.multicall_address(), 100));
        let synchronizer = Synchronizer::new(venue, CurveKind::FictiveReserve, aggregator, 16);
        synchronizer.ensure_state(300).await.unwrap();

        let logs = vec![
            MockChain::sync_log(301, venue.address, &sample_state(2)),
            MockChain::fees_changed_log(301, venue.address, 450, 50),
            MockChain::fees_changed_log(302, venue.address, 1, 1),
        ];
        let applied = synchronizer.apply_logs(301, &logs).await.unwrap();

        assert_eq!(applied, Some(end_of_block.clone()));
        assert_eq!(synchronizer.get_state(301), Some(end_of_block));
        assert_eq!(synchronizer.get_state(302), None);
        assert_eq!(synchronizer.phase(), SyncPhase::Live);
    }

    #[tokio::test]
    async fn test_sync_log_without_prior_bootstraps_reserves() {
        let chain = Arc::new(MockChain::new(11));
        let venue = chain.add_venue(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        chain.set_state(venue.address, 11, sample_state(4));

        let aggregator = Arc::new(Aggregator::new(chain.clone(), chain.multicall_address(), 100));
        let synchronizer = Synchronizer::new(venue, CurveKind::FictiveReserve, aggregator, 16);

        let log = MockChain::sync_log(11, venue.address, &sample_state(4));
        assert_eq!(synchronizer.apply_logs(11, &[log]).await.unwrap(), Some(sample_state(4)));
    }

    #[tokio::test]
    async fn test_multicall_address_is_used() {
        let chain = Arc::new(MockChain::new(50));
        let venues = deploy(&chain, 1, 50);
        let aggregator = Aggregator::new(chain.clone(), Address::repeat_byte(0x01), 100);

        assert_eq!(aggregator.multicall_address(), Address::repeat_byte(0x01));
        assert!(aggregator.aggregate(&reserves_calls(&venues), BlockTag::Number(50)).await.is_err());
    }
}

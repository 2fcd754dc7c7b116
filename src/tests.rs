#[cfg(test)]
mod tests {
    use {
        crate::{
            aggregator::{secondary_delta, MintAggregator},
            events::MintEvent,
        },
        alloy::primitives::{Address, B256, U256, U512},
        serde_json::json,
    };

    /// Test the full path of one event through the aggregator
    #[test]
    fn test_event_flows_into_aggregate() {
        let user = Address::repeat_byte(0xaa);
        let event = MintEvent {
            user,
            amount: U256::from(500u64),
            cycle_id: 3,
            block_number: 21_100_000,
            tx_hash: B256::repeat_byte(0x11),
            log_index: 7,
        };

        let mut aggregator = MintAggregator::new();
        aggregator.apply(event.user, event.amount, event.cycle_id);

        let entry = aggregator.get(&user).unwrap();
        assert_eq!(entry.primary_amount, U512::from(500u64));
        // Cycle 3 converts at 0.92: floor(500 * 100 / 92) = 543
        assert_eq!(entry.secondary_amount, U512::from(543u64));
    }

    /// Test event id formatting (transaction hash + log index)
    #[test]
    fn test_event_id_format() {
        let event = MintEvent {
            user: Address::repeat_byte(0x01),
            amount: U256::from(1u64),
            cycle_id: 1,
            block_number: 1,
            tx_hash: B256::repeat_byte(0xab),
            log_index: 42,
        };

        assert_eq!(
            event.event_id(),
            "0xabababababababababababababababababababababababababababababababab-42"
        );
    }

    /// Test the serialized snapshot shape (camelCase keys, decimal strings)
    #[test]
    fn test_snapshot_json_shape() {
        let user = Address::repeat_byte(0x02);
        let mut aggregator = MintAggregator::new();
        aggregator.apply(user, U256::from(1000u64), 1);

        let snapshot = aggregator.snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();

        let entry = &value[0];
        assert_eq!(entry["user"], json!(user.to_string()));
        assert_eq!(entry["primaryAmount"], json!("1000"));
        assert_eq!(entry["secondaryAmount"], json!("1000"));
    }

    /// Test that the secondary delta survives amounts beyond u64
    #[test]
    fn test_secondary_delta_large_amount() {
        // 10^30 at cycle 14 (factor 0.48): amount * 100 / 48
        let amount = U256::from(10u64).pow(U256::from(30u64));
        let delta = secondary_delta(amount, 14);

        let expected = U512::from(amount) * U512::from(100u64) / U512::from(48u64);
        assert_eq!(delta, expected);
    }
}

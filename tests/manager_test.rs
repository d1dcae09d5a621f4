//! Manager behavior against scripted providers and a fixed-balance bridge.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use fundrouter::mocks::{mock_quote, MockEvm, MockProvider};
use fundrouter::{ManagerError, ProviderRegistry, RoutingHint, SwapManager, SwapStatus};
use fundrouter_providers::EvmBridge;

const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

fn manager_with(
	providers: Vec<Arc<MockProvider>>,
	evm: Arc<MockEvm>,
) -> (SwapManager, Vec<Arc<MockProvider>>) {
	let mut registry = ProviderRegistry::new();
	for provider in &providers {
		registry.register(provider.clone());
	}
	let evm_dyn: Arc<dyn EvmBridge> = evm;
	(SwapManager::new(registry, evm_dyn, QUOTE_TIMEOUT), providers)
}

fn funded_evm() -> Arc<MockEvm> {
	Arc::new(MockEvm::new(&[("avalanche", 100_000_000), ("base", 100_000_000)]))
}

fn test_signer() -> PrivateKeySigner {
	"0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
		.parse()
		.unwrap()
}

#[tokio::test]
async fn selects_largest_raw_output_across_providers() {
	let (manager, _providers) = manager_with(
		vec![
			Arc::new(MockProvider::new("a", "dex", vec![mock_quote("a", "base", 100)])),
			Arc::new(MockProvider::new("b", "dex", vec![mock_quote("b", "base", 250)])),
			Arc::new(MockProvider::new("c", "private", vec![mock_quote("c", "base", 180)])),
		],
		funded_evm(),
	);

	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap();

	assert_eq!(best.provider, "b");
	assert_eq!(best.expected_output_raw, alloy::primitives::U256::from(250u64));
}

#[tokio::test]
async fn equal_outputs_keep_registration_order() {
	let (manager, _providers) = manager_with(
		vec![
			Arc::new(MockProvider::new("first", "dex", vec![mock_quote("first", "base", 100)])),
			Arc::new(MockProvider::new("second", "dex", vec![mock_quote("second", "base", 100)])),
		],
		funded_evm(),
	);

	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap();
	assert_eq!(best.provider, "first");
}

#[tokio::test]
async fn failing_provider_does_not_sink_the_call() {
	let (manager, _providers) = manager_with(
		vec![
			Arc::new(MockProvider::failing("broken", "dex")),
			Arc::new(MockProvider::new("ok", "dex", vec![mock_quote("ok", "base", 42)])),
		],
		funded_evm(),
	);

	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap();
	assert_eq!(best.provider, "ok");
}

#[tokio::test]
async fn unmatched_hint_errors_before_any_network_call() {
	let providers = vec![
		Arc::new(MockProvider::new("a", "dex", vec![mock_quote("a", "base", 1)])),
		Arc::new(MockProvider::new("b", "private", vec![mock_quote("b", "base", 2)])),
	];
	let (manager, providers) = manager_with(providers, funded_evm());

	let err = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::category("no-such-category"),
		)
		.await
		.unwrap_err();

	assert!(matches!(err, ManagerError::NoMatchingProviders { .. }));
	for provider in &providers {
		assert_eq!(provider.quote_call_count(), 0);
	}
}

#[tokio::test]
async fn provider_hint_narrows_to_exact_name() {
	let providers = vec![
		Arc::new(MockProvider::new("a", "dex", vec![mock_quote("a", "base", 500)])),
		Arc::new(MockProvider::new("b", "dex", vec![mock_quote("b", "base", 1)])),
	];
	let (manager, providers) = manager_with(providers, funded_evm());

	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::provider("b"),
		)
		.await
		.unwrap();

	assert_eq!(best.provider, "b");
	assert_eq!(providers[0].quote_call_count(), 0);
	assert_eq!(providers[1].quote_call_count(), 1);
}

#[tokio::test]
async fn xmr_category_is_opt_in_only() {
	let providers = vec![
		Arc::new(MockProvider::new("plain", "dex", vec![mock_quote("plain", "base", 1)])),
		Arc::new(MockProvider::new(
			"anon",
			"xmr-private",
			vec![mock_quote("anon", "base", 9_999)],
		)),
	];
	let (manager, providers) = manager_with(providers, funded_evm());

	// un-hinted routing never touches the xmr-private provider
	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap();
	assert_eq!(best.provider, "plain");
	assert_eq!(providers[1].quote_call_count(), 0);

	// an explicit category hint reaches it
	let best = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::category("xmr-private"),
		)
		.await
		.unwrap();
	assert_eq!(best.provider, "anon");
}

#[tokio::test]
async fn no_quotes_with_insufficient_balances_reports_them() {
	let evm = Arc::new(MockEvm::new(&[("avalanche", 1_000_000), ("base", 2_000_000)]));
	let (manager, _providers) = manager_with(
		vec![Arc::new(MockProvider::failing("a", "dex"))],
		evm,
	);

	let err = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap_err();

	match err {
		ManagerError::InsufficientBalance { required, balance_lines, .. } => {
			assert_eq!(required, 25.0);
			assert!(balance_lines.contains("Avalanche: 1.000000 USDC"));
			assert!(balance_lines.contains("Base: 2.000000 USDC"));
		},
		other => panic!("expected InsufficientBalance, got {other}"),
	}
}

#[tokio::test]
async fn no_quotes_with_sufficient_balance_is_a_plain_no_quotes_error() {
	let (manager, _providers) = manager_with(
		vec![Arc::new(MockProvider::failing("a", "dex"))],
		funded_evm(),
	);

	let err = manager
		.best_quote(
			&"BTC.BTC".parse().unwrap(),
			25.0,
			"bc1qdest",
			Address::ZERO,
			&RoutingHint::none(),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, ManagerError::NoQuotes { .. }));
}

#[tokio::test]
async fn execute_dispatches_to_owning_provider() {
	let providers = vec![
		Arc::new(MockProvider::new("a", "dex", vec![])),
		Arc::new(MockProvider::new("b", "dex", vec![])),
	];
	let (manager, providers) = manager_with(providers, funded_evm());

	let quote = mock_quote("b", "base", 10);
	let result = manager.execute_swap(&quote, &test_signer()).await.unwrap();
	assert_eq!(result.tx_hash, "0xmock-b");
	assert_eq!(providers[0].executed.lock().unwrap().len(), 0);
	assert_eq!(providers[1].executed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_provider_dispatch_is_an_error() {
	let (manager, _providers) =
		manager_with(vec![Arc::new(MockProvider::new("a", "dex", vec![]))], funded_evm());

	let quote = mock_quote("ghost", "base", 10);
	let err = manager.execute_swap(&quote, &test_signer()).await.unwrap_err();
	assert!(matches!(err, ManagerError::UnknownProvider { .. }));

	let err = manager
		.check_status("ghost", "0xhash", "")
		.await
		.unwrap_err();
	assert!(matches!(err, ManagerError::UnknownProvider { .. }));
}

#[tokio::test]
async fn status_dispatches_by_name() {
	let providers = vec![
		Arc::new(
			MockProvider::new("done", "dex", vec![]).with_status(SwapStatus::Completed),
		),
		Arc::new(MockProvider::new("slow", "dex", vec![])),
	];
	let (manager, _providers) = manager_with(providers, funded_evm());

	assert_eq!(
		manager.check_status("done", "0xhash", "").await.unwrap(),
		SwapStatus::Completed
	);
	assert_eq!(
		manager.check_status("slow", "0xhash", "").await.unwrap(),
		SwapStatus::Pending
	);
}

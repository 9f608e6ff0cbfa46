//! End-to-end flows through the protocol handle

use std::any::Any;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use proptest::prelude::*;

use crate::{
    clock::ManualClock,
    constants::MAX_BPS,
    health::MockHealthCheck,
    journal::LogType,
    settlement::Settlement,
    state::Protocol,
    strategy::{
        tests::{hold_strategy, strategist},
        AdapterContext, Binding, GaugeAdapter, Lifecycle, Strategy, StrategyAdapter,
        StrategySettings, TriggerReason,
    },
    utils::error::{VaultError, VaultResult},
    vault::{
        tests::{governance, vault_address, want},
        StrategyParams, VaultSettings, WithdrawAmount,
    },
};

const DAY: u64 = 86_400;

pub(crate) fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub(crate) fn stranger() -> Address {
    Address::repeat_byte(0xee)
}

pub(crate) fn venue() -> Address {
    Address::repeat_byte(0x99)
}

fn reward_token() -> Address {
    Address::repeat_byte(0x77)
}

fn health_check() -> Address {
    Address::repeat_byte(0x4c)
}

pub(crate) fn gauge_strategy(byte: u8) -> Strategy {
    let binding = Binding::new(Address::repeat_byte(byte), vault_address(), want());
    Strategy::new(
        StrategySettings::new(binding, strategist()),
        Box::new(GaugeAdapter::new("StrategyGauge", venue())),
    )
}

pub(crate) fn params(debt_ratio: u64) -> StrategyParams {
    let mut params = StrategyParams::default();
    params.debt_ratio(debt_ratio);
    params
}

pub(crate) struct Fixture {
    pub(crate) protocol: Protocol,
    pub(crate) clock: ManualClock,
}

impl Fixture {
    /// An empty vault with alice holding 1000 want
    pub(crate) fn new() -> Self {
        let clock = ManualClock::new(1_700_000_000);
        let mut settings = VaultSettings::new(vault_address(), want(), governance());
        settings.name("yvWANT").symbol("yvWANT");
        let mut protocol = Protocol::new(settings, Arc::new(clock.clone()));
        protocol
            .settlement_mut()
            .mint(want(), alice(), U256::from(1_000))
            .unwrap();
        Self { protocol, clock }
    }

    /// Alice deposited 100 and `strategy` was added with `debt_ratio`
    pub(crate) fn with_strategy(strategy: Strategy, debt_ratio: u64) -> (Self, Address) {
        let mut fixture = Self::new();
        fixture
            .protocol
            .deposit(alice(), U256::from(100), alice())
            .unwrap();
        let address = fixture.add(strategy, debt_ratio);
        (fixture, address)
    }

    /// Same as `with_strategy`, with the first harvest done
    pub(crate) fn invested(strategy: Strategy, debt_ratio: u64) -> (Self, Address) {
        let (mut fixture, address) = Self::with_strategy(strategy, debt_ratio);
        fixture.protocol.harvest(strategist(), address).unwrap();
        (fixture, address)
    }

    pub(crate) fn add(&mut self, strategy: Strategy, debt_ratio: u64) -> Address {
        let address = self
            .protocol
            .deploy_strategy(governance(), strategy)
            .unwrap();
        self.protocol
            .add_strategy(governance(), address, params(debt_ratio))
            .unwrap();
        address
    }

    fn want_of(&self, holder: Address) -> U256 {
        self.protocol.settlement().balance_of(want(), holder)
    }
}

#[test]
fn genesis_deposit_prices_shares_at_one() {
    let mut fixture = Fixture::new();
    let shares = fixture
        .protocol
        .deposit(alice(), U256::from(100), alice())
        .unwrap();

    assert_eq!(shares, U256::from(100));
    assert_eq!(fixture.protocol.total_assets(), U256::from(100));
    assert_eq!(
        fixture.protocol.price_per_share().unwrap(),
        U256::from(10).pow(U256::from(18))
    );
    assert_eq!(fixture.protocol.balance_of(alice()), U256::from(100));
}

#[test]
fn first_harvest_draws_the_full_credit() {
    let (fixture, strategy) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    let protocol = &fixture.protocol;

    assert_eq!(protocol.vault().total_debt(), U256::from(100));
    assert_eq!(protocol.vault().total_idle(), U256::ZERO);
    assert_eq!(protocol.total_assets(), U256::from(100));
    assert_eq!(protocol.estimated_total_assets(strategy).unwrap(), U256::from(100));
    // Credit went straight into the venue
    assert_eq!(fixture.want_of(strategy), U256::ZERO);
    assert_eq!(fixture.want_of(venue()), U256::from(100));
    assert_eq!(protocol.lifecycle(strategy).unwrap(), Lifecycle::Active);
}

#[test]
fn overdue_strategy_triggers_on_report_delay_alone() {
    let (mut fixture, strategy) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    assert_eq!(fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(), None);

    fixture
        .protocol
        .set_profit_factor(strategist(), strategy, u64::MAX)
        .unwrap();
    fixture
        .protocol
        .set_debt_threshold(strategist(), strategy, U256::MAX)
        .unwrap();
    fixture.clock.sleep(4 * DAY);

    assert_eq!(
        fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(),
        Some(TriggerReason::MaxReportDelay)
    );
}

#[test]
fn exiting_strategy_never_reinvests() {
    let (mut fixture, strategy) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    fixture
        .protocol
        .set_emergency_exit(strategist(), strategy)
        .unwrap();
    assert_eq!(fixture.protocol.vault().debt_ratio(), 0);
    assert_eq!(
        fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(),
        Some(TriggerReason::EmergencyExit)
    );

    let mut last_debt = fixture.protocol.vault().total_debt();
    let mut last_assets = fixture.protocol.estimated_total_assets(strategy).unwrap();
    for reward in [0u64, 3, 0] {
        fixture
            .protocol
            .settlement_mut()
            .accrue(venue(), want(), strategy, U256::from(reward));
        fixture.protocol.harvest(strategist(), strategy).unwrap();

        let debt = fixture.protocol.vault().total_debt();
        let assets = fixture.protocol.estimated_total_assets(strategy).unwrap();
        assert!(debt <= last_debt);
        assert!(assets <= last_assets.max(U256::from(reward)));
        assert_eq!(fixture.want_of(venue()), U256::ZERO);
        last_debt = debt;
        last_assets = assets;
    }

    assert_eq!(last_debt, U256::ZERO);
    assert_eq!(last_assets, U256::ZERO);
    assert_eq!(fixture.protocol.total_assets(), U256::from(103));
    assert_eq!(fixture.want_of(vault_address()), U256::from(103));
    assert_eq!(fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(), None);
    assert_eq!(fixture.protocol.lifecycle(strategy).unwrap(), Lifecycle::Idle);
}

#[test]
fn second_emergency_exit_is_an_invalid_transition() {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .set_emergency_exit(governance(), strategy)
        .unwrap();
    assert!(matches!(
        fixture.protocol.set_emergency_exit(governance(), strategy),
        Err(VaultError::InvalidTransition(_))
    ));
    assert!(matches!(
        fixture.protocol.tend(strategist(), strategy),
        Err(VaultError::InvalidTransition(_))
    ));
}

fn rejecting_health_check() -> Arc<MockHealthCheck> {
    let mut check = MockHealthCheck::new();
    check
        .expect_check()
        .returning(|profit, loss, _, _| Ok(!(profit.is_zero() && loss == U256::from(5))));
    Arc::new(check)
}

/// A hold strategy that lost 5 of its 100, gated by a check rejecting that loss
fn lossy_gated_fixture() -> (Fixture, Address) {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .register_health_check(governance(), health_check(), rejecting_health_check())
        .unwrap();
    fixture
        .protocol
        .set_health_check(governance(), strategy, Some(health_check()))
        .unwrap();
    fixture
        .protocol
        .settlement_mut()
        .transfer(want(), strategy, stranger(), U256::from(5))
        .unwrap();
    (fixture, strategy)
}

#[test]
fn rejected_health_check_leaves_the_ledger_untouched() {
    let (mut fixture, strategy) = lossy_gated_fixture();
    let before = fixture.protocol.vault().strategy(strategy).cloned();

    assert_eq!(
        fixture.protocol.harvest(strategist(), strategy),
        Err(VaultError::HealthCheckRejected)
    );
    assert_eq!(fixture.protocol.vault().total_debt(), U256::from(100));
    assert_eq!(fixture.protocol.total_assets(), U256::from(100));
    assert_eq!(fixture.protocol.vault().strategy(strategy).cloned(), before);

    let latest = fixture.protocol.journal().latest().unwrap();
    assert!(latest.has_errors());
    assert!(latest
        .entries
        .iter()
        .any(|entry| entry.log_type == LogType::HealthCheck));
}

#[test]
fn skipped_health_check_lets_one_harvest_through() {
    let (mut fixture, strategy) = lossy_gated_fixture();
    fixture
        .protocol
        .set_do_health_check(governance(), strategy, false)
        .unwrap();

    let report = fixture.protocol.harvest(strategist(), strategy).unwrap();
    assert_eq!(report.loss, U256::from(5));
    assert_eq!(fixture.protocol.vault().total_debt(), U256::from(95));
    assert!(fixture.protocol.strategy(strategy).unwrap().data.do_health_check);
}

#[test]
fn unknown_health_check_fails_closed() {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .set_health_check(governance(), strategy, Some(health_check()))
        .unwrap();
    assert_eq!(
        fixture.protocol.harvest(strategist(), strategy),
        Err(VaultError::HealthCheckRejected)
    );
}

#[test]
fn forced_trigger_fires_once() {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .set_force_harvest_trigger_once(governance(), strategy, true)
        .unwrap();
    assert_eq!(
        fixture.protocol.harvest_trigger(strategy, U256::MAX).unwrap(),
        Some(TriggerReason::Forced)
    );

    fixture.protocol.harvest(strategist(), strategy).unwrap();
    assert_eq!(fixture.protocol.harvest_trigger(strategy, U256::MAX).unwrap(), None);
}

#[test]
fn failed_harvest_still_consumes_the_forced_trigger() {
    let (mut fixture, strategy) = lossy_gated_fixture();
    fixture
        .protocol
        .set_force_harvest_trigger_once(governance(), strategy, true)
        .unwrap();

    assert!(fixture.protocol.harvest(stranger(), strategy).is_err());
    assert!(fixture.protocol.strategy(strategy).unwrap().data.force_harvest_trigger_once);

    assert!(fixture.protocol.harvest(strategist(), strategy).is_err());
    assert!(!fixture.protocol.strategy(strategy).unwrap().data.force_harvest_trigger_once);
}

#[test]
fn strategy_without_assets_never_triggers() {
    let mut fixture = Fixture::new();
    let strategy = fixture.add(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    assert_eq!(fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(), None);

    fixture.clock.sleep(4 * DAY);
    assert_eq!(fixture.protocol.harvest_trigger(strategy, U256::ZERO).unwrap(), None);
    // the allocation alone keeps it active
    assert!(fixture.protocol.is_active(strategy).unwrap());
    assert_eq!(fixture.protocol.lifecycle(strategy).unwrap(), Lifecycle::Active);
}

#[test]
fn withdrawal_losses_are_bounded_by_max_loss() {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .settlement_mut()
        .transfer(want(), strategy, stranger(), U256::from(10))
        .unwrap();

    assert!(matches!(
        fixture
            .protocol
            .withdraw(alice(), WithdrawAmount::All, alice(), None),
        Err(VaultError::SlippageExceeded(_))
    ));
    assert_eq!(fixture.protocol.balance_of(alice()), U256::from(100));
    assert_eq!(fixture.protocol.vault().total_debt(), U256::from(100));

    let paid = fixture
        .protocol
        .withdraw(alice(), WithdrawAmount::All, alice(), Some(MAX_BPS))
        .unwrap();
    assert_eq!(paid, U256::from(90));
    assert_eq!(fixture.want_of(alice()), U256::from(990));
    assert_eq!(fixture.protocol.balance_of(alice()), U256::ZERO);
    assert_eq!(fixture.protocol.vault().total_debt(), U256::ZERO);
    assert!(fixture.protocol.vault().strategy(strategy).unwrap().total_loss == U256::from(10));
}

#[test]
fn migration_moves_debt_and_rewards() {
    let (mut fixture, old) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    fixture
        .protocol
        .add_reward_token(governance(), old, reward_token())
        .unwrap();
    fixture
        .protocol
        .settlement_mut()
        .accrue(venue(), reward_token(), old, U256::from(7));
    let new = fixture
        .protocol
        .deploy_strategy(governance(), gauge_strategy(0x22))
        .unwrap();

    fixture
        .protocol
        .migrate_strategy(governance(), old, new)
        .unwrap();

    let protocol = &fixture.protocol;
    assert_eq!(fixture.want_of(new), U256::from(100));
    assert_eq!(protocol.settlement().balance_of(reward_token(), new), U256::from(7));
    assert_eq!(protocol.estimated_total_assets(old).unwrap(), U256::ZERO);
    assert_eq!(protocol.vault().withdrawal_queue(), &[new]);
    assert_eq!(protocol.vault().debt_ratio(), MAX_BPS);
    assert_eq!(protocol.vault().total_debt(), U256::from(100));

    let retired = protocol.vault().strategy(old).unwrap();
    assert_eq!((retired.debt_ratio, retired.total_debt), (0, U256::ZERO));
    let inherited = protocol.vault().strategy(new).unwrap();
    assert_eq!((inherited.debt_ratio, inherited.total_debt), (MAX_BPS, U256::from(100)));
    assert_eq!(protocol.lifecycle(old).unwrap(), Lifecycle::Migrated);

    assert!(fixture
        .protocol
        .add_strategy(governance(), old, params(0))
        .is_err());
    fixture.protocol.harvest(strategist(), new).unwrap();
    assert_eq!(fixture.want_of(venue()), U256::from(100));
}

#[test]
fn retired_strategy_is_never_reallocated() {
    let (mut fixture, old) = Fixture::invested(gauge_strategy(0x21), MAX_BPS / 2);
    let new = fixture
        .protocol
        .deploy_strategy(governance(), gauge_strategy(0x22))
        .unwrap();
    fixture
        .protocol
        .migrate_strategy(governance(), old, new)
        .unwrap();
    assert!(!fixture.protocol.is_active(old).unwrap());

    assert!(matches!(
        fixture
            .protocol
            .update_strategy_debt_ratio(governance(), old, MAX_BPS / 2),
        Err(VaultError::InvariantViolation(_))
    ));
    assert!(fixture.protocol.add_strategy_to_queue(governance(), old).is_err());
    assert!(fixture
        .protocol
        .set_withdrawal_queue(governance(), vec![new, old])
        .is_err());

    let protocol = &fixture.protocol;
    assert_eq!(protocol.vault().debt_ratio(), MAX_BPS / 2);
    assert_eq!(protocol.vault().withdrawal_queue(), &[new]);
    assert_eq!(protocol.credit_available(old).unwrap(), U256::ZERO);
    assert!(!protocol.is_active(old).unwrap());
    assert_eq!(protocol.lifecycle(old).unwrap(), Lifecycle::Migrated);
}

#[test]
fn migration_carries_unregistered_rewards() {
    let (mut fixture, old) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    let airdrop = Address::repeat_byte(0x78);
    fixture
        .protocol
        .settlement_mut()
        .accrue(venue(), airdrop, old, U256::from(7));
    let new = fixture
        .protocol
        .deploy_strategy(governance(), gauge_strategy(0x22))
        .unwrap();

    fixture
        .protocol
        .migrate_strategy(governance(), old, new)
        .unwrap();

    let settlement = fixture.protocol.settlement();
    assert_eq!(settlement.balance_of(airdrop, old), U256::ZERO);
    assert_eq!(settlement.balance_of(airdrop, new), U256::from(7));
    assert_eq!(fixture.want_of(new), U256::from(100));
}

#[test]
fn migration_cannot_cross_vaults() {
    let (mut fixture, old) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    let foreign = hold_strategy(0x23, Address::repeat_byte(0x01), want());
    let foreign = fixture
        .protocol
        .deploy_strategy(governance(), foreign)
        .unwrap();

    assert!(matches!(
        fixture.protocol.migrate_strategy(governance(), old, foreign),
        Err(VaultError::InvariantViolation(_))
    ));
    assert_eq!(fixture.protocol.vault().withdrawal_queue(), &[old]);
    assert_eq!(
        fixture.protocol.vault().strategy(old).unwrap().total_debt,
        U256::from(100)
    );
    assert!(fixture.protocol.halt_status().is_functional());
}

#[test]
fn setters_check_callers_and_zero_addresses() {
    let (mut fixture, strategy) = Fixture::with_strategy(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    let protocol = &mut fixture.protocol;

    assert_eq!(
        protocol.set_keeper(stranger(), strategy, stranger()),
        Err(VaultError::Unauthorized)
    );
    assert!(matches!(
        protocol.set_keeper(strategist(), strategy, Address::ZERO),
        Err(VaultError::InvariantViolation(_))
    ));
    assert!(matches!(
        protocol.set_rewards(strategist(), strategy, Address::ZERO),
        Err(VaultError::InvariantViolation(_))
    ));
    assert_eq!(
        protocol.set_rewards(governance(), strategy, stranger()),
        Err(VaultError::Unauthorized)
    );
    assert_eq!(
        protocol.set_trade_handler(governance(), strategy, stranger()),
        Err(VaultError::InvariantViolation("The strategy does not stake in a gauge.".to_string()))
    );
    assert_eq!(
        protocol.set_deposit_limit(strategist(), U256::ZERO),
        Err(VaultError::Unauthorized)
    );

    protocol.set_keeper(strategist(), strategy, stranger()).unwrap();
    assert_eq!(protocol.strategy(strategy).unwrap().settings.keeper, stranger());
}

#[test]
fn governance_handover_takes_two_steps() {
    let mut fixture = Fixture::new();
    let protocol = &mut fixture.protocol;
    protocol.set_governance(governance(), stranger()).unwrap();
    assert_eq!(protocol.vault().settings.governance, governance());
    assert_eq!(protocol.accept_governance(alice()), Err(VaultError::Unauthorized));

    protocol.accept_governance(stranger()).unwrap();
    assert_eq!(protocol.vault().settings.governance, stranger());
    assert_eq!(
        protocol.set_deposit_limit(governance(), U256::ZERO),
        Err(VaultError::Unauthorized)
    );
}

#[test]
fn anyone_deploys_but_only_governance_adds() {
    let mut fixture = Fixture::new();
    let strategy = fixture
        .protocol
        .deploy_strategy(stranger(), hold_strategy(0x21, vault_address(), want()))
        .unwrap();
    assert!(fixture.protocol.vault().strategy(strategy).is_none());
    assert!(fixture
        .protocol
        .deploy_strategy(governance(), hold_strategy(0x21, vault_address(), want()))
        .is_err());

    assert_eq!(
        fixture.protocol.add_strategy(stranger(), strategy, params(MAX_BPS)),
        Err(VaultError::Unauthorized)
    );
    fixture
        .protocol
        .add_strategy(governance(), strategy, params(MAX_BPS))
        .unwrap();
    assert_eq!(fixture.protocol.vault().withdrawal_queue(), &[strategy]);
}

#[test]
fn shutdown_returns_funds_and_closes_deposits() {
    let (mut fixture, strategy) = Fixture::invested(hold_strategy(0x21, vault_address(), want()), MAX_BPS);
    fixture
        .protocol
        .set_emergency_shutdown(governance(), true)
        .unwrap();
    assert_eq!(fixture.protocol.debt_outstanding(strategy).unwrap(), U256::from(100));
    assert!(fixture
        .protocol
        .deposit(alice(), U256::from(1), alice())
        .is_err());

    fixture.protocol.harvest(strategist(), strategy).unwrap();
    assert_eq!(fixture.protocol.vault().total_debt(), U256::ZERO);
    assert_eq!(fixture.protocol.vault().total_idle(), U256::from(100));
}

/// Reports a phantom position that never leaves the strategy
#[derive(Clone, Debug)]
struct PhantomAdapter;

impl StrategyAdapter for PhantomAdapter {
    fn name(&self) -> String {
        "StrategyPhantom".to_string()
    }

    fn estimated_total_assets(&self, _binding: &Binding, _settlement: &Settlement) -> U256 {
        U256::from(1)
    }

    fn adjust_position(&mut self, _ctx: &mut AdapterContext, _credit: U256, _debt: U256) -> VaultResult<()> {
        Ok(())
    }

    fn liquidate_position(&mut self, _ctx: &mut AdapterContext, amount_needed: U256) -> VaultResult<(U256, U256)> {
        Ok((U256::ZERO, amount_needed))
    }

    fn liquidate_all_positions(&mut self, _ctx: &mut AdapterContext) -> VaultResult<U256> {
        Ok(U256::ZERO)
    }

    fn prepare_migration(&mut self, _ctx: &mut AdapterContext, _new_strategy: Address) -> VaultResult<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn StrategyAdapter> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn incomplete_migration_reverts_and_halts() {
    let mut fixture = Fixture::new();
    let binding = Binding::new(Address::repeat_byte(0x21), vault_address(), want());
    let phantom = Strategy::new(
        StrategySettings::new(binding, strategist()),
        Box::new(PhantomAdapter),
    );
    let old = fixture.add(phantom, 5_000);
    let new = fixture
        .protocol
        .deploy_strategy(governance(), hold_strategy(0x22, vault_address(), want()))
        .unwrap();

    assert!(matches!(
        fixture.protocol.migrate_strategy(governance(), old, new),
        Err(VaultError::MigrationIncomplete(_))
    ));
    assert!(fixture.protocol.vault().strategy(new).is_none());
    assert_eq!(fixture.protocol.vault().withdrawal_queue(), &[old]);
    assert!(!fixture.protocol.halt_status().is_functional());

    assert!(matches!(
        fixture.protocol.deposit(alice(), U256::from(10), alice()),
        Err(VaultError::Halted(_))
    ));
    assert_eq!(fixture.protocol.resume(stranger()), Err(VaultError::Unauthorized));

    fixture.protocol.resume(governance()).unwrap();
    fixture
        .protocol
        .deposit(alice(), U256::from(10), alice())
        .unwrap();
    assert!(fixture
        .protocol
        .journal()
        .entries_of(LogType::Migration)
        .iter()
        .any(|entry| entry.entry.is_err()));
}

#[test]
fn queries_describe_vault_and_strategy() {
    let (fixture, strategy) = Fixture::invested(gauge_strategy(0x21), MAX_BPS);
    let vault = fixture.protocol.vault_query().unwrap();
    assert_eq!(vault.name, "yvWANT");
    assert_eq!(vault.total_debt, candid::Nat::from(100u64));
    assert_eq!(vault.withdrawal_queue, vec![strategy.to_string()]);

    let query = fixture.protocol.strategy_query(strategy).unwrap();
    assert_eq!(query.name, "StrategyGauge");
    assert_eq!(query.lifecycle, Lifecycle::Active);
    assert_eq!(query.record.unwrap().debt_ratio, MAX_BPS);
}

proptest! {
    #[test]
    fn ledger_totals_stay_consistent(
        ratios in prop::collection::vec(0u64..6_000, 1..5),
        skims in prop::collection::vec(0u64..40, 5),
        deposit in 1u64..1_000_000,
    ) {
        let mut fixture = Fixture::new();
        fixture
            .protocol
            .settlement_mut()
            .mint(want(), alice(), U256::from(deposit))
            .unwrap();
        fixture.protocol.deposit(alice(), U256::from(deposit), alice()).unwrap();

        let mut allocated = 0u64;
        for (i, ratio) in ratios.iter().enumerate() {
            let strategy = fixture
                .protocol
                .deploy_strategy(governance(), hold_strategy(0x30 + i as u8, vault_address(), want()))
                .unwrap();
            let added = fixture.protocol.add_strategy(governance(), strategy, params(*ratio));
            prop_assert_eq!(added.is_ok(), allocated + ratio <= MAX_BPS);
            if added.is_ok() {
                allocated += ratio;
            }
        }

        let queue = fixture.protocol.vault().withdrawal_queue().to_vec();
        for round in 0..2 {
            for (i, strategy) in queue.iter().enumerate() {
                if round == 1 {
                    let held = fixture.want_of(*strategy);
                    let skim = held * U256::from(skims[i]) / U256::from(100);
                    fixture
                        .protocol
                        .settlement_mut()
                        .transfer(want(), *strategy, stranger(), skim)
                        .unwrap();
                }
                fixture.protocol.harvest(strategist(), *strategy).unwrap();
            }
        }

        let vault = fixture.protocol.vault();
        let records: Vec<_> = vault.strategies().map(|(_, record)| record.clone()).collect();
        prop_assert!(vault.debt_ratio() <= MAX_BPS);
        prop_assert_eq!(vault.debt_ratio(), records.iter().map(|record| record.debt_ratio).sum::<u64>());
        prop_assert_eq!(
            vault.total_debt(),
            records.iter().fold(U256::ZERO, |sum, record| sum + record.total_debt)
        );
        prop_assert_eq!(fixture.want_of(vault_address()), vault.total_idle());
        prop_assert_eq!(vault.total_assets(), vault.total_idle() + vault.total_debt());
    }
}

use bazaar_interchange::{from_response, Money, ResourceRef};
use bazaar_process::processes::{booking, inquiry, purchase};
use bazaar_process::{
    apply_transition, check_totals, Channel, Description, ExecutorError, Lifecycle,
    ProcessRegistry, Role, State, Transaction, TransitionError, TransitionExecutor,
    TransitionOutcome, TransitionPlan,
};
use bazaar_store::{EntityStore, FieldAllowList, Strictness};
use serde_json::{json, Value};

fn registry() -> ProcessRegistry {
    ProcessRegistry::builtin().unwrap()
}

fn tx(process: &str, last: Option<&str>) -> Transaction {
    let tx = Transaction::new("tx-1", process);
    match last {
        Some(t) => tx.with_last_transition(t),
        None => tx,
    }
}

fn money(amount: i64) -> Value {
    json!({ "_sdkType": "Money", "amount": amount, "currency": "USD" })
}

fn transaction_response(last_transition: &str) -> Value {
    json!({
        "data": {
            "id": { "uuid": "tx-1" },
            "type": "transaction",
            "attributes": {
                "processName": "default-booking/release-1",
                "lastTransition": last_transition,
                "lastTransitionedAt": "2024-05-02T08:30:00.000Z",
                "transitions": [
                    { "transition": "transition/request", "createdAt": "2024-05-01T10:00:00.000Z", "by": "customer" },
                    { "transition": "transition/accept", "createdAt": "2024-05-01T12:00:00.000Z", "by": "provider" },
                    { "transition": "transition/confirm-payment", "createdAt": "2024-05-02T08:30:00.000Z", "by": "customer" }
                ],
                "lineItems": [
                    { "code": "line-item/night", "unitPrice": money(10000), "quantity": 2,
                      "lineTotal": money(20000), "includeFor": ["customer", "provider"], "reversal": false },
                    { "code": "line-item/provider-commission", "unitPrice": money(20000), "percentage": -10,
                      "lineTotal": money(-2000), "includeFor": ["provider"], "reversal": false }
                ],
                "payinTotal": money(20000),
                "payoutTotal": money(18000)
            },
            "relationships": {
                "listing": { "data": { "id": { "uuid": "l-1" }, "type": "listing" } },
                "customer": { "data": { "id": { "uuid": "u-1" }, "type": "user" } },
                "provider": { "data": { "id": { "uuid": "u-2" }, "type": "user" } }
            }
        },
        "included": [
            { "id": { "uuid": "l-1" }, "type": "listing", "attributes": { "title": "Cabin" } },
            { "id": { "uuid": "u-1" }, "type": "user", "attributes": { "displayName": "Ann" } },
            { "id": { "uuid": "u-2" }, "type": "user", "attributes": { "displayName": "Bo" } }
        ]
    })
}

#[test]
fn confirm_payment_state_and_completion() {
    let registry = registry();
    let def = registry.get(booking::NAME).unwrap();

    let paid = tx(booking::NAME, Some(booking::CONFIRM_PAYMENT));
    assert_eq!(def.get_state(&paid).unwrap(), State::Confirmed);
    assert!(!def.is_completed(&paid).unwrap());

    let received = tx(booking::NAME, Some(booking::MARK_RECEIVED));
    assert!(def.is_completed(&received).unwrap());
    let reviewed = tx(booking::NAME, Some(bazaar_process::processes::EXPIRE_REVIEW_PERIOD));
    assert!(def.is_completed(&reviewed).unwrap());
}

#[test]
fn has_passed_state_is_monotonic_along_main_path() {
    let registry = registry();
    let def = registry.get(booking::NAME).unwrap();
    let tx = tx(booking::NAME, Some(booking::CONFIRM_PAYMENT));

    assert!(def.has_passed_state(State::PendingPayment, &tx).unwrap());
    assert!(def.has_passed_state(State::Accepted, &tx).unwrap());
    assert!(!def.has_passed_state(State::Completed, &tx).unwrap());
}

#[test]
fn side_path_abandons_main_path() {
    let registry = registry();
    let def = registry.get(booking::NAME).unwrap();
    let canceled = tx(booking::NAME, Some(booking::CANCEL));

    assert!(!def.has_passed_state(State::Confirmed, &canceled).unwrap());
    assert!(def.has_passed_state(State::Canceled, &canceled).unwrap());
    assert!(def.is_refunded(&canceled).unwrap());
    assert!(!def.is_completed(&canceled).unwrap());
}

#[test]
fn unknown_transition_is_an_error() {
    let registry = registry();
    let def = registry.get(purchase::NAME).unwrap();
    let err = def
        .get_state(&tx(purchase::NAME, Some("transition/accept")))
        .unwrap_err();
    assert_eq!(err.process, purchase::NAME);
    assert_eq!(err.transition, "transition/accept");
}

#[test]
fn alias_and_version_suffix_share_one_definition() {
    let registry = registry();
    let current = registry.get("default-booking").unwrap();
    let versioned = registry.get("default-booking/release-1").unwrap();
    let deprecated = registry.get("flex-default-process/release-7").unwrap();
    assert!(std::ptr::eq(current, versioned));
    assert!(std::ptr::eq(current, deprecated));
}

#[test]
fn describe_per_role() {
    let registry = registry();
    let lifecycle = Lifecycle::new(&registry);

    let requested = tx(booking::NAME, Some(booking::REQUEST));
    assert_eq!(
        lifecycle.describe(&requested, Role::Provider),
        Description::Supported {
            process_name: booking::NAME.to_string(),
            state: State::PendingPayment,
            action_needed: true,
            is_final: false,
        }
    );
    match lifecycle.describe(&requested, Role::Customer) {
        Description::Supported { action_needed, .. } => assert!(!action_needed),
        other => panic!("unexpected description: {other:?}"),
    }

    let accepted = tx(booking::NAME, Some(booking::ACCEPT));
    assert_eq!(
        lifecycle.describe(&accepted, Role::Customer),
        Description::Supported {
            process_name: booking::NAME.to_string(),
            state: State::Accepted,
            action_needed: true,
            is_final: false,
        }
    );
    match lifecycle.describe(&accepted, Role::Provider) {
        Description::Supported { action_needed, .. } => assert!(!action_needed),
        other => panic!("unexpected description: {other:?}"),
    }

    let declined = tx(booking::NAME, Some(booking::DECLINE));
    match lifecycle.describe(&declined, Role::Provider) {
        Description::Supported { is_final, .. } => assert!(is_final),
        other => panic!("unexpected description: {other:?}"),
    }
}

#[test]
fn booking_main_path_is_request_accept_confirm_payment() {
    let registry = registry();
    let def = registry.get(booking::NAME).unwrap();
    let mut state = def.initial_state;
    for name in [booking::REQUEST, booking::ACCEPT, booking::CONFIRM_PAYMENT] {
        let transition = def.transition(name).unwrap();
        assert!(transition.starts_from(state), "{name} from {state:?}");
        state = transition.to;
    }
    assert_eq!(state, State::Confirmed);
}

#[test]
fn stale_transition_is_not_an_unknown_process() {
    let registry = registry();
    let lifecycle = Lifecycle::new(&registry);

    let stale = lifecycle.describe(
        &tx("default-booking/release-2", Some("transition/request-deposit")),
        Role::Customer,
    );
    assert_eq!(
        stale,
        Description::OutOfDate {
            process_name: booking::NAME.to_string(),
            transition: "transition/request-deposit".to_string(),
        }
    );
    let foreign = lifecycle.describe(&tx("custom-rental-process", Some("transition/request-deposit")), Role::Customer);
    assert!(matches!(foreign, Description::Unsupported { .. }));
    assert_ne!(stale, foreign);
}

#[test]
fn describe_unknown_process_is_sentinel() {
    let registry = registry();
    let lifecycle = Lifecycle::new(&registry);
    let tx = tx("custom-rental-process", Some("transition/whatever"));
    let description = lifecycle.describe(&tx, Role::Customer);
    assert!(!description.is_supported());
    assert_eq!(description.process_name(), "custom-rental-process");
    assert!(lifecycle.describe_checked(&tx, Role::Customer).is_ok());
}

#[test]
fn inquiry_process_has_no_payment() {
    let registry = registry();
    let lifecycle = Lifecycle::new(&registry);
    let def = registry.get(inquiry::NAME).unwrap();
    assert!(def.transitions.values().all(|t| !t.privileged));

    let converted = tx(inquiry::NAME, Some(inquiry::MARK_CONVERTED));
    match lifecycle.describe(&converted, Role::Provider) {
        Description::Supported { state, is_final, .. } => {
            assert_eq!(state, State::Converted);
            assert!(is_final);
        }
        other => panic!("unexpected description: {other:?}"),
    }
}

#[test]
fn guard_rejects_before_any_remote_call() {
    let registry = registry();
    let lifecycle = Lifecycle::new(&registry);

    let err = lifecycle
        .plan_initial(booking::NAME, booking::REQUEST, Role::Customer, Channel::Direct, false)
        .unwrap_err();
    assert!(matches!(err, TransitionError::PrivilegedViaDirect { .. }));

    let plan = lifecycle
        .plan_initial(booking::NAME, booking::REQUEST, Role::Customer, Channel::Trusted, false)
        .unwrap();
    assert_eq!(plan.route, Channel::Trusted);

    let requested = tx(booking::NAME, Some(booking::REQUEST));
    let err = lifecycle
        .plan_transition(&requested, booking::ACCEPT, Role::Customer, Channel::Direct, false)
        .unwrap_err();
    assert!(matches!(err, TransitionError::ActorMismatch { .. }));

    let err = lifecycle
        .plan_transition(&requested, booking::MARK_DELIVERED, Role::Provider, Channel::Direct, false)
        .unwrap_err();
    assert!(matches!(
        err,
        TransitionError::InvalidSourceState {
            state: State::PendingPayment,
            ..
        }
    ));

    let err = lifecycle
        .plan_transition(&tx("custom", None), booking::ACCEPT, Role::Provider, Channel::Direct, false)
        .unwrap_err();
    assert!(matches!(err, TransitionError::UnsupportedProcess { .. }));

    let plan = lifecycle
        .plan_transition(&requested, booking::ACCEPT, Role::Provider, Channel::Direct, false)
        .unwrap();
    assert_eq!(plan.transaction, Some(ResourceRef::new("transaction", "tx-1")));
}

struct FakeBackend {
    response: Value,
    calls: Vec<TransitionPlan>,
}

impl TransitionExecutor for FakeBackend {
    fn execute(&mut self, plan: &TransitionPlan) -> Result<Value, ExecutorError> {
        self.calls.push(plan.clone());
        Ok(self.response.clone())
    }
}

struct DownBackend;

impl TransitionExecutor for DownBackend {
    fn execute(&mut self, _plan: &TransitionPlan) -> Result<Value, ExecutorError> {
        Err(ExecutorError::Remote("503 service unavailable".to_string()))
    }
}

fn accepted_plan(registry: &ProcessRegistry, speculative: bool) -> TransitionPlan {
    Lifecycle::new(registry)
        .plan_transition(
            &tx(booking::NAME, Some(booking::ACCEPT)),
            booking::CONFIRM_PAYMENT,
            Role::Customer,
            Channel::Direct,
            speculative,
        )
        .unwrap()
}

#[test]
fn committed_transition_merges_into_store() {
    let registry = registry();
    let plan = accepted_plan(&registry, false);
    let mut backend = FakeBackend {
        response: transaction_response(booking::CONFIRM_PAYMENT),
        calls: Vec::new(),
    };
    let mut store = EntityStore::new();

    let outcome = apply_transition(&mut store, &mut backend, &plan, None).unwrap();
    assert_eq!(backend.calls, vec![plan]);
    let TransitionOutcome::Committed { transaction, report } = outcome else {
        panic!("expected a committed outcome");
    };
    assert_eq!(report.merged, 4);

    let resolution = store.resolve(&[transaction], Strictness::Strict).unwrap();
    let entity = resolution.first().unwrap();
    let tx = Transaction::from_entity(&entity).unwrap();
    assert_eq!(tx.listing, Some(ResourceRef::new("listing", "l-1")));
    assert_eq!(tx.transitions.len(), 3);
    assert_eq!(tx.payout_total, Some(Money::new(18000, "USD")));
    assert!(check_totals(&tx).unwrap().is_consistent());

    let lifecycle = Lifecycle::new(&registry);
    assert_eq!(
        lifecycle.describe(&tx, Role::Provider),
        Description::Supported {
            process_name: booking::NAME.to_string(),
            state: State::Confirmed,
            action_needed: true,
            is_final: false,
        }
    );
}

#[test]
fn speculative_transition_leaves_store_untouched() {
    let registry = registry();
    let plan = accepted_plan(&registry, true);
    let mut backend = FakeBackend {
        response: transaction_response(booking::CONFIRM_PAYMENT),
        calls: Vec::new(),
    };
    let mut store = EntityStore::new();

    let outcome = apply_transition(&mut store, &mut backend, &plan, None).unwrap();
    assert!(store.is_empty());
    match outcome {
        TransitionOutcome::Speculated { transaction, scratch } => {
            assert_eq!(transaction, ResourceRef::new("transaction", "tx-1"));
            assert_eq!(scratch.len(), 4);
        }
        other => panic!("expected a speculative outcome, got {other:?}"),
    }
}

#[test]
fn committed_transition_honors_field_allow_list() {
    let registry = registry();
    let plan = accepted_plan(&registry, false);
    let mut backend = FakeBackend {
        response: transaction_response(booking::CONFIRM_PAYMENT),
        calls: Vec::new(),
    };
    let mut allow = FieldAllowList::new();
    allow.allow("user", ["displayName"]);
    allow.allow("listing", ["description"]);
    let mut store = EntityStore::new();

    let outcome = apply_transition(&mut store, &mut backend, &plan, Some(&allow)).unwrap();
    let TransitionOutcome::Committed { report, .. } = outcome else {
        panic!("expected a committed outcome");
    };
    assert_eq!(report.dropped_attributes, 1);

    let listing = ResourceRef::new("listing", "l-1");
    let resolution = store.resolve(&[listing], Strictness::Strict).unwrap();
    assert!(resolution.first().unwrap().attributes().get("title").is_none());
    let user = ResourceRef::new("user", "u-1");
    let resolution = store.resolve(&[user], Strictness::Strict).unwrap();
    assert!(resolution.first().unwrap().attributes().get("displayName").is_some());
}

#[test]
fn malformed_history_entry_still_describes() {
    let mut body = transaction_response(booking::CONFIRM_PAYMENT);
    body["data"]["attributes"]["transitions"][1]["by"] = json!("admin");
    body["data"]["attributes"]["lineItems"][0]["includeFor"] = json!(["operator"]);
    let parsed = from_response(&body).unwrap();
    let mut store = EntityStore::new();
    store.merge_response(&parsed, None);
    let resolution = store.resolve(&parsed.data, Strictness::Tolerant).unwrap();
    let tx = Transaction::from_entity(&resolution.first().unwrap()).unwrap();

    assert_eq!(tx.transitions.len(), 2);
    assert_eq!(tx.line_items.len(), 1);
    assert_eq!(tx.payin_total, Some(Money::new(20000, "USD")));

    let registry = registry();
    match Lifecycle::new(&registry).describe(&tx, Role::Customer) {
        Description::Supported { state, .. } => assert_eq!(state, State::Confirmed),
        other => panic!("unexpected description: {other:?}"),
    }
}

#[test]
fn executor_failure_and_empty_response_propagate() {
    let registry = registry();
    let plan = accepted_plan(&registry, false);
    let mut store = EntityStore::new();

    let err = apply_transition(&mut store, &mut DownBackend, &plan, None).unwrap_err();
    assert!(matches!(err, TransitionError::Executor(_)));

    let mut backend = FakeBackend {
        response: json!({ "data": null }),
        calls: Vec::new(),
    };
    let err = apply_transition(&mut store, &mut backend, &plan, None).unwrap_err();
    assert!(matches!(err, TransitionError::MissingTransaction));
    assert!(store.is_empty());
}

#[test]
fn every_issued_transition_exists() {
    let registry = registry();
    registry
        .validate_issued(&[
            (booking::NAME, booking::INQUIRE),
            (booking::NAME, booking::REQUEST_AFTER_INQUIRY),
            (booking::NAME, booking::CONFIRM_PAYMENT),
            (purchase::NAME, purchase::REQUEST_PAYMENT),
            (purchase::NAME, purchase::MARK_RECEIVED),
            (inquiry::NAME, inquiry::INQUIRE),
        ])
        .unwrap();
}

#[test]
fn parsed_transaction_needs_transaction_kind() {
    let parsed = from_response(&json!({
        "data": { "id": { "uuid": "l-1" }, "type": "listing", "attributes": {} }
    }))
    .unwrap();
    let mut store = EntityStore::new();
    store.merge_response(&parsed, None);
    let resolution = store.resolve(&parsed.data, Strictness::Tolerant).unwrap();
    assert!(Transaction::from_entity(&resolution.first().unwrap()).is_err());
}

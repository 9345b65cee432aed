mod common;

use common::*;
use powerban_client::*;
use std::rc::Rc;
use tokio::sync::oneshot;

async fn ready_app() -> (TestApp, Rc<MockBackend>) {
    let backend = Rc::new(MockBackend::new());
    let app = app(backend.clone(), StableStore::in_memory());
    app.identity().ensure_identity().await;
    app.generate_deposit_address().await.unwrap();
    app.set_payout_address(PAYOUT).unwrap();
    app.drain_notices();
    (app, backend)
}

#[tokio::test]
async fn enabling_and_submitting_a_single_ticket() {
    let (app, backend) = ready_app().await;
    backend
        .purchase_reply
        .replace(Some(Ok(vec![vec![1, 2, 3, 4, 5]])));

    assert!(!app.view().can_purchase);
    assert_eq!(app.purchases().readiness(), Err(BlockReason::NoTickets));

    let id = app.add_ticket();
    for n in [5, 3, 1, 4, 2] {
        app.toggle_number(&id, n).unwrap();
    }
    assert!(app.view().can_purchase);

    assert_eq!(app.purchase().await, PurchaseOutcome::Purchased { count: 1 });

    let view = app.view();
    assert!(view.drafts.is_empty());
    assert_eq!(view.purchased.len(), 1);
    assert_eq!(view.purchased[0].numbers, vec![1, 2, 3, 4, 5]);
    assert!(!view.purchasing);

    let order = backend.orders.borrow()[0].clone();
    assert_eq!(order.user_id, UserId::new("player-1"));
    assert_eq!(order.tickets, vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(order.win_address, PAYOUT);

    let notices = app.drain_notices();
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].message, "Successfully purchased 1 ticket(s)!");
}

#[tokio::test]
async fn incomplete_ticket_blocks_without_a_request() {
    let (app, backend) = ready_app().await;
    complete_ticket(&app, &[1, 2, 3, 4, 5]);
    let partial = app.add_ticket();
    app.set_numbers(&partial, &[7, 8]).unwrap();

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Blocked(BlockReason::IncompleteTicket(partial))
    );
    assert_eq!(backend.calls_to("purchase_tickets"), 0);
    assert!(app.drain_notices().is_empty());
}

#[tokio::test]
async fn empty_payout_address_blocks() {
    let (app, backend) = ready_app().await;
    complete_ticket(&app, &[1, 2, 3, 4, 5]);
    app.set_payout_address("").unwrap();

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Blocked(BlockReason::MissingPayoutAddress)
    );
    assert_eq!(backend.calls_to("purchase_tickets"), 0);
}

#[tokio::test]
async fn missing_deposit_address_blocks() {
    let backend = Rc::new(MockBackend::new());
    let app = app(backend.clone(), StableStore::in_memory());
    app.identity().ensure_identity().await;
    app.set_payout_address(PAYOUT).unwrap();
    complete_ticket(&app, &[1, 2, 3, 4, 5]);

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Blocked(BlockReason::MissingDepositAddress)
    );
    assert_eq!(backend.calls_to("purchase_tickets"), 0);
}

#[tokio::test]
async fn missing_identity_blocks() {
    let backend = Rc::new(MockBackend::new());
    backend.player_id.replace(None);
    let mut storage = StableStore::in_memory();
    storage.set(powerban_client::storage::DEPOSIT_ADDRESS_KEY, DEPOSIT).unwrap();
    let app = app(backend.clone(), storage);
    app.identity().ensure_identity().await;
    app.set_payout_address(PAYOUT).unwrap();
    complete_ticket(&app, &[1, 2, 3, 4, 5]);

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Blocked(BlockReason::MissingIdentity)
    );
    assert_eq!(backend.calls_to("purchase_tickets"), 0);
}

#[tokio::test]
async fn rejected_purchase_keeps_drafts_and_reports_reason() {
    let (app, backend) = ready_app().await;
    backend
        .purchase_reply
        .replace(Some(Err(Some("Deposit not received".to_string()))));
    complete_ticket(&app, &[1, 2, 3, 4, 5]);
    complete_ticket(&app, &[10, 20, 30, 31, 32]);
    let before = app.view().drafts;

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Failed { reason: "Deposit not received".to_string() }
    );

    let view = app.view();
    assert_eq!(view.drafts, before);
    assert!(!view.purchasing);
    assert!(view.can_purchase);
    assert!(view.purchased.is_empty());

    let notices = app.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Deposit not received");
}

#[tokio::test]
async fn unreachable_backend_reports_generic_reason() {
    let (app, backend) = ready_app().await;
    backend.purchase_reply.replace(Some(Err(None)));
    complete_ticket(&app, &[1, 2, 3, 4, 5]);

    assert_eq!(
        app.purchase().await,
        PurchaseOutcome::Failed { reason: "Purchase failed".to_string() }
    );
    assert_eq!(app.view().drafts.len(), 1);

    // the same action can simply be repeated
    backend.purchase_reply.replace(None);
    assert_eq!(app.purchase().await, PurchaseOutcome::Purchased { count: 1 });
    assert!(app.view().drafts.is_empty());
}

#[tokio::test]
async fn second_purchase_is_blocked_while_first_is_in_flight() {
    let (app, backend) = ready_app().await;
    let (release, gate) = oneshot::channel();
    backend.purchase_gate.replace(Some(gate));
    complete_ticket(&app, &[1, 2, 3, 4, 5]);

    let (first, second) = tokio::join!(app.purchase(), async {
        assert!(app.view().purchasing);
        assert!(!app.view().can_purchase);
        let second = app.purchase().await;
        release.send(()).unwrap();
        second
    });

    assert_eq!(first, PurchaseOutcome::Purchased { count: 1 });
    assert_eq!(second, PurchaseOutcome::Blocked(BlockReason::PurchaseInFlight));
    assert_eq!(backend.calls_to("purchase_tickets"), 1);
    assert!(!app.view().purchasing);
}

#[tokio::test]
async fn purchased_view_is_replaced_from_backend_after_success() {
    let (app, backend) = ready_app().await;
    backend.confirmed.replace(vec![vec![9, 10, 11, 12, 13]]);
    complete_ticket(&app, &[1, 2, 3, 4, 5]);

    app.purchase().await;

    let purchased = app.view().purchased;
    assert_eq!(backend.calls_to("today_tickets"), 1);
    assert_eq!(purchased.len(), 2);
    assert_eq!(purchased[0].numbers, vec![9, 10, 11, 12, 13]);
    assert_eq!(purchased[1].id.as_str(), "today-1");
}

#[tokio::test]
async fn failed_refresh_still_shows_confirmed_tickets() {
    let (app, backend) = ready_app().await;
    backend.today_available.set(false);
    complete_ticket(&app, &[1, 2, 3, 4, 5]);
    complete_ticket(&app, &[6, 7, 8, 9, 10]);

    assert_eq!(app.purchase().await, PurchaseOutcome::Purchased { count: 2 });

    let view = app.view();
    assert!(view.drafts.is_empty());
    assert_eq!(
        view.purchased.iter().map(|t| t.numbers.clone()).collect::<Vec<_>>(),
        vec![vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]]
    );

    let messages: Vec<String> = app.drain_notices().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec![
            "Successfully purchased 2 ticket(s)!".to_string(),
            "Could not load today's purchased tickets".to_string(),
        ]
    );
}

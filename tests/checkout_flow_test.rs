mod common;

use bookstore_api::entities::{Book, FileFormat, Order, TargetMode};
use bookstore_api::errors::ServiceError;
use bookstore_api::services::{ChargeStatus, CheckoutOutcome, CreateCampaignInput};
use common::{seed_book, seed_customer, TestApp};
use sea_orm::EntityTrait;

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn cart_totals_use_effective_prices() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;
    let discounted = seed_book(&app, "Dune", "Frank Herbert", 1000).await;
    let full_price = seed_book(&app, "Neuromancer", "Gibson", 500).await;

    app.state
        .services
        .discounts
        .create_campaign(CreateCampaignInput {
            name: "Dune deal".to_string(),
            target_mode: TargetMode::Books,
            discount_percent: 30,
            book_ids: vec![discounted],
            genre_ids: vec![],
        })
        .await
        .expect("campaign creation failed");

    let carts = &app.state.services.carts;
    assert!(carts.toggle_item(customer_id, discounted).await.unwrap());
    assert!(carts.toggle_item(customer_id, full_price).await.unwrap());

    let view = carts.cart_view(customer_id).await.unwrap();
    assert_eq!(view.lines.len(), 2);
    assert_eq!(view.total, 700 + 500);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn toggling_twice_removes_the_item() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;
    let book_id = seed_book(&app, "Dune", "Frank Herbert", 1000).await;

    let carts = &app.state.services.carts;
    assert!(carts.toggle_item(customer_id, book_id).await.unwrap());
    assert!(!carts.toggle_item(customer_id, book_id).await.unwrap());
    assert!(carts.cart_view(customer_id).await.unwrap().lines.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn empty_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;

    let result = app.state.services.checkout.start_checkout(customer_id).await;
    assert!(result.is_err());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn successful_payment_settles_the_order() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;
    let book_id = seed_book(&app, "Dune", "Frank Herbert", 1000).await;

    app.state
        .services
        .carts
        .toggle_item(customer_id, book_id)
        .await
        .unwrap();

    let session = app
        .state
        .services
        .checkout
        .start_checkout(customer_id)
        .await
        .expect("checkout should start");
    assert_eq!(session.amount, 1000);

    // Gateway still pending: nothing settles.
    let outcome = app
        .state
        .services
        .checkout
        .confirm_checkout(customer_id)
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Pending);

    app.payments.set_status(ChargeStatus::Succeeded).await;
    let outcome = app
        .state
        .services
        .checkout
        .confirm_checkout(customer_id)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::Paid {
            order_id: session.order_id
        }
    );

    // Order closed, book in the library, purchase count bumped, fresh cart.
    let order = Order::find_by_id(session.order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(order.closed);
    assert_eq!(order.amount, 1000);

    assert!(app
        .state
        .services
        .customers
        .owns(customer_id, book_id)
        .await
        .unwrap());

    let book = Book::find_by_id(book_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.purchase_count, 1);

    let fresh = app.state.services.carts.cart_view(customer_id).await.unwrap();
    assert_ne!(fresh.order_id, session.order_id);
    assert!(fresh.lines.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn file_delivery_requires_ownership_and_format() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;
    let book_id = seed_book(&app, "Dune", "Frank Herbert", 1000).await;
    app.state
        .services
        .books
        .add_file(book_id, "epub", "books/dune.epub".to_string())
        .await
        .unwrap();

    let customers = &app.state.services.customers;

    // Not purchased yet: the file is invisible.
    let err = customers
        .library_file(customer_id, book_id, FileFormat::Epub)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    app.state
        .services
        .carts
        .toggle_item(customer_id, book_id)
        .await
        .unwrap();
    app.state
        .services
        .checkout
        .start_checkout(customer_id)
        .await
        .unwrap();
    app.payments.set_status(ChargeStatus::Succeeded).await;
    app.state
        .services
        .checkout
        .confirm_checkout(customer_id)
        .await
        .unwrap();

    let file = customers
        .library_file(customer_id, book_id, FileFormat::Epub)
        .await
        .unwrap();
    assert_eq!(file.object_key, "books/dune.epub");

    // Owned book, missing rendition.
    let err = customers
        .library_file(customer_id, book_id, FileFormat::Pdf)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn canceled_payment_unlocks_the_cart() {
    let app = TestApp::new().await;
    let customer_id = seed_customer(&app).await;
    let book_id = seed_book(&app, "Dune", "Frank Herbert", 1000).await;

    let carts = &app.state.services.carts;
    carts.toggle_item(customer_id, book_id).await.unwrap();

    let session = app
        .state
        .services
        .checkout
        .start_checkout(customer_id)
        .await
        .unwrap();

    // Locked cart rejects edits while the payment is in flight.
    assert!(carts.toggle_item(customer_id, book_id).await.is_err());

    app.payments.set_status(ChargeStatus::Canceled).await;
    let outcome = app
        .state
        .services
        .checkout
        .confirm_checkout(customer_id)
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Abandoned);

    // Same order, unlocked and editable again.
    let view = carts.cart_view(customer_id).await.unwrap();
    assert_eq!(view.order_id, session.order_id);
    assert!(!carts.toggle_item(customer_id, book_id).await.unwrap());
}

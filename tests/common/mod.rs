use std::sync::Arc;

use async_trait::async_trait;
use bookstore_api::{
    config::{AppConfig, PaymentConfig},
    db,
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    services::{Charge, ChargeStatus, PaymentProvider},
    AppState,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Payment gateway stub: hands out charge ids and answers with a scripted
/// status.
pub struct StubPaymentProvider {
    status: Mutex<ChargeStatus>,
}

impl StubPaymentProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(ChargeStatus::Pending),
        })
    }

    pub async fn set_status(&self, status: ChargeStatus) {
        *self.status.lock().await = status;
    }
}

#[async_trait]
impl PaymentProvider for StubPaymentProvider {
    async fn create_charge(
        &self,
        _amount: i64,
        _description: &str,
    ) -> Result<Charge, ServiceError> {
        Ok(Charge {
            id: Uuid::new_v4().to_string(),
            confirmation_url: "https://gateway.test/confirm".to_string(),
        })
    }

    async fn fetch_status(&self, _payment_id: &str) -> Result<ChargeStatus, ServiceError> {
        Ok(*self.status.lock().await)
    }
}

/// Application state backed by a throwaway SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub payments: Arc<StubPaymentProvider>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = format!("bookstore_test_{}.db", Uuid::new_v4());
        let cfg = test_config(&db_file);

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to migrate test database");
        let pool = Arc::new(pool);

        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        let event_task = tokio::spawn(events::process_events(rx));

        let payments = StubPaymentProvider::new();
        let services = AppServices::with_payment_provider(
            pool.clone(),
            event_sender.clone(),
            &cfg,
            payments.clone(),
        );

        let state = AppState {
            db: pool,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            payments,
            _event_task: event_task,
        }
    }
}

fn test_config(db_file: &str) -> AppConfig {
    AppConfig {
        database_url: format!("sqlite://{db_file}?mode=rwc"),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        db_max_connections: 1,
        db_min_connections: 1,
        new_release_days: 7,
        payment: PaymentConfig::default(),
    }
}

/// Inserts a book with the given list price; everything else is boilerplate.
pub async fn seed_book(app: &TestApp, name: &str, author: &str, price: i64) -> Uuid {
    use bookstore_api::entities::book;

    let id = Uuid::new_v4();
    book::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        author: Set(author.to_string()),
        description: Set(String::new()),
        main_image_url: Set(None),
        price: Set(price),
        discount: Set(0),
        purchase_count: Set(0),
        score: Set(0),
        released: Set(NaiveDate::from_ymd_opt(2023, 5, 1).expect("valid date")),
        created: Set(chrono::Utc::now().date_naive()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed book");
    id
}

/// Inserts a book with an explicit creation date.
pub async fn seed_dated_book(app: &TestApp, name: &str, price: i64, created: NaiveDate) -> Uuid {
    use bookstore_api::entities::book;

    let id = Uuid::new_v4();
    book::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        author: Set("Author".to_string()),
        description: Set(String::new()),
        main_image_url: Set(None),
        price: Set(price),
        discount: Set(0),
        purchase_count: Set(0),
        score: Set(0),
        released: Set(created),
        created: Set(created),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed book");
    id
}

/// Inserts a genre and returns its id.
pub async fn seed_genre(app: &TestApp, name: &str) -> Uuid {
    use bookstore_api::entities::genre;

    let id = Uuid::new_v4();
    genre::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed genre");
    id
}

/// Links a book to a genre.
pub async fn seed_book_genre(app: &TestApp, book_id: Uuid, genre_id: Uuid) {
    use bookstore_api::entities::book_genre;

    book_genre::ActiveModel {
        book_id: Set(book_id),
        genre_id: Set(genre_id),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to link book to genre");
}

/// Inserts a customer row.
pub async fn seed_customer(app: &TestApp) -> Uuid {
    use bookstore_api::entities::customer;

    let id = Uuid::new_v4();
    customer::ActiveModel {
        id: Set(id),
        email: Set(format!("{}@example.com", id)),
        display_name: Set("Test Reader".to_string()),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed customer");
    id
}

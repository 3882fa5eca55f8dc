use crate::{
    entities::{book, book_file, customer, purchase, Book, BookFile, Customer, FileFormat, Purchase},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct RegisterCustomerInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
}

/// Customer records and their digital library. Authentication lives at the
/// edge; this service only anchors rows the storefront hangs off a customer.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: RegisterCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;

        let taken = Customer::find()
            .filter(customer::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict(format!(
                "Email {} is already registered",
                input.email
            )));
        }

        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(input.email),
            display_name: Set(input.display_name),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    /// Books the customer has paid for, most recent purchase first.
    #[instrument(skip(self))]
    pub async fn library(&self, customer_id: Uuid) -> Result<Vec<book::Model>, ServiceError> {
        self.get_customer(customer_id).await?;

        let books = Purchase::find()
            .filter(purchase::Column::CustomerId.eq(customer_id))
            .find_also_related(Book)
            .order_by_desc(purchase::Column::PurchasedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .filter_map(|(_, b)| b)
            .collect();
        Ok(books)
    }

    /// Whether the customer owns the book, gating file downloads.
    pub async fn owns(&self, customer_id: Uuid, book_id: Uuid) -> Result<bool, ServiceError> {
        Ok(Purchase::find_by_id((customer_id, book_id))
            .one(&*self.db)
            .await?
            .is_some())
    }

    /// Resolves a purchased book's file in the requested format. A book
    /// outside the customer's library looks the same as a missing rendition.
    #[instrument(skip(self))]
    pub async fn library_file(
        &self,
        customer_id: Uuid,
        book_id: Uuid,
        format: FileFormat,
    ) -> Result<book_file::Model, ServiceError> {
        if !self.owns(customer_id, book_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Book {} is not in your library",
                book_id
            )));
        }
        BookFile::find()
            .filter(book_file::Column::BookId.eq(book_id))
            .filter(book_file::Column::Format.eq(format))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Book {} has no {:?} file", book_id, format))
            })
    }
}

//! sea-orm entities for the bookstore schema.

pub mod book;
pub mod book_file;
pub mod book_genre;
pub mod campaign;
pub mod campaign_book;
pub mod campaign_genre;
pub mod customer;
pub mod favorite;
pub mod genre;
pub mod order;
pub mod order_item;
pub mod purchase;
pub mod review;

pub use book::{Entity as Book, Model as BookModel};
pub use book_file::{Entity as BookFile, FileFormat, Model as BookFileModel};
pub use book_genre::{Entity as BookGenre, Model as BookGenreModel};
pub use campaign::{Entity as Campaign, Model as CampaignModel, TargetMode};
pub use campaign_book::{Entity as CampaignBook, Model as CampaignBookModel};
pub use campaign_genre::{Entity as CampaignGenre, Model as CampaignGenreModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use favorite::{Entity as Favorite, Model as FavoriteModel};
pub use genre::{Entity as Genre, Model as GenreModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use purchase::{Entity as Purchase, Model as PurchaseModel};
pub use review::{Entity as Review, Model as ReviewModel};

pub mod audit_logs;
pub mod cart_items;
pub mod categories;
pub mod colors;
pub mod favorites;
pub mod order_items;
pub mod orders;
pub mod product_variants;
pub mod products;
pub mod sizes;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use colors::Entity as Colors;
pub use favorites::Entity as Favorites;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use sizes::Entity as Sizes;
pub use users::Entity as Users;

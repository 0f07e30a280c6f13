//! Domain models.
//!
//! These are validated domain objects, independent of how a store backend
//! lays out its rows. Pure logic (cart arithmetic, seller splitting, catalog
//! filtering) lives next to the types it operates on.

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartLimitError, CartSummary, MAX_QUANTITY};
pub use order::{Checkout, Order, OrderItem, ShippingAddress};
pub use payment::PaymentIntent;
pub use product::{
    NewProduct, Page, Pagination, Product, ProductFilter, ProductImage, ProductQuery,
    ProductUpdate, ProductVariant, SortOrder,
};
pub use user::{NewUser, User, UserProfile};

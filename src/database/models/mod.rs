pub mod category;
pub mod product;
pub mod user;

pub use category::{Category, CategoryChanges, NewCategory};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::{NewUser, User};

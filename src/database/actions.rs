pub mod ingredients;
pub mod marks;
pub mod recipes;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use ingredients::*;
pub use marks::*;
pub use recipes::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

pub mod price_provider;
pub mod synthetic;
pub mod yahoo;

pub mod reproduce;
pub mod subset;

pub mod admin;
pub mod auth;
pub mod barcodes;
pub mod courier;
pub mod letters;
pub mod postcode;
pub mod stream;

pub mod account;
pub mod audit;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod import;
pub mod mail;
pub mod order;
pub mod payment;
pub mod promotion;
pub mod report;
pub mod settings;
pub mod target_group;
pub mod voucher;

pub mod chat;
pub mod config;
pub mod constants;
pub mod controller;
pub mod dedimania;
pub mod event;
pub mod network;
pub mod server;

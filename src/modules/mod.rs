// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod account;
pub mod common;
pub mod context;
pub mod error;
pub mod event;
pub mod imap;
pub mod logger;
pub mod poll;
pub mod proxy;
pub mod repository;
pub mod send;
pub mod service;
pub mod settings;
pub mod smtp;
pub mod status;
pub mod utils;

//! # Takings Telegram Bot
//!
//! A Telegram bot that walks staff through entering the day's Cash, Card,
//! Uber, Deliveroo and App amounts and appends them as one row of a Google
//! spreadsheet. A small HTTP liveness endpoint runs alongside it.

pub mod bot;
pub mod config;
pub mod conversation;
pub mod health;
pub mod localization;
pub mod session;
pub mod sheets;
pub mod sink;
pub mod validation;

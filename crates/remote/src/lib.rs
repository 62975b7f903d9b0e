// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod command;
pub mod config;
pub mod dropbox;
pub mod error;
pub mod event;
pub mod local;
pub mod oauth;
pub mod persist;
pub mod providers;
pub mod storage;
pub mod test_support;
pub mod transport;

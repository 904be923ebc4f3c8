// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Version information for coda.

/// The version string from Cargo.toml (e.g., "0.1.0")
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs for the litesyncd binary.
//!
//! The specs themselves are compiled as test targets of the crates they
//! exercise (see `crates/daemon/Cargo.toml`); this library is empty.

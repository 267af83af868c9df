// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0
pub mod provider;

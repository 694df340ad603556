// Copyright 2025 raftgate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # raftgate CLI
//!
//! Command-line interface for running raftgate components.
//!
//! - **Gateways**: the client-facing entry point that routes key-value calls
//!   to registered nodes
//! - **Nodes**: the leader-aware gateway beside each member of the store
//! - **Key-value calls**: `get`, `set` and `delete` against either of them
//!
//! The binary parses arguments with `argh` and wires the `raftgate-router`,
//! `raftgate-node` and `raftgate-client` crates together. Helpers shared by
//! the subcommands live in [`bootstrap`].

pub mod bootstrap;

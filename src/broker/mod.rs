// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod connection;
mod in_process;
mod link;
mod settings;

pub use connection::{Connection, ConnectionState, MessageHandle};
pub use in_process::InProcessLink;
pub use link::BrokerLink;
pub use settings::{StartPosition, SubjectSettings};

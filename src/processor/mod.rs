// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod adapter;
mod event_processor;
mod stage;

pub use adapter::EventAdapter;
pub use event_processor::EventProcessor;
pub use stage::StageInstance;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod clustered;
mod single;

pub use clustered::ClusteredRepository;
pub use single::SingleRepository;
